//! Built-in value rules.
//!
//! Rules produce `(message, kind)` pairs using the violation vocabulary of
//! the evaluator (`string.min`, `number.max`, ...).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        // RFC 5322 simplified email regex
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
        ).unwrap()
    })
}

/// Compiled `pattern` rules keyed by their source.
pub(crate) type PatternCache = HashMap<String, Regex>;

/// A rule applied after the type check passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// Minimum length (strings, arrays) or value (numbers), inclusive
    Min { limit: f64 },
    /// Maximum length (strings, arrays) or value (numbers), inclusive
    Max { limit: f64 },
    /// Email address format (strings)
    Email,
    /// Regular expression the whole value must match (strings)
    Pattern { pattern: String },
}

impl Rule {
    /// Rule name used in documentation output.
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Min { .. } => "min",
            Rule::Max { .. } => "max",
            Rule::Email => "email",
            Rule::Pattern { .. } => "pattern",
        }
    }
}

pub(crate) type Failure = (String, &'static str);

pub(crate) fn check_string(
    rule: &Rule,
    label: &str,
    value: &str,
    patterns: &PatternCache,
) -> Option<Failure> {
    let len = value.chars().count() as f64;
    match rule {
        Rule::Min { limit } if len < *limit => Some((
            format!("\"{label}\" length must be at least {limit} characters long"),
            "string.min",
        )),
        Rule::Max { limit } if len > *limit => Some((
            format!("\"{label}\" length must be less than or equal to {limit} characters long"),
            "string.max",
        )),
        Rule::Email if !email_regex().is_match(value) => {
            Some((format!("\"{label}\" must be a valid email"), "string.email"))
        }
        Rule::Pattern { pattern } => {
            // Patterns are compiled when the validator is built; an uncached
            // pattern is one that failed to compile and was already reported.
            let regex = patterns.get(pattern)?;
            if regex.is_match(value) {
                None
            } else {
                Some((
                    format!(
                        "\"{label}\" with value \"{value}\" fails to match the required pattern: /{pattern}/"
                    ),
                    "string.pattern.base",
                ))
            }
        }
        _ => None,
    }
}

pub(crate) fn check_number(rule: &Rule, label: &str, value: f64) -> Option<Failure> {
    match rule {
        Rule::Min { limit } if value < *limit => Some((
            format!("\"{label}\" must be greater than or equal to {limit}"),
            "number.min",
        )),
        Rule::Max { limit } if value > *limit => Some((
            format!("\"{label}\" must be less than or equal to {limit}"),
            "number.max",
        )),
        _ => None,
    }
}

pub(crate) fn check_array(rule: &Rule, label: &str, len: usize) -> Option<Failure> {
    let len = len as f64;
    match rule {
        Rule::Min { limit } if len < *limit => Some((
            format!("\"{label}\" must contain at least {limit} items"),
            "array.min",
        )),
        Rule::Max { limit } if len > *limit => Some((
            format!("\"{label}\" must contain less than or equal to {limit} items"),
            "array.max",
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_length_bounds() {
        let cache = PatternCache::new();
        let min = Rule::Min { limit: 3.0 };
        assert!(check_string(&min, "name", "abc", &cache).is_none());

        let (message, kind) = check_string(&min, "name", "ab", &cache).unwrap();
        assert_eq!(kind, "string.min");
        assert_eq!(message, "\"name\" length must be at least 3 characters long");
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let cache = PatternCache::new();
        let max = Rule::Max { limit: 3.0 };
        assert!(check_string(&max, "name", "äöü", &cache).is_none());
    }

    #[test]
    fn email_format() {
        let cache = PatternCache::new();
        assert!(check_string(&Rule::Email, "email", "test@example.com", &cache).is_none());
        let (_, kind) = check_string(&Rule::Email, "email", "not-an-email", &cache).unwrap();
        assert_eq!(kind, "string.email");
    }

    #[test]
    fn pattern_uses_cache() {
        let mut cache = PatternCache::new();
        cache.insert("^[a-z]+$".to_string(), Regex::new("^[a-z]+$").unwrap());
        let rule = Rule::Pattern {
            pattern: "^[a-z]+$".to_string(),
        };
        assert!(check_string(&rule, "slug", "hello", &cache).is_none());
        let (_, kind) = check_string(&rule, "slug", "Hello", &cache).unwrap();
        assert_eq!(kind, "string.pattern.base");
    }

    #[test]
    fn number_bounds() {
        let (message, kind) = check_number(&Rule::Min { limit: 18.0 }, "age", 15.0).unwrap();
        assert_eq!(kind, "number.min");
        assert_eq!(message, "\"age\" must be greater than or equal to 18");
        assert!(check_number(&Rule::Max { limit: 120.0 }, "age", 120.0).is_none());
    }

    #[test]
    fn array_bounds() {
        let (_, kind) = check_array(&Rule::Max { limit: 2.0 }, "tags", 3).unwrap();
        assert_eq!(kind, "array.max");
        assert!(check_array(&Rule::Email, "tags", 3).is_none());
    }
}
