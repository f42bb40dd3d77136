//! Validation error types and the JSON failure format.

use crate::location::Location;
use crate::options::Options;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single violation reported by the schema evaluator.
///
/// Violations are not scoped to a request location; the aggregator adds the
/// location when folding them into [`FieldError`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted path of the offending field (e.g. `"address.city"`, `"tags.0"`)
    pub path: String,
    /// Human-readable error message
    pub message: String,
    /// Violation kind tag (e.g. `"any.required"`, `"string.min"`)
    pub kind: String,
}

impl Violation {
    /// Create a new violation.
    pub fn new(
        path: impl Into<String>,
        message: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind: kind.into(),
        }
    }
}

/// Aggregated violations for one field within one request location.
///
/// Within a single request's error collection there is at most one
/// `FieldError` per `(field, location)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// The field path that failed validation
    pub field: String,
    /// The request location the field belongs to
    pub location: Location,
    /// Messages in arrival order
    pub messages: Vec<String>,
    /// Violation kinds, parallel to `messages`
    pub types: Vec<String>,
}

impl FieldError {
    /// Create a field error from its first violation.
    pub fn new(
        field: impl Into<String>,
        location: Location,
        message: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            location,
            messages: vec![message.into()],
            types: vec![kind.into()],
        }
    }

    /// Append another violation of the same field.
    pub fn push(&mut self, message: impl Into<String>, kind: impl Into<String>) {
        self.messages.push(message.into());
        self.types.push(kind.into());
    }
}

/// Terminal failure of request validation.
///
/// Produced at most once per request and handed to the host's error channel.
/// It always carries at least one [`FieldError`].
///
/// The JSON form is either the structured object
///
/// ```json
/// {
///   "status": 400,
///   "statusText": "Bad Request",
///   "errors": [
///     {"field": "name", "location": "body", "messages": ["\"name\" is required"], "types": ["any.required"]}
///   ]
/// }
/// ```
///
/// or, when the `flatten` option is set, a flat list of every message.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    /// All field errors collected across locations
    pub errors: Vec<FieldError>,
    /// Failure status code
    pub status: u16,
    /// Failure status text
    pub status_text: String,
    /// Serialize as a flat message list
    pub flatten: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureBody<'a> {
    status: u16,
    status_text: &'a str,
    errors: &'a [FieldError],
}

impl ValidationFailure {
    /// Create a failure from collected errors and the resolved options.
    pub fn new(errors: Vec<FieldError>, options: &Options) -> Self {
        Self {
            errors,
            status: options.status,
            status_text: options.status_text.clone(),
            flatten: options.flatten,
        }
    }

    /// Every accumulated message, in error order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.errors
            .iter()
            .flat_map(|e| e.messages.iter().map(String::as_str))
    }

    /// Find the error record for a field in a location.
    pub fn get(&self, field: &str, location: Location) -> Option<&FieldError> {
        self.errors
            .iter()
            .find(|e| e.field == field && e.location == location)
    }

    /// The JSON representation (flat message list or structured object).
    pub fn to_json(&self) -> serde_json::Value {
        if self.flatten {
            return serde_json::Value::Array(
                self.messages()
                    .map(|m| serde_json::Value::String(m.to_string()))
                    .collect(),
            );
        }

        serde_json::to_value(FailureBody {
            status: self.status,
            status_text: &self.status_text,
            errors: &self.errors,
        })
        .unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl std::error::Error for ValidationFailure {}

impl Serialize for ValidationFailure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

/// Errors raised while building a validator, before any request is seen.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The middleware factory was called without a schema.
    #[error("Please provide a validation schema")]
    MissingSchema,

    /// A `pattern` rule does not compile.
    #[error("invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    /// A field names an external rule that is not registered on its validator.
    #[error("field '{field}' uses external rule '{rule}', which is not registered")]
    UnregisteredRule { field: String, rule: String },

    /// Option overrides could not be read from the environment.
    #[error("invalid validation options in environment: {0}")]
    Environment(#[from] envy::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(flatten: bool) -> ValidationFailure {
        let mut name = FieldError::new("name", Location::Body, "\"name\" is required", "any.required");
        name.push("\"name\" must be a string", "string.base");
        let options = Options {
            flatten,
            ..Options::default()
        };
        ValidationFailure::new(
            vec![
                name,
                FieldError::new("page", Location::Query, "\"page\" must be a number", "number.base"),
            ],
            &options,
        )
    }

    #[test]
    fn structured_json() {
        let json = failure(false).to_json();
        assert_eq!(json["status"], 400);
        assert_eq!(json["statusText"], "Bad Request");
        assert_eq!(json["errors"][0]["field"], "name");
        assert_eq!(json["errors"][0]["location"], "body");
        assert_eq!(json["errors"][0]["types"][1], "string.base");
        assert_eq!(json["errors"][1]["location"], "query");
    }

    #[test]
    fn flattened_json_lists_all_messages() {
        let json = failure(true).to_json();
        assert_eq!(
            json,
            serde_json::json!([
                "\"name\" is required",
                "\"name\" must be a string",
                "\"page\" must be a number"
            ])
        );
    }

    #[test]
    fn display_is_json_string() {
        let failure = failure(false);
        let parsed: serde_json::Value = serde_json::from_str(&failure.to_string()).unwrap();
        assert_eq!(parsed, failure.to_json());
    }

    #[test]
    fn lookup_by_field_and_location() {
        let failure = failure(false);
        assert!(failure.get("page", Location::Query).is_some());
        assert!(failure.get("page", Location::Body).is_none());
    }

    #[test]
    fn missing_schema_message() {
        assert_eq!(
            ConfigurationError::MissingSchema.to_string(),
            "Please provide a validation schema"
        );
    }
}
