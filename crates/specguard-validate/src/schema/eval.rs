//! The schema evaluator.
//!
//! Evaluation never stops at the first violation: every key is checked and
//! every violation is reported. Values are converted where the schema asks for
//! a non-string type and the input is a string (headers, query strings, path
//! parameters and cookies always arrive as strings), and defaults are filled
//! for absent keys. The converted value is returned alongside the violations.

use super::rules::{check_array, check_number, check_string, PatternCache};
use super::{Field, Kind, ObjectSchema, Presence, Rule, Schema};
use crate::error::{ConfigurationError, Violation};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An asynchronous rule referenced by name from [`Schema::external`].
///
/// Returning `Err(reason)` reports an `any.external` violation with the
/// message `"<field>" <reason>`.
///
/// ```rust,ignore
/// struct UniqueEmail(Db);
///
/// #[async_trait]
/// impl ExternalRule for UniqueEmail {
///     async fn check(&self, value: &Value, _context: &Value) -> Result<(), String> {
///         if self.0.email_exists(value.as_str().unwrap_or_default()).await {
///             Err("is already taken".into())
///         } else {
///             Ok(())
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait ExternalRule: Send + Sync {
    /// Check a converted value. `context` is the evaluation context.
    async fn check(&self, value: &Value, context: &Value) -> Result<(), String>;
}

/// Registry of named external rules.
#[derive(Clone, Default)]
pub struct ExternalRules {
    rules: HashMap<String, Arc<dyn ExternalRule>>,
}

impl ExternalRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule under `name`, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, rule: Arc<dyn ExternalRule>) {
        self.rules.insert(name.into(), rule);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ExternalRule>> {
        self.rules.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn ExternalRule>)> {
        self.rules.iter()
    }
}

impl fmt::Debug for ExternalRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalRules")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Per-call evaluation settings.
#[derive(Debug, Clone, Copy)]
pub struct EvalOptions<'a> {
    /// Accept keys the schema does not declare
    pub allow_unknown: bool,
    /// Value visible to `$`-references and external rules
    pub context: &'a Value,
}

/// Result of evaluating one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The converted value (the input with conversions and defaults applied)
    pub value: Value,
    /// Every violation, in schema order
    pub violations: Vec<Violation>,
}

impl Evaluation {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// An object schema with its patterns compiled, ready for evaluation.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    schema: ObjectSchema,
    patterns: PatternCache,
    externals: ExternalRules,
}

impl CompiledSchema {
    /// Compile every `pattern` rule, failing on the first invalid one.
    pub fn compile(schema: ObjectSchema) -> Result<Self, ConfigurationError> {
        let mut patterns = PatternCache::new();
        collect_patterns(schema.fields(), "", &mut patterns)?;
        Ok(Self {
            schema,
            patterns,
            externals: ExternalRules::new(),
        })
    }

    /// Attach the registry used to resolve [`Schema::external`] names.
    pub fn with_externals(mut self, externals: ExternalRules) -> Self {
        self.externals = externals;
        self
    }

    pub fn schema(&self) -> &ObjectSchema {
        &self.schema
    }

    /// Fail when a field names an external rule missing from the registry.
    pub fn check_externals(&self) -> Result<(), ConfigurationError> {
        let mut used = Vec::new();
        collect_externals(self.schema.fields(), "", &mut used);
        match used.into_iter().find(|(_, rule)| self.externals.get(rule).is_none()) {
            Some((field, rule)) => Err(ConfigurationError::UnregisteredRule { field, rule }),
            None => Ok(()),
        }
    }

    /// Evaluate `value` against the schema.
    pub async fn validate(&self, value: &Value, options: &EvalOptions<'_>) -> Evaluation {
        let mut walker = Walker {
            patterns: &self.patterns,
            allow_unknown: options.allow_unknown,
            context: options.context,
            violations: Vec::new(),
            pending: Vec::new(),
        };

        let root = Path::default();
        let value = match value {
            Value::Object(map) => walker.object(self.schema.fields(), map, &root),
            other => {
                walker.fail(&root, format!("\"{}\" must be of type object", root.label()), "object.base");
                other.clone()
            }
        };

        let Walker {
            mut violations,
            pending,
            ..
        } = walker;

        for check in pending {
            let Some(rule) = self.externals.get(&check.rule) else {
                tracing::error!(rule = %check.rule, field = %check.path, "external rule is not registered");
                violations.push(Violation::new(
                    check.path,
                    format!("\"{}\" references unregistered rule \"{}\"", check.label, check.rule),
                    "any.external",
                ));
                continue;
            };
            if let Err(reason) = rule.check(&check.value, options.context).await {
                violations.push(Violation::new(
                    check.path,
                    format!("\"{}\" {}", check.label, reason),
                    "any.external",
                ));
            }
        }

        Evaluation { value, violations }
    }
}

fn collect_patterns(
    fields: &[Field],
    prefix: &str,
    patterns: &mut PatternCache,
) -> Result<(), ConfigurationError> {
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{prefix}.{}", field.name)
        };
        collect_schema_patterns(&field.schema, &path, patterns)?;
    }
    Ok(())
}

fn collect_externals(fields: &[Field], prefix: &str, used: &mut Vec<(String, String)>) {
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{prefix}.{}", field.name)
        };
        collect_schema_externals(&field.schema, &path, used);
    }
}

fn collect_schema_externals(schema: &Schema, path: &str, used: &mut Vec<(String, String)>) {
    used.extend(schema.external.iter().map(|rule| (path.to_string(), rule.clone())));
    if let Some(keys) = &schema.keys {
        collect_externals(keys.fields(), path, used);
    }
    if let Some(items) = &schema.items {
        collect_schema_externals(items, path, used);
    }
}

fn collect_schema_patterns(
    schema: &Schema,
    path: &str,
    patterns: &mut PatternCache,
) -> Result<(), ConfigurationError> {
    for rule in &schema.rules {
        if let Rule::Pattern { pattern } = rule {
            if !patterns.contains_key(pattern) {
                let regex = Regex::new(pattern).map_err(|source| ConfigurationError::InvalidPattern {
                    field: path.to_string(),
                    source,
                })?;
                patterns.insert(pattern.clone(), regex);
            }
        }
    }
    if let Some(keys) = &schema.keys {
        collect_patterns(keys.fields(), path, patterns)?;
    }
    if let Some(items) = &schema.items {
        collect_schema_patterns(items, path, patterns)?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a value inside the evaluated document.
#[derive(Debug, Clone, Default)]
struct Path(Vec<Segment>);

impl Path {
    fn key(&self, key: &str) -> Path {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(key.to_string()));
        Path(segments)
    }

    fn index(&self, index: usize) -> Path {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Path(segments)
    }

    /// Dotted form used as the error field (`tags.0`).
    fn field(&self) -> String {
        self.0
            .iter()
            .map(|s| match s {
                Segment::Key(k) => k.clone(),
                Segment::Index(i) => i.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Display form used inside messages (`tags[0]`).
    fn label(&self) -> String {
        if self.0.is_empty() {
            return "value".to_string();
        }
        let mut label = String::new();
        for segment in &self.0 {
            match segment {
                Segment::Key(k) => {
                    if !label.is_empty() {
                        label.push('.');
                    }
                    label.push_str(k);
                }
                Segment::Index(i) => label.push_str(&format!("[{i}]")),
            }
        }
        label
    }
}

struct PendingCheck {
    path: String,
    label: String,
    rule: String,
    value: Value,
}

struct Walker<'a> {
    patterns: &'a PatternCache,
    allow_unknown: bool,
    context: &'a Value,
    violations: Vec<Violation>,
    pending: Vec<PendingCheck>,
}

impl Walker<'_> {
    fn fail(&mut self, path: &Path, message: String, kind: &str) {
        self.violations.push(Violation::new(path.field(), message, kind));
    }

    fn object(&mut self, fields: &[Field], input: &Map<String, Value>, path: &Path) -> Value {
        let mut output = input.clone();

        for field in fields {
            let child = path.key(&field.name);
            let presence = self.presence(&field.schema, input);

            match input.get(&field.name) {
                None => {
                    if presence == Presence::Required {
                        self.fail(&child, format!("\"{}\" is required", child.label()), "any.required");
                    } else if let Some(default) = &field.schema.default {
                        output.insert(field.name.clone(), default.clone());
                    }
                }
                Some(_) if presence == Presence::Forbidden => {
                    self.fail(&child, format!("\"{}\" is not allowed", child.label()), "any.unknown");
                }
                Some(value) => {
                    let converted = self.value(&field.schema, value, &child);
                    output.insert(field.name.clone(), converted);
                }
            }
        }

        if !self.allow_unknown {
            for key in input.keys() {
                if !fields.iter().any(|f| &f.name == key) {
                    let child = path.key(key);
                    self.fail(&child, format!("\"{}\" is not allowed", child.label()), "object.unknown");
                }
            }
        }

        Value::Object(output)
    }

    /// The first matching condition wins; with none matching, the first
    /// `otherwise` applies, then the schema's own presence.
    fn presence(&self, schema: &Schema, siblings: &Map<String, Value>) -> Presence {
        let mut fallback = None;
        for condition in &schema.conditions {
            let target = match condition.reference.strip_prefix('$') {
                Some(context_path) => lookup(self.context, context_path),
                None => siblings.get(&condition.reference),
            };
            if target.is_some_and(|t| loosely_equal(t, &condition.equals)) {
                return condition.then;
            }
            fallback = fallback.or(condition.otherwise);
        }
        fallback.unwrap_or(schema.presence)
    }

    fn value(&mut self, schema: &Schema, value: &Value, path: &Path) -> Value {
        let before = self.violations.len();
        let label = path.label();

        let converted = match schema.kind {
            Kind::Any => value.clone(),
            Kind::String => self.string(schema, value, path, &label),
            Kind::Number | Kind::Integer => self.number(schema, value, path, &label),
            Kind::Boolean => match to_bool(value) {
                Some(b) => Value::Bool(b),
                None => {
                    self.fail(path, format!("\"{label}\" must be a boolean"), "boolean.base");
                    value.clone()
                }
            },
            Kind::Object => match value {
                Value::Object(map) => match &schema.keys {
                    Some(keys) => self.object(keys.fields(), map, path),
                    None => value.clone(),
                },
                _ => {
                    self.fail(path, format!("\"{label}\" must be of type object"), "object.base");
                    value.clone()
                }
            },
            Kind::Array => self.array(schema, value, path, &label),
        };

        if let Some(valid) = &schema.valid {
            if self.violations.len() == before && !valid.iter().any(|v| loosely_equal(&converted, v)) {
                let choices = valid.iter().map(display_value).collect::<Vec<_>>().join(", ");
                self.fail(path, format!("\"{label}\" must be one of [{choices}]"), "any.only");
            }
        }

        if self.violations.len() == before {
            for rule in &schema.external {
                self.pending.push(PendingCheck {
                    path: path.field(),
                    label: label.clone(),
                    rule: rule.clone(),
                    value: converted.clone(),
                });
            }
        }

        converted
    }

    fn string(&mut self, schema: &Schema, value: &Value, path: &Path, label: &str) -> Value {
        let Value::String(s) = value else {
            self.fail(path, format!("\"{label}\" must be a string"), "string.base");
            return value.clone();
        };

        let empty_allowed = schema
            .valid
            .as_ref()
            .is_some_and(|valid| valid.iter().any(|v| v.as_str() == Some("")));
        if s.is_empty() && !empty_allowed {
            self.fail(path, format!("\"{label}\" is not allowed to be empty"), "string.empty");
            return value.clone();
        }

        for rule in &schema.rules {
            if let Some((message, kind)) = check_string(rule, label, s, self.patterns) {
                self.fail(path, message, kind);
            }
        }
        value.clone()
    }

    fn number(&mut self, schema: &Schema, value: &Value, path: &Path, label: &str) -> Value {
        let Some(n) = to_number(value) else {
            self.fail(path, format!("\"{label}\" must be a number"), "number.base");
            return value.clone();
        };

        if schema.kind == Kind::Integer && n.fract() != 0.0 {
            self.fail(path, format!("\"{label}\" must be an integer"), "number.integer");
        }
        for rule in &schema.rules {
            if let Some((message, kind)) = check_number(rule, label, n) {
                self.fail(path, message, kind);
            }
        }

        match value {
            Value::Number(_) if schema.kind == Kind::Number => value.clone(),
            _ => number_value(n),
        }
    }

    fn array(&mut self, schema: &Schema, value: &Value, path: &Path, label: &str) -> Value {
        let Value::Array(items) = value else {
            self.fail(path, format!("\"{label}\" must be an array"), "array.base");
            return value.clone();
        };

        for rule in &schema.rules {
            if let Some((message, kind)) = check_array(rule, label, items.len()) {
                self.fail(path, message, kind);
            }
        }

        match &schema.items {
            Some(item_schema) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.value(item_schema, item, &path.index(i)))
                    .collect(),
            ),
            None => value.clone(),
        }
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn number_value(n: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Equality that also matches a string against the text of a scalar
/// (`"1"` equals `1`, `"true"` equals `true`).
fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::Number(_) | Value::Bool(_)) => *a == expected.to_string(),
        (Value::Number(_) | Value::Bool(_), Value::String(b)) => actual.to_string() == *b,
        _ => false,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Resolve a dotted path (`body.kind`, `items.0.id`) inside a value.
fn lookup<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn eval(schema: ObjectSchema, value: Value, allow_unknown: bool) -> Evaluation {
        let compiled = CompiledSchema::compile(schema).unwrap();
        compiled
            .validate(
                &value,
                &EvalOptions {
                    allow_unknown,
                    context: &value,
                },
            )
            .await
    }

    fn kinds(evaluation: &Evaluation) -> Vec<(&str, &str)> {
        evaluation
            .violations
            .iter()
            .map(|v| (v.path.as_str(), v.kind.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn missing_required_key() {
        let schema = ObjectSchema::new().key("name", Schema::string().required());
        let result = eval(schema, json!({}), true).await;

        assert_eq!(kinds(&result), [("name", "any.required")]);
        assert_eq!(result.violations[0].message, "\"name\" is required");
    }

    #[tokio::test]
    async fn collects_every_violation() {
        let schema = ObjectSchema::new()
            .key("name", Schema::string().min(3.0).pattern("^[a-z]+$"))
            .key("age", Schema::integer().min(18.0));
        let result = eval(schema, json!({"name": "A", "age": 15.5}), true).await;

        assert_eq!(
            kinds(&result),
            [
                ("name", "string.min"),
                ("name", "string.pattern.base"),
                ("age", "number.integer"),
                ("age", "number.min"),
            ]
        );
    }

    #[tokio::test]
    async fn converts_strings_to_declared_types() {
        let schema = ObjectSchema::new()
            .key("page", Schema::integer())
            .key("ratio", Schema::number())
            .key("active", Schema::boolean());
        let result = eval(schema, json!({"page": "2", "ratio": "0.5", "active": "TRUE"}), true).await;

        assert!(result.is_valid());
        assert_eq!(result.value, json!({"page": 2, "ratio": 0.5, "active": true}));
    }

    #[tokio::test]
    async fn whole_floats_become_integers() {
        let schema = ObjectSchema::new()
            .key("n", Schema::integer())
            .key("m", Schema::integer())
            .key("ratio", Schema::number());
        let result = eval(schema, json!({"n": 3.0, "m": "3.0", "ratio": 2.0}), true).await;

        assert!(result.is_valid());
        assert_eq!(result.value, json!({"n": 3, "m": 3, "ratio": 2.0}));
        assert!(result.value["n"].is_i64());
        assert!(result.value["ratio"].is_f64());
    }

    #[tokio::test]
    async fn unconvertible_strings_fail_type_check() {
        let schema = ObjectSchema::new()
            .key("page", Schema::number())
            .key("active", Schema::boolean());
        let result = eval(schema, json!({"page": "two", "active": "yes"}), true).await;

        assert_eq!(kinds(&result), [("page", "number.base"), ("active", "boolean.base")]);
    }

    #[tokio::test]
    async fn fills_defaults_and_keeps_unknown_keys() {
        let schema = ObjectSchema::new().key("limit", Schema::integer().default_value(20));
        let result = eval(schema, json!({"extra": "kept"}), true).await;

        assert!(result.is_valid());
        assert_eq!(result.value, json!({"extra": "kept", "limit": 20}));
    }

    #[tokio::test]
    async fn rejects_unknown_keys_when_disallowed() {
        let schema = ObjectSchema::new().key("name", Schema::string());
        let result = eval(schema, json!({"name": "ok", "admin": true}), false).await;

        assert_eq!(kinds(&result), [("admin", "object.unknown")]);
        assert_eq!(result.violations[0].message, "\"admin\" is not allowed");
    }

    #[tokio::test]
    async fn forbidden_key_present() {
        let schema = ObjectSchema::new().key("id", Schema::any().forbidden());
        let result = eval(schema, json!({"id": 1}), true).await;
        assert_eq!(kinds(&result), [("id", "any.unknown")]);
    }

    #[tokio::test]
    async fn nested_paths_and_labels() {
        let schema = ObjectSchema::new()
            .key(
                "address",
                Schema::object(ObjectSchema::new().key("city", Schema::string().required())),
            )
            .key("tags", Schema::array(Schema::string()).max(2.0));
        let result = eval(schema, json!({"address": {}, "tags": ["a", 1, "c"]}), true).await;

        assert_eq!(
            kinds(&result),
            [
                ("address.city", "any.required"),
                ("tags", "array.max"),
                ("tags.1", "string.base"),
            ]
        );
        assert_eq!(result.violations[2].message, "\"tags[1]\" must be a string");
    }

    #[tokio::test]
    async fn valid_set() {
        let schema = ObjectSchema::new().key("role", Schema::string().valid(["admin", "user"]));
        let result = eval(schema, json!({"role": "root"}), true).await;

        assert_eq!(kinds(&result), [("role", "any.only")]);
        assert_eq!(result.violations[0].message, "\"role\" must be one of [admin, user]");
    }

    #[tokio::test]
    async fn empty_string_is_rejected() {
        let schema = ObjectSchema::new().key("name", Schema::string());
        let result = eval(schema, json!({"name": ""}), true).await;
        assert_eq!(kinds(&result), [("name", "string.empty")]);
    }

    #[tokio::test]
    async fn sibling_condition_makes_key_required() {
        let schema = ObjectSchema::new()
            .key("kind", Schema::string())
            .key("company", Schema::string().when("kind", "business", Presence::Required));

        let personal = eval(schema.clone(), json!({"kind": "personal"}), true).await;
        assert!(personal.is_valid());

        let business = eval(schema, json!({"kind": "business"}), true).await;
        assert_eq!(kinds(&business), [("company", "any.required")]);
    }

    #[tokio::test]
    async fn every_condition_is_checked_before_otherwise() {
        let schema = ObjectSchema::new()
            .key("kind", Schema::string())
            .key(
                "company",
                Schema::string()
                    .when_else("kind", "business", Presence::Required, Presence::Forbidden)
                    .when("kind", "partner", Presence::Required),
            );

        let partner = eval(schema.clone(), json!({"kind": "partner"}), true).await;
        assert_eq!(kinds(&partner), [("company", "any.required")]);

        let personal = eval(schema, json!({"kind": "personal", "company": "Acme"}), true).await;
        assert_eq!(kinds(&personal), [("company", "any.unknown")]);
    }

    #[tokio::test]
    async fn context_condition() {
        let schema = ObjectSchema::new().key(
            "x-tenant",
            Schema::string().when("$body.scope", "tenant", Presence::Required),
        );
        let compiled = CompiledSchema::compile(schema).unwrap();
        let context = json!({"body": {"scope": "tenant"}});
        let result = compiled
            .validate(
                &json!({}),
                &EvalOptions {
                    allow_unknown: true,
                    context: &context,
                },
            )
            .await;

        assert_eq!(kinds(&result), [("x-tenant", "any.required")]);
    }

    #[tokio::test]
    async fn non_object_root() {
        let schema = ObjectSchema::new().key("name", Schema::string());
        let result = eval(schema, json!([1, 2]), true).await;
        assert_eq!(kinds(&result), [("", "object.base")]);
        assert_eq!(result.violations[0].message, "\"value\" must be of type object");
    }

    #[test]
    fn invalid_pattern_fails_compilation() {
        let schema = ObjectSchema::new().key(
            "address",
            Schema::object(ObjectSchema::new().key("zip", Schema::string().pattern("(["))),
        );
        match CompiledSchema::compile(schema) {
            Err(ConfigurationError::InvalidPattern { field, .. }) => assert_eq!(field, "address.zip"),
            other => panic!("expected invalid pattern, got {other:?}"),
        }
    }

    struct Reserved;

    #[async_trait]
    impl ExternalRule for Reserved {
        async fn check(&self, value: &Value, _context: &Value) -> Result<(), String> {
            if value == "admin" {
                Err("is reserved".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn external_rules_run_after_builtin_checks() {
        let mut externals = ExternalRules::new();
        externals.insert("reserved", Arc::new(Reserved));
        let schema = ObjectSchema::new()
            .key("username", Schema::string().external("reserved"))
            .key("alias", Schema::string().min(10.0).external("reserved"));
        let compiled = CompiledSchema::compile(schema).unwrap().with_externals(externals);

        let value = json!({"username": "admin", "alias": "admin"});
        let result = compiled
            .validate(
                &value,
                &EvalOptions {
                    allow_unknown: true,
                    context: &value,
                },
            )
            .await;

        // alias fails its length rule, so the external check is skipped for it
        assert_eq!(kinds(&result), [("alias", "string.min"), ("username", "any.external")]);
        assert_eq!(result.violations[1].message, "\"username\" is reserved");
    }

    #[test]
    fn unregistered_external_rule_is_reported() {
        let schema = ObjectSchema::new().key(
            "profile",
            Schema::object(ObjectSchema::new().key("handle", Schema::string().external("reserved"))),
        );
        let compiled = CompiledSchema::compile(schema).unwrap();
        match compiled.check_externals() {
            Err(ConfigurationError::UnregisteredRule { field, rule }) => {
                assert_eq!(field, "profile.handle");
                assert_eq!(rule, "reserved");
            }
            other => panic!("expected unregistered rule, got {other:?}"),
        }

        let mut externals = ExternalRules::new();
        externals.insert("reserved", Arc::new(Reserved));
        assert!(compiled.with_externals(externals).check_externals().is_ok());
    }

    #[tokio::test]
    async fn unregistered_external_rule_rejects_value() {
        let schema = ObjectSchema::new().key("username", Schema::string().external("reserved"));
        let result = eval(schema, json!({"username": "grace"}), true).await;

        assert_eq!(kinds(&result), [("username", "any.external")]);
        assert_eq!(
            result.violations[0].message,
            "\"username\" references unregistered rule \"reserved\""
        );
    }

    #[test]
    fn loose_equality() {
        assert!(loosely_equal(&json!("1"), &json!(1)));
        assert!(loosely_equal(&json!(true), &json!("true")));
        assert!(loosely_equal(&json!(2), &json!(2.0)));
        assert!(!loosely_equal(&json!("a"), &json!("b")));
    }

    #[test]
    fn lookup_dotted_paths() {
        let value = json!({"body": {"items": [{"id": 7}]}});
        assert_eq!(lookup(&value, "body.items.0.id"), Some(&json!(7)));
        assert_eq!(lookup(&value, "body.missing"), None);
    }
}
