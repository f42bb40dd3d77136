//! Declarative schemas for request locations.
//!
//! A location schema is an [`ObjectSchema`]: an ordered list of keys, each
//! with a [`Schema`] describing its type, presence and rules.
//!
//! ```rust
//! use specguard_validate::schema::{ObjectSchema, Schema};
//!
//! let body = ObjectSchema::new()
//!     .key("name", Schema::string().required().min(3.0))
//!     .key("email", Schema::string().email())
//!     .key("age", Schema::integer().min(18.0).max(120.0))
//!     .key("role", Schema::string().valid(["admin", "user"]));
//! assert_eq!(body.len(), 4);
//! ```
//!
//! Schemas are plain data and can also be loaded with `serde`:
//!
//! ```json
//! [
//!   {"name": "name", "type": "string", "presence": "required", "rules": [{"rule": "min", "limit": 3}]},
//!   {"name": "page", "type": "integer", "default": 1}
//! ]
//! ```

mod describe;
mod eval;
mod rules;

pub use describe::{describe, describe_keys, SchemaDescriptor};
pub use eval::{CompiledSchema, EvalOptions, Evaluation, ExternalRule, ExternalRules};
pub use rules::Rule;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Declared value type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    #[default]
    Any,
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Any => "any",
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Integer => "integer",
            Kind::Boolean => "boolean",
            Kind::Object => "object",
            Kind::Array => "array",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a key must, may, or must not be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    #[default]
    Optional,
    Required,
    Forbidden,
}

/// Conditional presence.
///
/// `reference` names a sibling key, or a context path when it starts with
/// `$` (e.g. `"$body.kind"` with whole-request context enabled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub reference: String,
    pub equals: Value,
    pub then: Presence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otherwise: Option<Presence>,
}

/// Schema of a single value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    #[serde(rename = "type")]
    pub kind: Kind,
    pub presence: Presence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Allowed values; anything else fails with `any.only`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    /// Nested keys for `object` schemas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<ObjectSchema>,
    /// Element schema for `array` schemas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(rename = "when", skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Names of asynchronous rules registered on the validator
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub external: Vec<String>,
}

impl Schema {
    fn of(kind: Kind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// A value of any type.
    pub fn any() -> Self {
        Self::of(Kind::Any)
    }

    pub fn string() -> Self {
        Self::of(Kind::String)
    }

    pub fn number() -> Self {
        Self::of(Kind::Number)
    }

    pub fn integer() -> Self {
        Self::of(Kind::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(Kind::Boolean)
    }

    /// An object with the given keys.
    pub fn object(keys: ObjectSchema) -> Self {
        Self {
            keys: Some(keys),
            ..Self::of(Kind::Object)
        }
    }

    /// An array whose elements match `items`.
    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of(Kind::Array)
        }
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn forbidden(mut self) -> Self {
        self.presence = Presence::Forbidden;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Value inserted when the key is absent.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Restrict the value to a fixed set.
    pub fn valid<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.valid = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Minimum length (strings, arrays) or value (numbers).
    pub fn min(mut self, limit: f64) -> Self {
        self.rules.push(Rule::Min { limit });
        self
    }

    /// Maximum length (strings, arrays) or value (numbers).
    pub fn max(mut self, limit: f64) -> Self {
        self.rules.push(Rule::Max { limit });
        self
    }

    pub fn email(mut self) -> Self {
        self.rules.push(Rule::Email);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.rules.push(Rule::Pattern {
            pattern: pattern.into(),
        });
        self
    }

    /// Switch presence to `then` when `reference` equals `equals`.
    pub fn when(mut self, reference: impl Into<String>, equals: impl Into<Value>, then: Presence) -> Self {
        self.conditions.push(Condition {
            reference: reference.into(),
            equals: equals.into(),
            then,
            otherwise: None,
        });
        self
    }

    /// Like [`when`](Self::when), with the presence to use when no condition
    /// of this schema matches.
    pub fn when_else(
        mut self,
        reference: impl Into<String>,
        equals: impl Into<Value>,
        then: Presence,
        otherwise: Presence,
    ) -> Self {
        self.conditions.push(Condition {
            reference: reference.into(),
            equals: equals.into(),
            then,
            otherwise: Some(otherwise),
        });
        self
    }

    /// Run a named asynchronous rule once the built-in checks pass.
    pub fn external(mut self, name: impl Into<String>) -> Self {
        self.external.push(name.into());
        self
    }
}

/// A named key inside an [`ObjectSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub schema: Schema,
}

/// Ordered keys of an object. Declaration order is the order in which
/// violations are reported and parameters are documented.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectSchema {
    fields: Vec<Field>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key. A key declared twice keeps the later schema.
    pub fn key(mut self, name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.schema = schema,
            None => self.fields.push(Field { name, schema }),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.schema)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Schema)> for ObjectSchema {
    fn from_iter<I: IntoIterator<Item = (String, Schema)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ObjectSchema::new(), |schema, (name, field)| schema.key(name, field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_sets_presence_and_rules() {
        let schema = Schema::string().required().min(3.0).email();
        assert_eq!(schema.kind, Kind::String);
        assert_eq!(schema.presence, Presence::Required);
        assert_eq!(schema.rules, vec![Rule::Min { limit: 3.0 }, Rule::Email]);
    }

    #[test]
    fn redeclared_key_replaces_schema() {
        let object = ObjectSchema::new()
            .key("id", Schema::string())
            .key("id", Schema::integer());
        assert_eq!(object.len(), 1);
        assert_eq!(object.get("id").map(|s| s.kind), Some(Kind::Integer));
    }

    #[test]
    fn deserializes_ordered_keys() {
        let object: ObjectSchema = serde_json::from_value(json!([
            {"name": "name", "type": "string", "presence": "required", "rules": [{"rule": "min", "limit": 3}]},
            {"name": "page", "type": "integer", "default": 1},
            {"name": "kind", "when": [{"reference": "name", "equals": "x", "then": "required"}]}
        ]))
        .unwrap();

        let names: Vec<_> = object.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["name", "page", "kind"]);
        assert_eq!(object.get("page").and_then(|s| s.default.clone()), Some(json!(1)));
        assert_eq!(object.get("kind").map(|s| s.conditions.len()), Some(1));
    }
}
