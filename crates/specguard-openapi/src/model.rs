//! Request and response models attached to documented routes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use specguard_validate::schema::ObjectSchema;
use specguard_validate::RequestSchema;
use std::collections::BTreeMap;

/// Documentation metadata for one route.
///
/// `model` names the generated component schemas (`{model}Model` for the
/// body, `{model}{status}ResponseModel` per response) and `group` becomes the
/// operation tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestModel {
    pub model: String,
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "header")]
    pub headers: Option<ObjectSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ObjectSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<ObjectSchema>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "params")]
    pub path: Option<ObjectSchema>,
    #[serde(alias = "excludeFromSwagger")]
    pub exclude_from_docs: bool,
}

impl RequestModel {
    pub fn new(model: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            group: group.into(),
            ..Self::default()
        }
    }

    /// Take the header, body, query and path schemas from a validation schema.
    pub fn from_schema(model: impl Into<String>, group: impl Into<String>, schema: &RequestSchema) -> Self {
        Self::new(model, group).with_schema(schema)
    }

    /// Fill every location not already set from a validation schema.
    pub fn with_schema(mut self, schema: &RequestSchema) -> Self {
        self.headers = self.headers.or_else(|| schema.headers.clone());
        self.body = self.body.or_else(|| schema.body.clone());
        self.query = self.query.or_else(|| schema.query.clone());
        self.path = self.path.or_else(|| schema.params.clone());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn headers(mut self, schema: ObjectSchema) -> Self {
        self.headers = Some(schema);
        self
    }

    pub fn body(mut self, schema: ObjectSchema) -> Self {
        self.body = Some(schema);
        self
    }

    pub fn query(mut self, schema: ObjectSchema) -> Self {
        self.query = Some(schema);
        self
    }

    pub fn path(mut self, schema: ObjectSchema) -> Self {
        self.path = Some(schema);
        self
    }

    /// Leave the route out of the generated document.
    pub fn exclude_from_docs(mut self) -> Self {
        self.exclude_from_docs = true;
        self
    }
}

/// Shape of one response body.
///
/// Property values are JSON Schema fragments; a bare string is shorthand for
/// `{"type": <string>}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseModel {
    pub properties: Map<String, Value>,
    pub is_array: bool,
}

impl ResponseModel {
    /// An object response.
    pub fn object() -> Self {
        Self::default()
    }

    /// An array-of-objects response.
    pub fn array() -> Self {
        Self {
            is_array: true,
            ..Self::default()
        }
    }

    /// Add a property. Strings are expanded to `{"type": ...}`.
    pub fn property(mut self, name: impl Into<String>, schema: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), expand_property(schema.into()));
        self
    }

    /// JSON Schema of the response body.
    pub fn to_schema(&self) -> Value {
        let object = json!({
            "type": "object",
            "properties": self.properties,
        });
        if self.is_array {
            json!({"type": "array", "items": object})
        } else {
            object
        }
    }
}

fn expand_property(value: Value) -> Value {
    match value {
        Value::String(kind) => json!({ "type": kind }),
        other => other,
    }
}

impl From<Value> for ResponseModel {
    /// An object becomes an object model; a non-empty array becomes an array
    /// model of its first element. Anything else is an empty object model.
    fn from(value: Value) -> Self {
        let (value, is_array) = match value {
            Value::Array(items) => match items.into_iter().next() {
                Some(first) => (first, true),
                None => (Value::Null, false),
            },
            other => (other, false),
        };
        let properties = match value {
            Value::Object(map) => map.into_iter().map(|(k, v)| (k, expand_property(v))).collect(),
            _ => Map::new(),
        };
        Self { properties, is_array }
    }
}

impl<'de> Deserialize<'de> for ResponseModel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(ResponseModel::from)
    }
}

/// Response models of one route, keyed by status code.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ResponseModels {
    models: BTreeMap<String, ResponseModel>,
}

impl ResponseModels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the body of a status.
    pub fn status(mut self, status: u16, model: ResponseModel) -> Self {
        self.models.insert(status.to_string(), model);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResponseModel)> {
        self.models.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl FromIterator<(u16, ResponseModel)> for ResponseModels {
    fn from_iter<I: IntoIterator<Item = (u16, ResponseModel)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ResponseModels::new(), |models, (status, model)| models.status(status, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specguard_validate::schema::Schema;

    #[test]
    fn string_properties_are_expanded() {
        let model = ResponseModel::object()
            .property("id", "integer")
            .property("name", json!({"type": "string", "maxLength": 10}));

        assert_eq!(
            model.to_schema(),
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "integer"},
                    "name": {"type": "string", "maxLength": 10}
                }
            })
        );
    }

    #[test]
    fn array_shorthand_uses_first_element() {
        let model = ResponseModel::from(json!([{"id": "integer"}, {"ignored": "string"}]));
        assert!(model.is_array);
        assert_eq!(model.to_schema()["items"]["properties"]["id"]["type"], "integer");
        assert!(model.to_schema()["items"]["properties"].get("ignored").is_none());
    }

    #[test]
    fn response_models_deserialize_by_status() {
        let models: ResponseModels =
            serde_json::from_value(json!({"200": {"id": "integer"}, "404": {"message": "string"}})).unwrap();
        let statuses: Vec<_> = models.iter().map(|(s, _)| s).collect();
        assert_eq!(statuses, ["200", "404"]);
    }

    #[test]
    fn request_model_takes_locations_from_schema() {
        let schema = RequestSchema::new()
            .body(ObjectSchema::new().key("name", Schema::string()))
            .params(ObjectSchema::new().key("id", Schema::integer()));
        let model = RequestModel::from_schema("User", "users", &schema);

        assert!(model.body.is_some());
        assert!(model.path.is_some());
        assert!(model.query.is_none());
    }

    #[test]
    fn request_model_accepts_legacy_exclusion_flag() {
        let model: RequestModel =
            serde_json::from_value(json!({"model": "Health", "group": "ops", "excludeFromSwagger": true})).unwrap();
        assert!(model.exclude_from_docs);
    }
}
