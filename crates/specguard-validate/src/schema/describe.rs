use super::{Kind, ObjectSchema, Presence, Schema};
use serde::Serialize;

/// Documentation-facing summary of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDescriptor {
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Summarize a schema for documentation.
pub fn describe(schema: &Schema) -> SchemaDescriptor {
    SchemaDescriptor {
        required: schema.presence == Presence::Required,
        kind: schema.kind.as_str().to_string(),
        description: schema.description.clone(),
    }
}

/// Summarize every key of an object schema, in declaration order.
pub fn describe_keys(object: &ObjectSchema) -> Vec<(String, SchemaDescriptor)> {
    object
        .fields()
        .iter()
        .map(|field| (field.name.clone(), describe(&field.schema)))
        .collect()
}

impl SchemaDescriptor {
    /// Whether the described value is a nested object.
    pub fn is_object(&self) -> bool {
        self.kind == Kind::Object.as_str()
    }
}
