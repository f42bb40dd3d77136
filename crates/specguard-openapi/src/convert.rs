//! Translation of validation schemas into OpenAPI (JSON Schema) objects.

use serde_json::{json, Map, Value};
use specguard_validate::schema::{Kind, ObjectSchema, Presence, Rule, Schema};

/// Translate one schema.
///
/// Length, value and item bounds map to the matching JSON Schema keywords
/// for the schema's type; `valid` becomes `enum`.
pub fn schema_to_openapi(schema: &Schema) -> Value {
    let mut out = Map::new();

    match schema.kind {
        Kind::Any => {}
        Kind::Object => {
            out.insert("type".into(), json!("object"));
            if let Some(keys) = &schema.keys {
                merge_object(&mut out, keys);
            }
        }
        Kind::Array => {
            out.insert("type".into(), json!("array"));
            if let Some(items) = &schema.items {
                out.insert("items".into(), schema_to_openapi(items));
            }
        }
        kind => {
            out.insert("type".into(), json!(kind.as_str()));
        }
    }

    for rule in &schema.rules {
        match (rule, schema.kind) {
            (Rule::Min { limit }, Kind::String) => insert_limit(&mut out, "minLength", *limit),
            (Rule::Max { limit }, Kind::String) => insert_limit(&mut out, "maxLength", *limit),
            (Rule::Min { limit }, Kind::Array) => insert_limit(&mut out, "minItems", *limit),
            (Rule::Max { limit }, Kind::Array) => insert_limit(&mut out, "maxItems", *limit),
            (Rule::Min { limit }, _) => insert_limit(&mut out, "minimum", *limit),
            (Rule::Max { limit }, _) => insert_limit(&mut out, "maximum", *limit),
            (Rule::Email, _) => {
                out.insert("format".into(), json!("email"));
            }
            (Rule::Pattern { pattern }, _) => {
                out.insert("pattern".into(), json!(pattern));
            }
        }
    }

    if let Some(valid) = &schema.valid {
        out.insert("enum".into(), Value::Array(valid.clone()));
    }
    if let Some(default) = &schema.default {
        out.insert("default".into(), default.clone());
    }
    if let Some(description) = &schema.description {
        out.insert("description".into(), json!(description));
    }

    Value::Object(out)
}

/// Translate an object schema (a location schema or a body model).
pub fn object_schema_to_openapi(object: &ObjectSchema) -> Value {
    let mut out = Map::new();
    out.insert("type".into(), json!("object"));
    merge_object(&mut out, object);
    Value::Object(out)
}

fn merge_object(out: &mut Map<String, Value>, object: &ObjectSchema) {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in object.fields() {
        if field.schema.presence == Presence::Forbidden {
            continue;
        }
        if field.schema.presence == Presence::Required {
            required.push(json!(field.name));
        }
        properties.insert(field.name.clone(), schema_to_openapi(&field.schema));
    }

    out.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        out.insert("required".into(), Value::Array(required));
    }
}

fn insert_limit(out: &mut Map<String, Value>, keyword: &str, limit: f64) {
    let value = if limit.fract() == 0.0 {
        json!(limit as i64)
    } else {
        json!(limit)
    };
    out.insert(keyword.into(), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_rules() {
        let json = schema_to_openapi(&Schema::string().min(3.0).max(50.0).email().description("Email"));
        assert_eq!(
            json,
            json!({"type": "string", "minLength": 3, "maxLength": 50, "format": "email", "description": "Email"})
        );
    }

    #[test]
    fn numeric_bounds_and_enum() {
        let json = schema_to_openapi(&Schema::integer().min(1.0).valid([1, 2, 3]).default_value(1));
        assert_eq!(json["minimum"], 1);
        assert_eq!(json["enum"], json!([1, 2, 3]));
        assert_eq!(json["default"], 1);
    }

    #[test]
    fn object_lists_required_keys_and_skips_forbidden() {
        let object = ObjectSchema::new()
            .key("name", Schema::string().required())
            .key("tags", Schema::array(Schema::string()).max(5.0))
            .key("id", Schema::any().forbidden());

        let json = object_schema_to_openapi(&object);
        assert_eq!(json["required"], json!(["name"]));
        assert_eq!(json["properties"]["tags"]["maxItems"], 5);
        assert_eq!(json["properties"]["tags"]["items"]["type"], "string");
        assert!(json["properties"].get("id").is_none());
    }

    #[test]
    fn any_has_no_type() {
        assert_eq!(schema_to_openapi(&Schema::any()), json!({}));
    }
}
