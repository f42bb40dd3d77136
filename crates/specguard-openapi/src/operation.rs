//! Building one documented operation from a route's models.

use crate::convert::{object_schema_to_openapi, schema_to_openapi};
use crate::model::{RequestModel, ResponseModels};
use crate::spec::{json_content, Operation, Parameter, ParameterIn, RequestBody, ResponseSpec, SchemaRef};
use serde_json::Value;
use specguard_validate::schema::{ObjectSchema, Presence};

/// An operation plus the component schemas it references.
#[derive(Debug, Clone)]
pub struct OperationDoc {
    pub operation: Operation,
    pub schemas: Vec<(String, Value)>,
}

/// Description for a status code: its reason phrase, or empty when the code
/// has none.
pub fn status_text(status: &str) -> String {
    status
        .parse::<u16>()
        .ok()
        .and_then(|code| http::StatusCode::from_u16(code).ok())
        .and_then(|code| code.canonical_reason())
        .unwrap_or_default()
        .to_string()
}

/// Build the operation for a route.
///
/// The tag is the model's group, suffixed with `-{version}` when a version is
/// given. A `500` response is always present; every declared response model
/// adds a response referencing `{model}{status}ResponseModel`. A body schema
/// becomes a required JSON request body referencing `{model}Model`, and
/// query, path and header keys become parameters.
pub fn create_operation(
    request: &RequestModel,
    responses: Option<&ResponseModels>,
    version: Option<&str>,
) -> OperationDoc {
    let tag = match version {
        Some(version) if !version.is_empty() => format!("{}-{}", request.group, version),
        _ => request.group.clone(),
    };

    let mut operation = Operation::new().tag(tag).response(
        "500",
        ResponseSpec {
            description: status_text("500"),
            content: None,
        },
    );
    if let Some(description) = &request.description {
        operation = operation.description(description.clone());
    }

    let mut schemas = Vec::new();

    for (status, model) in responses.into_iter().flat_map(|models| models.iter()) {
        let name = format!("{}{}ResponseModel", request.model, status);
        operation = operation.response(status, ResponseSpec::json_ref(status_text(status), &name));
        schemas.push((name, model.to_schema()));
    }

    if let Some(body) = &request.body {
        let name = format!("{}Model", request.model);
        operation.request_body = Some(RequestBody {
            description: request.description.clone(),
            required: true,
            content: json_content(SchemaRef::component(&name)),
        });
        schemas.push((name, object_schema_to_openapi(body)));
    }

    let locations = [
        (&request.query, ParameterIn::Query),
        (&request.path, ParameterIn::Path),
        (&request.headers, ParameterIn::Header),
    ];
    for (object, location) in locations {
        if let Some(object) = object {
            operation.parameters.extend(parameters(object, location));
        }
    }

    OperationDoc { operation, schemas }
}

fn parameters(object: &ObjectSchema, location: ParameterIn) -> impl Iterator<Item = Parameter> + '_ {
    object.fields().iter().map(move |field| {
        let mut schema = schema_to_openapi(&field.schema);
        let description = match &mut schema {
            Value::Object(map) => map
                .remove("description")
                .and_then(|d| d.as_str().map(str::to_string)),
            _ => None,
        };
        Parameter {
            name: field.name.clone(),
            location,
            // path parameters are always required in OpenAPI
            required: location == ParameterIn::Path || field.schema.presence == Presence::Required,
            description,
            schema: SchemaRef::Inline(schema),
        }
    })
}
