//! Building the OpenAPI document from registered routes.

use crate::router::{MethodEntry, RouteInfo, Router};
use http::Method;
use serde_json::json;
use specguard_openapi::{
    create_operation, json_content, DocError, DocRegistry, ErrorBodySchema, ErrorSchema,
    FieldErrorSchema, OpenApiConfig, OpenApiSpec, RequestModel, ResponseSpec, SchemaRef,
    ValidationFailureSchema, VALIDATION_FAILURE,
};
use specguard_validate::OptionsOverride;

const ERROR_SCHEMA: &str = "ErrorSchema";

/// Group for a route registered outside any [`RouteGroup`](crate::RouteGroup):
/// its first literal path segment.
pub(crate) fn default_group(path: &str) -> String {
    path.split('/')
        .find(|segment| !segment.is_empty() && !is_param(segment))
        .unwrap_or("default")
        .to_string()
}

/// Model name for an undescribed route, e.g. `PostUsersId`.
pub(crate) fn default_model_name(method: &Method, path: &str) -> String {
    let mut name = capitalize(&method.as_str().to_ascii_lowercase());
    let words: Vec<&str> = path
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() {
        name.push_str("Root");
    }
    for word in words {
        name.push_str(&capitalize(word));
    }
    name
}

fn is_param(segment: &str) -> bool {
    segment.starts_with(':') || segment.starts_with('*') || segment.starts_with('{')
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn request_model(route: &RouteInfo, method: &Method, entry: &MethodEntry) -> RequestModel {
    let mut model = entry.docs().request.clone().unwrap_or_default();

    if model.group.is_empty() {
        let group = route.group.clone().unwrap_or_else(|| default_group(&route.path));
        model.description = model.description.or_else(|| Some(group.clone()));
        model.group = group;
    }
    if model.model.is_empty() {
        model.model = default_model_name(method, &route.path);
    }

    match entry.validator() {
        Some(validator) => model.with_schema(validator.schema()),
        None => model,
    }
}

/// Describe every documented route of `router`.
///
/// Validated routes also document the failure response for the options in
/// effect, as resolved against `process`. Every operation's `500` response
/// carries the host error body.
pub(crate) fn build_spec(
    router: &Router,
    config: &OpenApiConfig,
    process: &OptionsOverride,
) -> Result<OpenApiSpec, DocError> {
    let mut registry = DocRegistry::new(config.spec());
    let mut validated = false;

    for route in router.routes() {
        for (method, entry) in route.methods.entries() {
            if entry.docs().excluded {
                continue;
            }

            let request = request_model(route, method, entry);
            let version = route.version.as_deref().or(config.route_version.as_deref());
            let mut doc = create_operation(&request, entry.docs().responses.as_ref(), version);

            doc.operation.responses.insert(
                "500".to_string(),
                ResponseSpec::json_ref("Internal Server Error", ERROR_SCHEMA),
            );

            if let Some(validator) = entry.validator() {
                validated = true;
                let options = validator.resolve_options(process);
                let schema = if options.flatten {
                    SchemaRef::Inline(json!({"type": "array", "items": {"type": "string"}}))
                } else {
                    SchemaRef::component(VALIDATION_FAILURE)
                };
                doc.operation
                    .responses
                    .entry(options.status.to_string())
                    .or_insert_with(|| ResponseSpec {
                        description: options.status_text.clone(),
                        content: Some(json_content(schema)),
                    });
            }

            registry.describe(method.as_str(), &route.path, doc)?;
        }
    }

    let mut spec = registry
        .into_spec()
        .register::<ErrorSchema>()
        .register::<ErrorBodySchema>();
    if validated {
        spec = spec
            .register::<ValidationFailureSchema>()
            .register::<FieldErrorSchema>();
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{get, post, RouteGroup};
    use specguard_openapi::{ResponseModel, ResponseModels};
    use specguard_validate::schema::{ObjectSchema, Schema};
    use specguard_validate::RequestSchema;

    async fn handler() -> &'static str {
        "ok"
    }

    #[test]
    fn default_names() {
        assert_eq!(default_group("/users/{id}"), "users");
        assert_eq!(default_group("/:tenant/orders"), "orders");
        assert_eq!(default_group("/"), "default");
        assert_eq!(default_model_name(&Method::POST, "/users/{id}"), "PostUsersId");
        assert_eq!(default_model_name(&Method::GET, "/"), "GetRoot");
    }

    #[test]
    fn validated_route_documents_its_schema_and_failure() {
        let schema = RequestSchema::new()
            .body(ObjectSchema::new().key("name", Schema::string().required()))
            .options(OptionsOverride::new().status(422).status_text("Unprocessable Entity"));
        let router = Router::new().route(
            "/users",
            post(handler)
                .validate(schema)
                .unwrap()
                .responses(ResponseModels::new().status(201, ResponseModel::object().property("id", "integer"))),
        );

        let json = build_spec(&router, &OpenApiConfig::default(), &OptionsOverride::new())
            .unwrap()
            .to_json();

        let op = &json["paths"]["/users"]["post"];
        assert_eq!(op["tags"], json!(["users"]));
        assert_eq!(op["description"], "users");
        assert_eq!(
            op["requestBody"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/PostUsersModel"
        );
        assert_eq!(op["responses"]["422"]["description"], "Unprocessable Entity");
        assert_eq!(
            op["responses"]["422"]["content"]["application/json"]["schema"]["$ref"],
            format!("#/components/schemas/{}", VALIDATION_FAILURE)
        );
        assert_eq!(
            op["responses"]["500"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/ErrorSchema"
        );
        assert!(json["components"]["schemas"][VALIDATION_FAILURE].is_object());
        assert!(json["components"]["schemas"]["PostUsers201ResponseModel"].is_object());
    }

    #[test]
    fn groups_versions_and_exclusions() {
        let group = RouteGroup::new("accounts")
            .version("v3")
            .route("/accounts", get(handler))
            .route("/internal", get(handler).exclude_from_docs());
        let router = Router::new()
            .group(group)
            .route("/orders/{id}", get(handler).describe(RequestModel::new("Order", "shop")));
        let config = OpenApiConfig::default().route_version("v1");

        let json = build_spec(&router, &config, &OptionsOverride::new()).unwrap().to_json();

        assert_eq!(json["paths"]["/accounts"]["get"]["tags"], json!(["accounts-v3"]));
        assert_eq!(json["paths"]["/orders/{id}"]["get"]["tags"], json!(["shop-v1"]));
        assert!(json["paths"]["/internal"].is_null());
        assert!(json["components"]["schemas"][VALIDATION_FAILURE].is_null());
    }

    #[test]
    fn flattened_failures_document_a_message_list() {
        let schema = RequestSchema::new()
            .query(ObjectSchema::new().key("q", Schema::string()))
            .options(OptionsOverride::new().flatten(true));
        let router = Router::new().route("/search", get(handler).validate(schema).unwrap());

        let json = build_spec(&router, &OpenApiConfig::default(), &OptionsOverride::new())
            .unwrap()
            .to_json();

        let failure = &json["paths"]["/search"]["get"]["responses"]["400"];
        assert_eq!(failure["description"], "Bad Request");
        assert_eq!(failure["content"]["application/json"]["schema"]["type"], "array");
    }
}
