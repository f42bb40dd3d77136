//! OpenAPI documentation for specguard
//!
//! Builds an OpenAPI 3.0 document from the same schemas routes use for
//! request validation, and serves it with Swagger UI.
//!
//! # Usage
//!
//! ```rust
//! use specguard_openapi::{create_operation, DocRegistry, OpenApiSpec, RequestModel, ResponseModel, ResponseModels};
//! use specguard_validate::schema::{ObjectSchema, Schema};
//!
//! let request = RequestModel::new("User", "users")
//!     .description("Create a user")
//!     .body(ObjectSchema::new().key("name", Schema::string().required()));
//! let responses = ResponseModels::new().status(201, ResponseModel::object().property("id", "integer"));
//!
//! let mut registry = DocRegistry::new(OpenApiSpec::new("Users", "1.0.0"));
//! registry
//!     .describe("post", "/users", create_operation(&request, Some(&responses), Some("v1")))
//!     .unwrap();
//!
//! let json = registry.spec().to_json();
//! assert_eq!(json["paths"]["/users"]["post"]["tags"][0], "users-v1");
//! assert!(json["components"]["schemas"]["User201ResponseModel"].is_object());
//! ```

mod config;
mod convert;
mod error;
mod model;
mod operation;
mod registry;
mod schemas;
mod spec;
#[cfg(feature = "swagger-ui")]
mod swagger;

pub use config::OpenApiConfig;
pub use convert::{object_schema_to_openapi, schema_to_openapi};
pub use error::DocError;
pub use model::{RequestModel, ResponseModel, ResponseModels};
pub use operation::{create_operation, status_text, OperationDoc};
pub use registry::{ensure_at_least_one_response, to_openapi_path, DocRegistry};
pub use schemas::{
    ErrorBodySchema, ErrorSchema, FieldErrorSchema, ValidationFailureSchema, VALIDATION_FAILURE,
};
pub use spec::{
    json_content, ApiInfo, MediaType, OpenApiSpec, Operation, Parameter, ParameterIn, PathItem,
    RequestBody, ResponseSpec, SchemaRef,
};

// Re-export utoipa's ToSchema derive macro as Schema
pub use utoipa::ToSchema as Schema;

use bytes::Bytes;
use http::{header, HeaderValue, Response, StatusCode};
use http_body_util::Full;

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Generate the OpenAPI JSON response
pub fn openapi_json(spec: &OpenApiSpec) -> Response<Full<Bytes>> {
    match serde_json::to_string_pretty(&spec.to_json()) {
        Ok(json) => respond(StatusCode::OK, "application/json", json),
        Err(_) => respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/plain; charset=utf-8",
            "Failed to serialize OpenAPI spec",
        ),
    }
}

/// Generate the Swagger UI HTML response
#[cfg(feature = "swagger-ui")]
pub fn swagger_ui_html(openapi_url: &str, title: &str) -> Response<Full<Bytes>> {
    let html = swagger::generate_swagger_html(openapi_url, title);
    respond(StatusCode::OK, "text/html; charset=utf-8", html)
}
