//! Standard error schemas for OpenAPI documentation
//!
//! These schemas match the response bodies produced by the validation layer
//! and by host errors.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structured request validation failure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailureSchema {
    /// Failure status code
    pub status: u16,
    /// Failure status text
    pub status_text: String,
    /// One entry per failing field and location
    pub errors: Vec<FieldErrorSchema>,
}

/// Violations of one field in one request location
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldErrorSchema {
    /// Field path (nested paths look like "address.city")
    pub field: String,
    /// One of headers, body, query, params, cookies
    pub location: String,
    /// Messages in the order they were reported
    pub messages: Vec<String>,
    /// Violation kinds (e.g. "any.required"), parallel to `messages`
    pub types: Vec<String>,
}

/// Host error response body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorSchema {
    pub error: ErrorBodySchema,
}

/// Error body details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBodySchema {
    /// Error type identifier (e.g. "not_found")
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl ValidationFailureSchema {
    /// Sample failure for documentation
    pub fn example() -> Self {
        Self {
            status: 400,
            status_text: "Bad Request".to_string(),
            errors: vec![FieldErrorSchema {
                field: "name".to_string(),
                location: "body".to_string(),
                messages: vec!["\"name\" is required".to_string()],
                types: vec!["any.required".to_string()],
            }],
        }
    }
}

/// Component name of [`ValidationFailureSchema`].
pub const VALIDATION_FAILURE: &str = "ValidationFailureSchema";
