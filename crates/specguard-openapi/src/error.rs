use thiserror::Error;

/// Errors raised while assembling the OpenAPI document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocError {
    /// Every documented route needs at least one response.
    #[error("route {method} {path} must have at least one response")]
    NoResponses { method: String, path: String },

    /// The verb has no slot in an OpenAPI path item.
    #[error("cannot document {method} {path}: unsupported method")]
    UnsupportedMethod { method: String, path: String },
}
