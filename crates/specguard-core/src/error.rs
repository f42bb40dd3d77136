//! Error types for specguard

use http::StatusCode;
use serde::Serialize;
use specguard_openapi::DocError;
use specguard_validate::ConfigurationError;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Result type alias for specguard operations
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Deployment profile, read once from `SPECGUARD_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse a profile name. Anything but `production`/`prod` is development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

/// The current deployment profile.
pub fn get_environment() -> Environment {
    *ENVIRONMENT.get_or_init(|| {
        std::env::var("SPECGUARD_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Development)
    })
}

/// Standard API error type
///
/// Serialized as `{"error": {"type": ..., "message": ...}}`. Internal details
/// are logged, and only shown in responses outside production.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code
    pub status: StatusCode,
    /// Error type identifier
    pub error_type: String,
    /// Human-readable error message
    pub message: String,
    /// Internal details (hidden in production)
    pub(crate) internal: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error_type: error_type.into(),
            message: message.into(),
            internal: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    /// Add internal details (for logging, hidden from response in prod)
    pub fn with_internal(mut self, details: impl Into<String>) -> Self {
        self.internal = Some(details.into());
        self
    }

    pub fn internal_details(&self) -> Option<&str> {
        self.internal.as_deref()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.message)
    }
}

impl std::error::Error for ApiError {}

/// JSON representation of an API error response
#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub(crate) fn from_error(err: ApiError, environment: Environment) -> Self {
        if let Some(internal) = &err.internal {
            tracing::error!(
                error_type = %err.error_type,
                status = err.status.as_u16(),
                details = %internal,
                "request error"
            );
        }

        if environment.is_production() {
            let message = if err.status.is_server_error() {
                "An internal error occurred".to_string()
            } else {
                err.message
            };
            return Self {
                error: ErrorBody {
                    error_type: err.error_type,
                    message,
                    details: None,
                },
            };
        }

        Self {
            error: ErrorBody {
                error_type: err.error_type,
                message: err.message,
                details: err.internal,
            },
        }
    }
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        Self::from_error(err, get_environment())
    }
}

// Conversion from common error types
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::bad_request(format!("Invalid JSON: {}", err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal("I/O error").with_internal(err.to_string())
    }
}

impl From<hyper::Error> for ApiError {
    fn from(err: hyper::Error) -> Self {
        ApiError::internal("HTTP error").with_internal(err.to_string())
    }
}

impl From<ConfigurationError> for ApiError {
    fn from(err: ConfigurationError) -> Self {
        ApiError::internal("Invalid validation configuration").with_internal(err.to_string())
    }
}

impl From<DocError> for ApiError {
    fn from(err: DocError) -> Self {
        ApiError::internal("Invalid API documentation").with_internal(err.to_string())
    }
}

/// Error raised while turning a [`SpecGuard`](crate::SpecGuard) into a
/// running service.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A route's validator is misconfigured.
    #[error("invalid validation for {method} {path}: {source}")]
    Validation {
        method: String,
        path: String,
        #[source]
        source: ConfigurationError,
    },

    /// The API documentation could not be generated.
    #[error(transparent)]
    Docs(#[from] DocError),
}
