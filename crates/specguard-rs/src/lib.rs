//! # specguard
//!
//! Declarative request validation and OpenAPI documentation for HTTP routes.
//!
//! Each route declares one schema per request location (headers, body,
//! query, params, cookies). Requests are validated and converted before the
//! handler runs; invalid ones get a structured failure response listing every
//! problem in every location. The same schemas produce the OpenAPI document
//! served next to Swagger UI.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use specguard_rs::prelude::*;
//!
//! #[derive(Deserialize, Serialize)]
//! struct NewUser {
//!     name: String,
//!     age: u32,
//! }
//!
//! async fn create_user(ValidatedJson(user): ValidatedJson<NewUser>) -> Created<NewUser> {
//!     Created(user)
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let schema = RequestSchema::new().body(
//!         ObjectSchema::new()
//!             .key("name", Schema::string().required().min(3.0))
//!             .key("age", Schema::integer().required().min(0.0)),
//!     );
//!
//!     SpecGuard::new()
//!         .route("/users", post(create_user).validate(schema)?)
//!         .docs("/docs")
//!         .run("127.0.0.1:8080")
//!         .await
//! }
//! ```
//!
//! ## Configuration
//!
//! Validation options resolve per request, most specific first: the route's
//! own options, then the process-wide options ([`set_options`](prelude::set_options),
//! or `SPECGUARD_*` environment variables through
//! `SpecGuard::validation_options_from_env`), then the defaults.
//!
//! Logging goes through `tracing`; `SpecGuard::new` installs a subscriber
//! honoring `RUST_LOG`.

// Re-export core functionality
pub use specguard_core::*;

/// Validation engine
pub mod validate {
    pub use specguard_validate::*;
}

/// OpenAPI document generation
pub mod openapi {
    pub use specguard_openapi::*;
}

// Re-export for implementing external rules
pub use async_trait::async_trait;

/// Prelude module - import everything you need with `use specguard_rs::prelude::*`
pub mod prelude {
    // Core types
    pub use specguard_core::{
        delete,
        get,
        patch,
        post,
        put,
        // Error handling
        ApiError,
        Body,
        BuildError,
        Created,
        Html,
        // Response types
        IntoResponse,
        // Extractors
        Json,
        MethodRouter,
        // Middleware
        MiddlewareLayer,
        NoContent,
        Path,
        PathParams,
        Query,
        Request,
        Response,
        Result,
        RouteGroup,
        Router,
        // App builder
        SpecGuard,
        State,
        Validated,
        ValidatedJson,
    };

    // Validation
    pub use specguard_validate::schema::{ExternalRule, ObjectSchema, Presence, Schema};
    pub use specguard_validate::{
        set_options, validation, ConfigurationError, FieldError, Location, OptionsOverride,
        RequestSchema, RequestValidator, ValidationFailure,
    };

    // Documentation
    pub use specguard_openapi::{OpenApiConfig, RequestModel, ResponseModel, ResponseModels};

    // Re-export commonly used external types
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use tracing::{debug, error, info, trace, warn};
}
