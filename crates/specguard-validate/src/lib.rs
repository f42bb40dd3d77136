//! # specguard validation
//!
//! Declarative request validation for HTTP handlers. A route declares one
//! object schema per request location (headers, body, query, params,
//! cookies); the validator evaluates each location, merges every violation
//! into per-field records, and either lets the request continue with its
//! values converted or stops it with a single [`ValidationFailure`].
//!
//! ## Example
//!
//! ```rust
//! use specguard_validate::prelude::*;
//! use serde_json::json;
//!
//! # tokio_test_block(async {
//! let validator = validation(Some(
//!     RequestSchema::new()
//!         .body(ObjectSchema::new().key("name", Schema::string().required()))
//!         .query(ObjectSchema::new().key("page", Schema::integer().default_value(1))),
//! ))
//! .unwrap();
//!
//! let mut inputs = RequestInputs::new()
//!     .with(Location::Body, json!({"name": "Ada"}))
//!     .with(Location::Query, json!({}));
//! validator.validate_with(&mut inputs, &OptionsOverride::new()).await.unwrap();
//! assert_eq!(inputs.query, Some(json!({"page": 1})));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```
//!
//! ## Options
//!
//! Failure status, unknown-key handling and the evaluation context are
//! resolved per call from the route's overrides, the process-wide overrides
//! ([`set_options`]) and the built-in defaults, in that order.
//!
//! ## Error format
//!
//! ```json
//! {
//!   "status": 400,
//!   "statusText": "Bad Request",
//!   "errors": [
//!     {"field": "name", "location": "body", "messages": ["\"name\" is required"], "types": ["any.required"]}
//!   ]
//! }
//! ```

mod aggregate;
mod error;
mod location;
mod options;
pub mod schema;
mod validate;

pub use aggregate::aggregate;
pub use error::{ConfigurationError, FieldError, ValidationFailure, Violation};
pub use location::Location;
pub use options::{global_options, resolve, set_options, Options, OptionsOverride, OptionsStore};
pub use validate::{
    validate_location, validation, RequestInputs, RequestLocations, RequestSchema,
    RequestValidator,
};

/// Prelude module for validation
pub mod prelude {
    pub use crate::error::{ConfigurationError, FieldError, ValidationFailure};
    pub use crate::location::Location;
    pub use crate::options::{set_options, OptionsOverride};
    pub use crate::schema::{ExternalRule, ObjectSchema, Presence, Schema};
    pub use crate::validate::{
        validation, RequestInputs, RequestLocations, RequestSchema, RequestValidator,
    };
}
