//! # specguard Core
//!
//! Host integration for specguard: a hyper server, a matchit router whose
//! routes carry validation schemas and documentation models, a middleware
//! stack, and the OpenAPI/Swagger UI endpoints.
//!
//! This crate is not meant to be used directly. Use `specguard-rs` instead.

mod app;
mod docs;
mod error;
mod extract;
mod handler;
mod inputs;
pub mod middleware;
mod request;
mod response;
mod router;
mod server;
mod test_client;

// Public API
pub use app::SpecGuard;
pub use error::{get_environment, ApiError, BuildError, Environment, Result};
pub use extract::{
    Body, FromRequest, FromRequestParts, Json, Path, PathParams, Query, State, Validated,
    ValidatedJson,
};
pub use handler::{BoxedHandler, Handler};
pub use middleware::{LayerStack, MiddlewareLayer, ValidationLayer};
pub use request::Request;
pub use response::{Created, Html, IntoResponse, NoContent, Response};
pub use router::{
    delete, get, patch, post, put, MethodRouter, RouteConflictError, RouteGroup, RouteInfo,
    Router,
};
pub use server::DEFAULT_BODY_LIMIT;
pub use test_client::{TestClient, TestRequest, TestResponse};
