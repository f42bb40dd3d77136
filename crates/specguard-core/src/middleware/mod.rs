//! Middleware for specguard
//!
//! App-wide layers are added with `SpecGuard::layer`; route validation is
//! a [`ValidationLayer`] installed by `MethodRouter::validate`.

mod layer;
mod validation;

pub use layer::{BoxFuture, BoxedNext, LayerStack, MiddlewareLayer};
pub use validation::ValidationLayer;
