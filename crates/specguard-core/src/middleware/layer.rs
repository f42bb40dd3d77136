//! Middleware chain
//!
//! A [`LayerStack`] wraps a final handler in any number of
//! [`MiddlewareLayer`]s. The same machinery runs app-wide layers and the
//! per-route validation layer.

use crate::request::Request;
use crate::response::Response;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by middleware and handlers
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// A boxed next function for middleware chains
pub type BoxedNext = Arc<dyn Fn(Request) -> BoxFuture + Send + Sync>;

/// Trait for middleware applied with `.layer()`
pub trait MiddlewareLayer: Send + Sync + 'static {
    /// Apply this middleware to a request, calling `next` to continue the chain
    fn call(&self, req: Request, next: BoxedNext) -> BoxFuture;

    /// Clone this middleware into a boxed trait object
    fn clone_box(&self) -> Box<dyn MiddlewareLayer>;
}

impl Clone for Box<dyn MiddlewareLayer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A stack of middleware layers
#[derive(Clone, Default)]
pub struct LayerStack {
    layers: Vec<Box<dyn MiddlewareLayer>>,
}

impl LayerStack {
    /// Create a new empty layer stack
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Add a middleware layer to the stack
    ///
    /// Layers are executed in the order they are added (outermost first).
    pub fn push(&mut self, layer: Box<dyn MiddlewareLayer>) {
        self.layers.push(layer);
    }

    /// Add a middleware layer to the beginning of the stack
    pub fn prepend(&mut self, layer: Box<dyn MiddlewareLayer>) {
        self.layers.insert(0, layer);
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Wrap `handler` in every layer, returning the outermost entry point.
    pub fn wrap(&self, handler: BoxedNext) -> BoxedNext {
        // Build the chain from inside out
        let mut next = handler;

        for layer in self.layers.iter().rev() {
            let layer: Arc<dyn MiddlewareLayer> = Arc::from(layer.clone_box());
            let current_next = next;
            next = Arc::new(move |req: Request| layer.call(req, current_next.clone()));
        }

        next
    }

    /// Execute the middleware stack with a final handler
    pub fn execute(&self, req: Request, handler: BoxedNext) -> BoxFuture {
        if self.layers.is_empty() {
            return handler(req);
        }
        self.wrap(handler)(req)
    }
}

impl std::fmt::Debug for LayerStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerStack").field("layers", &self.layers.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::IntoResponse;
    use bytes::Bytes;
    use http::{HeaderValue, StatusCode};
    use std::sync::Mutex;

    #[derive(Clone)]
    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    impl MiddlewareLayer for Recorder {
        fn call(&self, req: Request, next: BoxedNext) -> BoxFuture {
            let name = self.name;
            let seen = self.seen.clone();
            Box::pin(async move {
                seen.lock().unwrap().push(name);
                let mut response = next(req).await;
                response
                    .headers_mut()
                    .append("x-layer", HeaderValue::from_static(name));
                response
            })
        }

        fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
            Box::new(self.clone())
        }
    }

    struct ShortCircuit;

    impl MiddlewareLayer for ShortCircuit {
        fn call(&self, _req: Request, _next: BoxedNext) -> BoxFuture {
            Box::pin(async { StatusCode::FORBIDDEN.into_response() })
        }

        fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
            Box::new(ShortCircuit)
        }
    }

    fn request() -> Request {
        Request::from_http(http::Request::new(Bytes::new()))
    }

    fn ok_handler() -> BoxedNext {
        Arc::new(|_req: Request| Box::pin(async { "ok".into_response() }) as BoxFuture)
    }

    #[tokio::test]
    async fn layers_run_outermost_first() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut stack = LayerStack::new();
        stack.push(Box::new(Recorder { name: "outer", seen: seen.clone() }));
        stack.push(Box::new(Recorder { name: "inner", seen: seen.clone() }));

        let response = stack.execute(request(), ok_handler()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*seen.lock().unwrap(), vec!["outer", "inner"]);
        let layers: Vec<_> = response.headers().get_all("x-layer").iter().collect();
        assert_eq!(layers, vec!["inner", "outer"]);
    }

    #[tokio::test]
    async fn a_layer_can_answer_without_calling_next() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut stack = LayerStack::new();
        stack.push(Box::new(ShortCircuit));
        stack.push(Box::new(Recorder { name: "never", seen: seen.clone() }));

        let response = stack.execute(request(), ok_handler()).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn prepend_goes_first() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut stack = LayerStack::new();
        stack.push(Box::new(Recorder { name: "b", seen: seen.clone() }));
        stack.prepend(Box::new(ShortCircuit));
        assert_eq!(stack.len(), 2);
    }
}
