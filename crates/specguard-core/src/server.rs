//! HTTP server and request dispatch

use crate::error::ApiError;
use crate::middleware::{BoxedNext, LayerStack};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::{RouteMatch, Router};
use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Default maximum request body size (1 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// A finished application: routes plus app-wide layers.
#[derive(Clone)]
pub(crate) struct Service {
    router: Arc<Router>,
    layers: Arc<LayerStack>,
    body_limit: Option<usize>,
}

impl Service {
    pub fn new(router: Router, layers: LayerStack, body_limit: Option<usize>) -> Self {
        Self {
            router: Arc::new(router),
            layers: Arc::new(layers),
            body_limit,
        }
    }

    pub fn body_limit(&self) -> Option<usize> {
        self.body_limit
    }

    /// Route a buffered request through the layers to its handler.
    pub async fn call(&self, req: http::Request<Bytes>) -> Response {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let start = std::time::Instant::now();

        let (parts, body) = req.into_parts();

        let (handler, params) = match self.router.match_route(&path, &method) {
            RouteMatch::Found { handler, params } => (handler.clone(), params),
            RouteMatch::NotFound => {
                let response = ApiError::not_found(format!("No route found for {} {}", method, path))
                    .into_response();
                log_request(&method, &path, response.status(), start);
                return response;
            }
            RouteMatch::MethodNotAllowed { allowed } => {
                let allowed_str: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
                let mut response = ApiError::method_not_allowed(format!(
                    "Method {} not allowed for {}",
                    method, path
                ))
                .into_response();

                if let Ok(value) = HeaderValue::from_str(&allowed_str.join(", ")) {
                    response.headers_mut().insert(header::ALLOW, value);
                }
                log_request(&method, &path, response.status(), start);
                return response;
            }
        };

        let request = Request::new(parts, body, self.router.state_ref(), params);

        let final_handler: BoxedNext = handler;
        let response = self.layers.execute(request, final_handler).await;

        log_request(&method, &path, response.status(), start);
        response
    }
}

/// Internal server struct
pub(crate) struct Server {
    service: Service,
}

impl Server {
    pub fn new(service: Service) -> Self {
        Self { service }
    }

    /// Run the server
    pub async fn run(self, addr: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = addr.parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!("specguard server running on http://{}", addr);

        loop {
            let (stream, _remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let service = self.service.clone();

            tokio::spawn(async move {
                let svc = service_fn(move |req: hyper::Request<Incoming>| {
                    let service = service.clone();
                    async move { Ok::<_, Infallible>(handle_request(service, req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                    error!("Connection error: {}", err);
                }
            });
        }
    }
}

/// Buffer the body (within the configured limit) and dispatch.
async fn handle_request(service: Service, req: hyper::Request<Incoming>) -> Response {
    let (parts, body) = req.into_parts();

    let collected = match service.body_limit() {
        Some(limit) => Limited::new(body, limit)
            .collect()
            .await
            .map(|c| c.to_bytes())
            .map_err(|err| {
                if err.is::<http_body_util::LengthLimitError>() {
                    ApiError::payload_too_large(format!(
                        "Request body exceeds the limit of {} bytes",
                        limit
                    ))
                } else {
                    ApiError::bad_request("Failed to read request body").with_internal(err.to_string())
                }
            }),
        None => body
            .collect()
            .await
            .map(|c| c.to_bytes())
            .map_err(ApiError::from),
    };

    match collected {
        Ok(bytes) => service.call(http::Request::from_parts(parts, bytes)).await,
        Err(err) => {
            warn!(
                method = %parts.method,
                path = %parts.uri.path(),
                status = err.status.as_u16(),
                "Rejected request body"
            );
            err.into_response()
        }
    }
}

/// Log request completion
fn log_request(method: &http::Method, path: &str, status: StatusCode, start: std::time::Instant) {
    let elapsed = start.elapsed();

    if status.is_success() {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request completed"
        );
    } else {
        error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request failed"
        );
    }
}
