//! Request validation layer

use super::layer::{BoxFuture, BoxedNext, MiddlewareLayer};
use crate::extract::{FromRequestParts, Validated};
use crate::request::Request;
use crate::response::IntoResponse;
use specguard_validate::{global_options, OptionsOverride, RequestInputs, RequestValidator};
use std::sync::Arc;

/// Validates every request against a route's schema before the handler runs.
///
/// Reads the five request locations, validates them in order and, on
/// success, stores the converted request as a [`Validated`] extension for
/// the handler. On failure the handler is skipped and the
/// [`ValidationFailure`](specguard_validate::ValidationFailure) becomes the
/// response.
///
/// Process-wide options are read once per request, when the request arrives.
#[derive(Clone)]
pub struct ValidationLayer {
    validator: Arc<RequestValidator>,
    process: Option<OptionsOverride>,
}

impl ValidationLayer {
    pub fn new(validator: Arc<RequestValidator>) -> Self {
        Self {
            validator,
            process: None,
        }
    }

    /// Use a fixed options snapshot instead of the process-wide options.
    pub fn with_options(mut self, process: OptionsOverride) -> Self {
        self.process = Some(process);
        self
    }

    pub fn validator(&self) -> &RequestValidator {
        &self.validator
    }
}

impl MiddlewareLayer for ValidationLayer {
    fn call(&self, mut req: Request, next: BoxedNext) -> BoxFuture {
        let validator = self.validator.clone();
        let process = self.process.clone().unwrap_or_else(global_options);

        Box::pin(async move {
            let mut inputs = match RequestInputs::from_request_parts(&req) {
                Ok(inputs) => inputs,
                Err(err) => return err.into_response(),
            };

            match validator.validate_with(&mut inputs, &process).await {
                Ok(()) => {
                    req.extensions_mut().insert(Validated(inputs));
                    next(req).await
                }
                Err(failure) => {
                    tracing::info!(
                        method = %req.method(),
                        path = %req.uri().path(),
                        status = failure.status,
                        fields = failure.errors.len(),
                        "request rejected by validation"
                    );
                    failure.into_response()
                }
            }
        })
    }

    fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::LayerStack;
    use crate::response::{json_response, Response};
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use specguard_validate::schema::{ObjectSchema, Schema};
    use specguard_validate::RequestSchema;

    fn layer() -> ValidationLayer {
        let schema = RequestSchema::new()
            .body(ObjectSchema::new().key("age", Schema::integer().required().min(0.0)))
            .query(ObjectSchema::new().key("verbose", Schema::boolean().default_value(false)));
        ValidationLayer::new(Arc::new(RequestValidator::new(schema).unwrap()))
            .with_options(OptionsOverride::new())
    }

    fn echo_validated() -> BoxedNext {
        Arc::new(|req: Request| {
            Box::pin(async move {
                match Validated::from_request_parts(&req) {
                    Ok(validated) => json_response(StatusCode::OK, &validated.0),
                    Err(err) => err.into_response(),
                }
            }) as BoxFuture
        })
    }

    fn post(body: &'static str) -> Request {
        Request::from_http(
            http::Request::builder()
                .method("POST")
                .uri("/people")
                .header("content-type", "application/json")
                .body(Bytes::from_static(body.as_bytes()))
                .unwrap(),
        )
    }

    async fn json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn run(req: Request, layer: ValidationLayer) -> BoxFuture {
        let mut stack = LayerStack::new();
        stack.push(Box::new(layer));
        stack.execute(req, echo_validated())
    }

    #[tokio::test]
    async fn handler_sees_converted_values() {
        let response = run(post(r#"{"age": "41"}"#), layer()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["body"], json!({"age": 41}));
        assert_eq!(body["query"], json!({"verbose": false}));
    }

    #[tokio::test]
    async fn failure_skips_handler() {
        let response = run(post(r#"{"age": -1}"#), layer()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json(response).await;
        assert_eq!(body["statusText"], "Bad Request");
        assert_eq!(body["errors"][0]["field"], "age");
        assert_eq!(body["errors"][0]["location"], "body");
    }

    #[tokio::test]
    async fn options_snapshot_controls_status() {
        let layer = layer().with_options(OptionsOverride::new().status(422).flatten(true));
        let response = run(post("{}"), layer).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json(response).await.is_array());
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_before_validation() {
        let response = run(post("{"), layer()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["error"]["type"], "bad_request");
    }
}
