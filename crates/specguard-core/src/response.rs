//! Response types for specguard
//!
//! Handlers return anything implementing [`IntoResponse`]:
//!
//! ```rust,ignore
//! async fn created() -> Created<User> { ... }
//! async fn removed() -> NoContent { NoContent }
//! async fn teapot() -> (StatusCode, &'static str) { (StatusCode::IM_A_TEAPOT, "short and stout") }
//! async fn lookup() -> Result<Json<User>> { ... }
//! ```
//!
//! A [`ValidationFailure`] is itself a response: its configured status and the
//! JSON failure document.

use crate::error::{ApiError, ErrorResponse};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use specguard_validate::ValidationFailure;

/// HTTP Response type
pub type Response = http::Response<Full<Bytes>>;

/// Trait for types that can be converted into an HTTP response
pub trait IntoResponse {
    /// Convert self into a Response
    fn into_response(self) -> Response;
}

pub(crate) fn build(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response {
    let mut response = http::Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Serialize `value` as a JSON response, falling back to a 500 error.
pub(crate) fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => build(status, "application/json", body),
        Err(err) => ApiError::internal("Failed to serialize response")
            .with_internal(err.to_string())
            .into_response(),
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::OK;
        response
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        build(StatusCode::OK, "text/plain; charset=utf-8", self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        build(StatusCode::OK, "text/plain; charset=utf-8", self)
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        let mut response = ().into_response();
        *response.status_mut() = self;
        response
    }
}

impl<R: IntoResponse> IntoResponse for (StatusCode, R) {
    fn into_response(self) -> Response {
        let mut response = self.1.into_response();
        *response.status_mut() = self.0;
        response
    }
}

impl<R: IntoResponse> IntoResponse for (StatusCode, HeaderMap, R) {
    fn into_response(self) -> Response {
        let mut response = self.2.into_response();
        *response.status_mut() = self.0;
        response.headers_mut().extend(self.1);
        response
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(v) => v.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = ErrorResponse::from(self);
        json_response(status, &body)
    }
}

impl IntoResponse for ValidationFailure {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_REQUEST);
        json_response(status, &self.to_json())
    }
}

/// 201 Created response wrapper
#[derive(Debug, Clone)]
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        json_response(StatusCode::CREATED, &self.0)
    }
}

/// 204 No Content response
#[derive(Debug, Clone, Copy)]
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

/// HTML response wrapper
#[derive(Debug, Clone)]
pub struct Html<T>(pub T);

impl<T: Into<String>> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        build(StatusCode::OK, "text/html; charset=utf-8", self.0.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use specguard_validate::{FieldError, Location, Options};

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_failure_uses_configured_status() {
        let options = Options {
            status: 422,
            status_text: "Unprocessable Entity".into(),
            ..Options::default()
        };
        let mut error = FieldError::new("name", Location::Body, "\"name\" is required", "any.required");
        error.push("\"name\" is too short", "string.min");
        let failure = ValidationFailure::new(vec![error], &options);

        let response = failure.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let json = body_json(response).await;
        assert_eq!(json["status"], 422);
        assert_eq!(json["statusText"], "Unprocessable Entity");
        assert_eq!(json["errors"][0]["messages"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn out_of_range_failure_status_falls_back() {
        let options = Options {
            status: 42,
            ..Options::default()
        };
        let response = ValidationFailure::new(Vec::new(), &options).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn api_error_body() {
        let response = ApiError::not_found("no such user").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"]["type"], "not_found");
        assert_eq!(json["error"]["message"], "no such user");
    }

    #[test]
    fn tuple_overrides_status() {
        let response = (StatusCode::ACCEPTED, "queued").into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(NoContent.into_response().status(), StatusCode::NO_CONTENT);
    }
}
