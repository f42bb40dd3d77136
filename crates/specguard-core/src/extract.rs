//! Extractors for specguard handlers
//!
//! Handler arguments are built from the request by implementing
//! [`FromRequestParts`] (head only) or [`FromRequest`] (may consume the body).
//!
//! On routes with a validation schema, [`Validated`] and [`ValidatedJson`]
//! give access to the request after validation, with conversions and
//! defaults applied.

use crate::error::{ApiError, Result};
use crate::request::Request;
use crate::response::{json_response, IntoResponse, Response};
use bytes::Bytes;
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use specguard_validate::{Location, RequestInputs};
use std::collections::HashMap;
use std::future::Future;
use std::ops::Deref;
use std::str::FromStr;

/// Trait for extracting data from request parts (headers, path, query)
pub trait FromRequestParts: Sized {
    /// Extract from request parts
    fn from_request_parts(req: &Request) -> Result<Self>;
}

/// Trait for extracting data from the full request (including body)
pub trait FromRequest: Sized {
    /// Extract from the full request
    fn from_request(req: &mut Request) -> impl Future<Output = Result<Self>> + Send;
}

// Blanket impl: FromRequestParts -> FromRequest
impl<T: FromRequestParts> FromRequest for T {
    async fn from_request(req: &mut Request) -> Result<Self> {
        T::from_request_parts(req)
    }
}

/// JSON body extractor and response
///
/// ```rust,ignore
/// async fn create_user(Json(body): Json<CreateUser>) -> Json<User> { ... }
/// ```
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: DeserializeOwned + Send> FromRequest for Json<T> {
    async fn from_request(req: &mut Request) -> Result<Self> {
        let body = req
            .take_body()
            .ok_or_else(|| ApiError::internal("Body already consumed"))?;

        let value: T = serde_json::from_slice(&body)?;
        Ok(Json(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        json_response(StatusCode::OK, &self.0)
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Query string extractor
#[derive(Debug, Clone)]
pub struct Query<T>(pub T);

impl<T: DeserializeOwned> FromRequestParts for Query<T> {
    fn from_request_parts(req: &Request) -> Result<Self> {
        let query = req.query_string().unwrap_or("");
        let value = serde_urlencoded::from_str(query)
            .map_err(|e| ApiError::bad_request(format!("Invalid query string: {}", e)))?;
        Ok(Query(value))
    }
}

impl<T> Deref for Query<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Single path parameter extractor
///
/// Only valid on routes with exactly one parameter; use [`PathParams`]
/// otherwise.
#[derive(Debug, Clone)]
pub struct Path<T>(pub T);

impl<T: FromStr> FromRequestParts for Path<T>
where
    T::Err: std::fmt::Display,
{
    fn from_request_parts(req: &Request) -> Result<Self> {
        let params = req.path_params();
        if params.len() > 1 {
            return Err(ApiError::internal(
                "Path<T> used on a route with several parameters",
            ));
        }

        let (_, value) = params
            .iter()
            .next()
            .ok_or_else(|| ApiError::internal("Missing path parameter"))?;
        let parsed = value
            .parse::<T>()
            .map_err(|e| ApiError::bad_request(format!("Invalid path parameter: {}", e)))?;
        Ok(Path(parsed))
    }
}

impl<T> Deref for Path<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// All path parameters by name
#[derive(Debug, Clone, Default)]
pub struct PathParams(pub HashMap<String, String>);

impl FromRequestParts for PathParams {
    fn from_request_parts(req: &Request) -> Result<Self> {
        Ok(PathParams(req.path_params().clone()))
    }
}

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// State extractor
///
/// ```rust,ignore
/// async fn handler(State(db): State<Db>) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone)]
pub struct State<T>(pub T);

impl<T: Clone + Send + Sync + 'static> FromRequestParts for State<T> {
    fn from_request_parts(req: &Request) -> Result<Self> {
        req.state().get::<T>().cloned().map(State).ok_or_else(|| {
            ApiError::internal(format!(
                "State of type `{}` not found. Did you forget to call .state()?",
                std::any::type_name::<T>()
            ))
        })
    }
}

impl<T> Deref for State<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Raw body bytes extractor
#[derive(Debug, Clone)]
pub struct Body(pub Bytes);

impl FromRequest for Body {
    async fn from_request(req: &mut Request) -> Result<Self> {
        let body = req
            .take_body()
            .ok_or_else(|| ApiError::internal("Body already consumed"))?;
        Ok(Body(body))
    }
}

impl Deref for Body {
    type Target = Bytes;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The request as validated.
///
/// Holds every location after a successful validation pass: converted
/// values, applied defaults and stripped keys included. Only available on
/// routes that have a validation schema.
#[derive(Debug, Clone)]
pub struct Validated(pub RequestInputs);

impl Validated {
    pub fn get(&self, location: Location) -> Option<&Value> {
        self.0.get(location)
    }

    pub fn body(&self) -> Option<&Value> {
        self.0.body.as_ref()
    }

    pub fn query(&self) -> Option<&Value> {
        self.0.query.as_ref()
    }

    pub fn params(&self) -> Option<&Value> {
        self.0.params.as_ref()
    }

    pub fn headers(&self) -> Option<&Value> {
        self.0.headers.as_ref()
    }

    pub fn cookies(&self) -> Option<&Value> {
        self.0.cookies.as_ref()
    }

    pub fn into_inner(self) -> RequestInputs {
        self.0
    }
}

impl FromRequestParts for Validated {
    fn from_request_parts(req: &Request) -> Result<Self> {
        req.extensions().get::<Validated>().cloned().ok_or_else(|| {
            ApiError::internal("No validated request. Did you forget to call .validate() on the route?")
        })
    }
}

impl Deref for Validated {
    type Target = RequestInputs;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The validated body deserialized into `T`.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T: DeserializeOwned> FromRequestParts for ValidatedJson<T> {
    fn from_request_parts(req: &Request) -> Result<Self> {
        let validated = Validated::from_request_parts(req)?;
        let body = validated.0.body.unwrap_or(Value::Null);
        let value = serde_json::from_value(body)?;
        Ok(ValidatedJson(value))
    }
}

impl<T> Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Optional extractor wrapper
///
/// Makes any extractor optional - returns None instead of error on failure.
impl<T: FromRequestParts> FromRequestParts for Option<T> {
    fn from_request_parts(req: &Request) -> Result<Self> {
        Ok(T::from_request_parts(req).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Page {
        page: u32,
        #[serde(default)]
        sort: Option<String>,
    }

    fn request(uri: &str, body: &'static str) -> Request {
        Request::from_http(
            http::Request::builder()
                .uri(uri)
                .body(Bytes::from_static(body.as_bytes()))
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn json_consumes_body_once() {
        let mut req = request("/", r#"{"page": 3}"#);
        let Json(page) = Json::<Page>::from_request(&mut req).await.unwrap();
        assert_eq!(page, Page { page: 3, sort: None });

        let err = Body::from_request(&mut req).await.unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn query_deserializes() {
        let req = request("/items?page=2&sort=name", "");
        let Query(page) = Query::<Page>::from_request_parts(&req).unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.sort.as_deref(), Some("name"));

        let req = request("/items?page=two", "");
        let err = Query::<Page>::from_request_parts(&req).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn single_path_param() {
        let mut req = request("/users/42", "");
        req.set_path_params(HashMap::from([("id".to_string(), "42".to_string())]));
        let Path(id) = Path::<u64>::from_request_parts(&req).unwrap();
        assert_eq!(id, 42);
        assert_eq!(PathParams::from_request_parts(&req).unwrap().get("id"), Some("42"));
    }

    #[test]
    fn validated_requires_a_validation_pass() {
        let mut req = request("/", "");
        assert!(Validated::from_request_parts(&req).is_err());

        req.extensions_mut().insert(Validated(
            RequestInputs::new().with(Location::Body, json!({"page": 5})),
        ));
        let ValidatedJson(page) = ValidatedJson::<Page>::from_request_parts(&req).unwrap();
        assert_eq!(page.page, 5);
    }
}
