//! Parsing a request into its five validation locations.

use crate::error::{ApiError, Result};
use crate::extract::FromRequestParts;
use crate::request::Request;
use cookie::Cookie;
use http::header::{CONTENT_TYPE, COOKIE};
use http::HeaderMap;
use serde_json::{Map, Value};
use specguard_validate::{Location, RequestInputs};

/// Header names lowercased; repeated headers joined with `", "`.
pub(crate) fn headers_value(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        match map.get_mut(name.as_str()) {
            Some(Value::String(existing)) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            _ => {
                map.insert(name.as_str().to_string(), Value::String(value.to_string()));
            }
        }
    }
    Value::Object(map)
}

/// Decode `a=1&b=2&a=3` into `{"a": ["1", "3"], "b": "2"}`.
pub(crate) fn urlencoded_value(input: &str) -> Result<Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(input)
        .map_err(|e| ApiError::bad_request(format!("Invalid query string: {}", e)))?;

    let mut map = Map::new();
    for (key, value) in pairs {
        match map.get_mut(&key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                map.insert(key, Value::String(value));
            }
        }
    }
    Ok(Value::Object(map))
}

fn body_value(req: &Request) -> Result<Value> {
    let body = match req.body() {
        Some(body) if !body.is_empty() => body,
        _ => return Ok(Value::Object(Map::new())),
    };

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("application/json") || content_type.contains("+json") {
        return Ok(serde_json::from_slice(body)?);
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let text = std::str::from_utf8(body)
            .map_err(|_| ApiError::bad_request("Form body is not valid UTF-8"))?;
        return urlencoded_value(text).map_err(|_| ApiError::bad_request("Invalid form body"));
    }

    Ok(Value::Object(Map::new()))
}

fn cookies_value(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for header in headers.get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for cookie in Cookie::split_parse(header).flatten() {
            map.insert(cookie.name().to_string(), Value::String(cookie.value().to_string()));
        }
    }
    Value::Object(map)
}

fn params_value(req: &Request) -> Value {
    Value::Object(
        req.path_params()
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// Read all five locations of a request.
///
/// Every location is present, possibly as an empty object. The body is parsed
/// according to `Content-Type` (JSON or URL-encoded form); other bodies are
/// seen as an empty object. A malformed JSON body is a `400`.
impl FromRequestParts for RequestInputs {
    fn from_request_parts(req: &Request) -> Result<Self> {
        let query = match req.query_string() {
            Some(q) => urlencoded_value(q)?,
            None => Value::Object(Map::new()),
        };

        Ok(RequestInputs::new()
            .with(Location::Headers, headers_value(req.headers()))
            .with(Location::Body, body_value(req)?)
            .with(Location::Query, query)
            .with(Location::Params, params_value(req))
            .with(Location::Cookies, cookies_value(req.headers())))
    }
}
