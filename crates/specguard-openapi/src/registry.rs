//! Collection of route descriptions into one OpenAPI document.

use crate::error::DocError;
use crate::operation::OperationDoc;
use crate::spec::{OpenApiSpec, Operation, PathItem};
use std::collections::HashSet;

/// Accumulates documented routes.
///
/// A route (verb + path) is described at most once; later descriptions of the
/// same route are ignored with a warning.
#[derive(Debug, Clone)]
pub struct DocRegistry {
    spec: OpenApiSpec,
    described: HashSet<(String, String)>,
}

impl DocRegistry {
    pub fn new(spec: OpenApiSpec) -> Self {
        Self {
            spec,
            described: HashSet::new(),
        }
    }

    /// Add a route's operation and its component schemas.
    ///
    /// Returns `Ok(false)` when the route was already described. Router path
    /// parameters (`/users/:id`, `/files/*path`) are written in OpenAPI form
    /// (`/users/{id}`).
    pub fn describe(&mut self, method: &str, path: &str, doc: OperationDoc) -> Result<bool, DocError> {
        let method = method.to_ascii_lowercase();
        let path = to_openapi_path(path);

        if self.described.contains(&(method.clone(), path.clone())) {
            tracing::warn!(%method, %path, "Route already described");
            return Ok(false);
        }

        ensure_at_least_one_response(&doc.operation, &method, &path)?;

        let mut item = self.spec.paths.get(&path).cloned().unwrap_or_default();
        let slot = item.operation_mut(&method).ok_or_else(|| DocError::UnsupportedMethod {
            method: method.clone(),
            path: path.clone(),
        })?;
        *slot = Some(doc.operation);
        self.spec.paths.insert(path.clone(), item);

        for (name, schema) in doc.schemas {
            self.spec.schemas.insert(name, schema);
        }

        tracing::debug!(%method, %path, "documented route");
        self.described.insert((method, path));
        Ok(true)
    }

    pub fn is_described(&self, method: &str, path: &str) -> bool {
        self.described
            .contains(&(method.to_ascii_lowercase(), to_openapi_path(path)))
    }

    /// Mutable access to a documented operation.
    pub fn operation_mut(&mut self, method: &str, path: &str) -> Option<&mut Operation> {
        self.spec
            .paths
            .get_mut(&to_openapi_path(path))
            .and_then(|item: &mut PathItem| item.operation_mut(method))
            .and_then(Option::as_mut)
    }

    pub fn spec(&self) -> &OpenApiSpec {
        &self.spec
    }

    pub fn spec_mut(&mut self) -> &mut OpenApiSpec {
        &mut self.spec
    }

    pub fn into_spec(self) -> OpenApiSpec {
        self.spec
    }
}

/// Fail when an operation documents no response.
pub fn ensure_at_least_one_response(operation: &Operation, method: &str, path: &str) -> Result<(), DocError> {
    if operation.responses.is_empty() {
        return Err(DocError::NoResponses {
            method: method.to_string(),
            path: path.to_string(),
        });
    }
    Ok(())
}

/// Rewrite `:name` and `*name` segments as `{name}`.
pub fn to_openapi_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':').or_else(|| segment.strip_prefix('*')) {
            Some(name) if !name.is_empty() => format!("{{{name}}}"),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
