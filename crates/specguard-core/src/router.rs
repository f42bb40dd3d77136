//! Router implementation using radix tree (matchit)
//!
//! Paths accept both `{param}` and `:param` segments.
//!
//! ```rust,ignore
//! use specguard_core::{get, post, Router};
//!
//! let router = Router::new()
//!     .route("/users", get(list_users).post(create_user).validate(create_schema)?)
//!     .route("/users/{id}", get(get_user));
//! ```
//!
//! Validation and documentation settings on a [`MethodRouter`] apply to the
//! method added most recently: in `get(a).post(b).validate(s)` only `POST`
//! is validated.

use crate::handler::{into_boxed_handler, BoxedHandler, Handler};
use crate::middleware::{LayerStack, ValidationLayer};
use http::{Extensions, Method};
use matchit::Router as MatchitRouter;
use specguard_openapi::{RequestModel, ResponseModels};
use specguard_validate::schema::{ExternalRule, ExternalRules};
use specguard_validate::{ConfigurationError, RequestSchema, RequestValidator};
use std::collections::HashMap;
use std::sync::Arc;

/// Documentation settings for one route method.
#[derive(Debug, Clone, Default)]
pub(crate) struct RouteDocs {
    pub request: Option<RequestModel>,
    pub responses: Option<ResponseModels>,
    pub excluded: bool,
}

/// One method of one route
#[derive(Clone)]
pub(crate) struct MethodEntry {
    handler: BoxedHandler,
    dispatch: BoxedHandler,
    validator: Option<Arc<RequestValidator>>,
    externals: ExternalRules,
    docs: RouteDocs,
}

impl MethodEntry {
    fn new(handler: BoxedHandler) -> Self {
        Self {
            dispatch: handler.clone(),
            handler,
            validator: None,
            externals: ExternalRules::new(),
            docs: RouteDocs::default(),
        }
    }

    fn set_validator(&mut self, validator: RequestValidator) {
        let validator = Arc::new(validator.with_rules(&self.externals));
        let mut stack = LayerStack::new();
        stack.push(Box::new(ValidationLayer::new(validator.clone())));
        self.dispatch = stack.wrap(self.handler.clone());
        self.validator = Some(validator);
    }

    pub(crate) fn validator(&self) -> Option<&RequestValidator> {
        self.validator.as_deref()
    }

    pub(crate) fn docs(&self) -> &RouteDocs {
        &self.docs
    }
}

/// HTTP method router for a single path
#[derive(Clone, Default)]
pub struct MethodRouter {
    entries: Vec<(Method, MethodEntry)>,
}

impl MethodRouter {
    pub fn new() -> Self {
        Self::default()
    }

    fn on(mut self, method: Method, handler: BoxedHandler) -> Self {
        self.entries.retain(|(m, _)| *m != method);
        self.entries.push((method, MethodEntry::new(handler)));
        self
    }

    pub fn get<H: Handler<T>, T: 'static>(self, handler: H) -> Self {
        self.on(Method::GET, into_boxed_handler(handler))
    }

    pub fn post<H: Handler<T>, T: 'static>(self, handler: H) -> Self {
        self.on(Method::POST, into_boxed_handler(handler))
    }

    pub fn put<H: Handler<T>, T: 'static>(self, handler: H) -> Self {
        self.on(Method::PUT, into_boxed_handler(handler))
    }

    pub fn patch<H: Handler<T>, T: 'static>(self, handler: H) -> Self {
        self.on(Method::PATCH, into_boxed_handler(handler))
    }

    pub fn delete<H: Handler<T>, T: 'static>(self, handler: H) -> Self {
        self.on(Method::DELETE, into_boxed_handler(handler))
    }

    fn last_mut(&mut self) -> Option<&mut MethodEntry> {
        self.entries.last_mut().map(|(_, entry)| entry)
    }

    /// Validate requests to the last added method against `schema`.
    ///
    /// Fails when the schema cannot be compiled, for example because of an
    /// invalid pattern.
    pub fn validate(self, schema: RequestSchema) -> Result<Self, ConfigurationError> {
        Ok(self.validator(RequestValidator::new(schema)?))
    }

    /// Like [`validate`](Self::validate), with an already built validator
    /// (for example one carrying external rules).
    pub fn validator(mut self, validator: RequestValidator) -> Self {
        if let Some(entry) = self.last_mut() {
            entry.set_validator(validator);
        }
        self
    }

    /// Register an external rule for the last added method.
    ///
    /// May be called before or after [`validate`](Self::validate); rules
    /// are attached to whichever validator the method ends up with.
    pub fn external(mut self, name: impl Into<String>, rule: impl ExternalRule + 'static) -> Self {
        if let Some(entry) = self.last_mut() {
            entry.externals.insert(name, Arc::new(rule));
            if let Some(validator) = entry.validator.take() {
                let validator = Arc::try_unwrap(validator).unwrap_or_else(|shared| (*shared).clone());
                entry.set_validator(validator);
            }
        }
        self
    }

    /// Document the last added method.
    pub fn describe(mut self, request: RequestModel) -> Self {
        if let Some(entry) = self.last_mut() {
            entry.docs.excluded |= request.exclude_from_docs;
            entry.docs.request = Some(request);
        }
        self
    }

    /// Declare the responses of the last added method.
    pub fn responses(mut self, responses: ResponseModels) -> Self {
        if let Some(entry) = self.last_mut() {
            entry.docs.responses = Some(responses);
        }
        self
    }

    /// Leave the last added method out of the API documentation.
    pub fn exclude_from_docs(mut self) -> Self {
        if let Some(entry) = self.last_mut() {
            entry.docs.excluded = true;
        }
        self
    }

    pub(crate) fn get_handler(&self, method: &Method) -> Option<&BoxedHandler> {
        self.entries
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, entry)| &entry.dispatch)
    }

    pub(crate) fn allowed_methods(&self) -> Vec<Method> {
        self.entries.iter().map(|(m, _)| m.clone()).collect()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&Method, &MethodEntry)> {
        self.entries.iter().map(|(m, e)| (m, e))
    }
}

macro_rules! method_fn {
    ($name:ident) => {
        pub fn $name<H: Handler<T>, T: 'static>(handler: H) -> MethodRouter {
            MethodRouter::new().$name(handler)
        }
    };
}

method_fn!(get);
method_fn!(post);
method_fn!(put);
method_fn!(patch);
method_fn!(delete);

/// Routes sharing a documentation group and, optionally, a path prefix and
/// version.
///
/// The group name tags every operation in the generated document unless a
/// route's [`RequestModel`] names its own group.
#[derive(Clone)]
pub struct RouteGroup {
    pub(crate) name: String,
    pub(crate) prefix: String,
    pub(crate) version: Option<String>,
    pub(crate) routes: Vec<(String, MethodRouter)>,
}

impl RouteGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: String::new(),
            version: None,
            routes: Vec::new(),
        }
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        let prefix = normalize_prefix(prefix);
        self.prefix = if prefix == "/" { String::new() } else { prefix };
        self
    }

    /// Tag suffix for this group's operations (`users-v1`).
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        let full = if self.prefix.is_empty() {
            path.to_string()
        } else if path == "/" {
            self.prefix.clone()
        } else {
            format!("{}{}", self.prefix, path)
        };
        self.routes.push((full, method_router));
        self
    }
}

/// Information about a registered route
#[derive(Clone)]
pub struct RouteInfo {
    /// The path as registered
    pub path: String,
    /// Documentation group, when registered through a [`RouteGroup`]
    pub group: Option<String>,
    /// Tag version, when registered through a versioned [`RouteGroup`]
    pub version: Option<String>,
    pub(crate) methods: MethodRouter,
}

impl RouteInfo {
    pub fn methods(&self) -> Vec<Method> {
        self.methods.allowed_methods()
    }
}

/// Error returned when a route conflicts with an existing route
#[derive(Debug, Clone)]
pub struct RouteConflictError {
    pub new_path: String,
    pub existing_path: Option<String>,
    pub details: String,
}

impl std::fmt::Display for RouteConflictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Route conflict: '{}'", self.new_path)?;
        if let Some(existing) = &self.existing_path {
            write!(f, " conflicts with '{}'", existing)?;
        }
        write!(f, " ({})", self.details)
    }
}

impl std::error::Error for RouteConflictError {}

/// Main router
pub struct Router {
    inner: MatchitRouter<MethodRouter>,
    state: Arc<Extensions>,
    routes: Vec<RouteInfo>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            inner: MatchitRouter::new(),
            state: Arc::new(Extensions::new()),
            routes: Vec::new(),
        }
    }

    /// Add a route
    ///
    /// # Panics
    ///
    /// When the path conflicts with an already registered route.
    pub fn route(self, path: &str, method_router: MethodRouter) -> Self {
        self.insert(path, method_router, None, None)
    }

    /// Add every route of a group.
    pub fn group(mut self, group: RouteGroup) -> Self {
        for (path, method_router) in group.routes {
            self = self.insert(&path, method_router, Some(group.name.clone()), group.version.clone());
        }
        self
    }

    fn insert(
        mut self,
        path: &str,
        method_router: MethodRouter,
        group: Option<String>,
        version: Option<String>,
    ) -> Self {
        let matchit_path = convert_path_params(path);

        if let Err(e) = self.inner.insert(matchit_path.clone(), method_router.clone()) {
            let normalized = normalize_path_for_comparison(&matchit_path);
            let existing_path = self
                .routes
                .iter()
                .find(|info| normalize_path_for_comparison(&convert_path_params(&info.path)) == normalized)
                .map(|info| info.path.clone());

            panic!(
                "{}",
                RouteConflictError {
                    new_path: path.to_string(),
                    existing_path,
                    details: e.to_string(),
                }
            );
        }

        self.routes.push(RouteInfo {
            path: path.to_string(),
            group,
            version,
            methods: method_router,
        });
        self
    }

    /// Add application state
    pub fn state<S: Clone + Send + Sync + 'static>(mut self, state: S) -> Self {
        let extensions = Arc::make_mut(&mut self.state);
        extensions.insert(state);
        self
    }

    pub(crate) fn match_route(&self, path: &str, method: &Method) -> RouteMatch<'_> {
        match self.inner.at(path) {
            Ok(matched) => {
                let method_router = matched.value;

                if let Some(handler) = method_router.get_handler(method) {
                    let params: HashMap<String, String> = matched
                        .params
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect();

                    RouteMatch::Found { handler, params }
                } else {
                    RouteMatch::MethodNotAllowed {
                        allowed: method_router.allowed_methods(),
                    }
                }
            }
            Err(_) => RouteMatch::NotFound,
        }
    }

    pub(crate) fn state_ref(&self) -> Arc<Extensions> {
        self.state.clone()
    }

    /// Registered routes, in registration order
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of route matching
pub(crate) enum RouteMatch<'a> {
    Found {
        handler: &'a BoxedHandler,
        params: HashMap<String, String>,
    },
    NotFound,
    MethodNotAllowed {
        allowed: Vec<Method>,
    },
}

/// Convert {param} style to :param for matchit
fn convert_path_params(path: &str) -> String {
    let mut result = String::with_capacity(path.len());

    for ch in path.chars() {
        match ch {
            '{' => result.push(':'),
            '}' => {}
            _ => result.push(ch),
        }
    }

    result
}

/// Replace parameter names with a placeholder
fn normalize_path_for_comparison(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.chars().next() {
            Some(':') => ":_",
            Some('*') => "*_",
            _ => segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let segments: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = String::with_capacity(prefix.len() + 1);
    for segment in segments {
        result.push('/');
        result.push_str(segment);
    }

    result
}
