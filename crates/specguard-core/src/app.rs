//! SpecGuard application builder

use crate::docs::build_spec;
use crate::error::BuildError;
use crate::middleware::{LayerStack, MiddlewareLayer};
use crate::response::Response;
use crate::router::{get, MethodRouter, RouteGroup, Router};
use crate::server::{Server, Service, DEFAULT_BODY_LIMIT};
use specguard_openapi::{openapi_json, DocError, OpenApiConfig, OpenApiSpec};
use specguard_validate::{global_options, set_options, OptionsOverride};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Main application builder
///
/// ```rust,ignore
/// use specguard_rs::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///     SpecGuard::new()
///         .route("/users", post(create_user).validate(user_schema())?)
///         .docs("/docs")
///         .run("127.0.0.1:8080")
///         .await
/// }
/// ```
pub struct SpecGuard {
    router: Router,
    layers: LayerStack,
    body_limit: Option<usize>,
    docs: Option<OpenApiConfig>,
}

impl SpecGuard {
    /// Create a new application
    ///
    /// Installs a `tracing` subscriber filtered by `RUST_LOG` (default
    /// `info,specguard=debug`) unless one is already installed.
    pub fn new() -> Self {
        let _ = tracing_subscriber::registry()
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,specguard=debug")),
            )
            .with(tracing_subscriber::fmt::layer())
            .try_init();

        Self {
            router: Router::new(),
            layers: LayerStack::new(),
            body_limit: Some(DEFAULT_BODY_LIMIT),
            docs: None,
        }
    }

    /// Set process-wide validation options, keeping values already set.
    ///
    /// Equivalent to [`set_options`]; `None` resets to defaults.
    pub fn validation_options(self, options: Option<OptionsOverride>) -> Self {
        set_options(options);
        self
    }

    /// Load process-wide validation options from `SPECGUARD_*` environment
    /// variables.
    pub fn validation_options_from_env(self) -> Result<Self, specguard_validate::ConfigurationError> {
        let options = OptionsOverride::from_env()?;
        if !options.is_empty() {
            set_options(Some(options));
        }
        Ok(self)
    }

    /// Maximum request body size in bytes
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = Some(limit);
        self
    }

    pub fn no_body_limit(mut self) -> Self {
        self.body_limit = None;
        self
    }

    /// Add an app-wide middleware layer
    ///
    /// Layers run in the order they are added, before routing-level
    /// validation.
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: MiddlewareLayer,
    {
        self.layers.push(Box::new(layer));
        self
    }

    /// Add application state, available through the `State` extractor
    pub fn state<S>(mut self, state: S) -> Self
    where
        S: Clone + Send + Sync + 'static,
    {
        self.router = self.router.state(state);
        self
    }

    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    pub fn group(mut self, group: RouteGroup) -> Self {
        self.router = self.router.group(group);
        self
    }

    /// Serve Swagger UI at `path` and the document at `{path}/openapi.json`.
    pub fn docs(self, path: &str) -> Self {
        let path = path.trim_end_matches('/');
        let config = OpenApiConfig::default()
            .docs_path(path)
            .json_path(format!("{}/openapi.json", path));
        self.docs_with_config(config)
    }

    /// Serve documentation with a custom title, version and paths.
    pub fn docs_with_config(mut self, config: OpenApiConfig) -> Self {
        self.docs = Some(config);
        self
    }

    /// The OpenAPI document for the routes registered so far.
    pub fn openapi_spec(&self) -> Result<OpenApiSpec, DocError> {
        let config = self.docs.clone().unwrap_or_default();
        build_spec(&self.router, &config, &global_options())
    }

    /// Finish the application, mounting the documentation endpoints.
    ///
    /// Fails when a validated route names an external rule it never
    /// registered.
    pub(crate) fn into_service(self) -> Result<Service, BuildError> {
        let mut router = self.router;

        for route in router.routes() {
            for (method, entry) in route.methods.entries() {
                let Some(validator) = entry.validator() else {
                    continue;
                };
                validator.check_externals().map_err(|source| {
                    tracing::error!(%method, path = %route.path, error = %source, "invalid route validation");
                    BuildError::Validation {
                        method: method.to_string(),
                        path: route.path.clone(),
                        source,
                    }
                })?;
            }
        }

        if let Some(config) = self.docs {
            let spec = build_spec(&router, &config, &global_options())?;
            tracing::debug!(
                paths = spec.paths.len(),
                schemas = spec.schemas.len(),
                "generated API documentation"
            );
            router = mount_docs(router, &config, spec);
        }

        Ok(Service::new(router, self.layers, self.body_limit))
    }

    /// Run the server
    pub async fn run(self, addr: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let service = self.into_service()?;
        Server::new(service).run(addr).await
    }
}

impl Default for SpecGuard {
    fn default() -> Self {
        Self::new()
    }
}

fn mount_docs(router: Router, config: &OpenApiConfig, spec: OpenApiSpec) -> Router {
    let spec_handler = move || {
        let response: Response = openapi_json(&spec);
        async move { response }
    };
    let router = router.route(&config.json_path, get(spec_handler).exclude_from_docs());

    #[cfg(feature = "swagger-ui")]
    let router = {
        let url = config.json_path.clone();
        let title = config.title.clone();
        let docs_handler = move || {
            let response: Response = specguard_openapi::swagger_ui_html(&url, &title);
            async move { response }
        };
        router.route(&config.docs_path, get(docs_handler).exclude_from_docs())
    };

    router
}
