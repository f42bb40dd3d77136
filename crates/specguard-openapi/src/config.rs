//! OpenAPI configuration

/// Configuration for the documentation endpoints
#[derive(Debug, Clone)]
pub struct OpenApiConfig {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    pub description: Option<String>,
    /// Path to serve the OpenAPI JSON
    pub json_path: String,
    /// Path to serve Swagger UI
    pub docs_path: String,
    /// Route version appended to operation tags (`users-v1`)
    pub route_version: Option<String>,
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self {
            title: "specguard API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            json_path: "/openapi.json".to_string(),
            docs_path: "/docs".to_string(),
            route_version: None,
        }
    }
}

impl OpenApiConfig {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn json_path(mut self, path: impl Into<String>) -> Self {
        self.json_path = path.into();
        self
    }

    pub fn docs_path(mut self, path: impl Into<String>) -> Self {
        self.docs_path = path.into();
        self
    }

    pub fn route_version(mut self, version: impl Into<String>) -> Self {
        self.route_version = Some(version.into());
        self
    }

    /// An empty document carrying this configuration's info block.
    pub fn spec(&self) -> crate::OpenApiSpec {
        let spec = crate::OpenApiSpec::new(&self.title, &self.version);
        match &self.description {
            Some(description) => spec.description(description),
            None => spec,
        }
    }
}
