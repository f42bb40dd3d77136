//! Validation options and the three-layer configuration resolver.
//!
//! Options come from three layers, merged field by field:
//!
//! 1. per-call overrides carried by the route's [`RequestSchema`](crate::RequestSchema)
//! 2. process-wide overrides set with [`set_options`]
//! 3. the built-in [`Options::default`]
//!
//! A field set in a higher layer wins over the same field in a lower one.

use crate::error::ConfigurationError;
use crate::location::Location;
use serde::{Deserialize, Serialize};
use std::sync::{OnceLock, PoisonError, RwLock};

/// Fully resolved options for one validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Expose the whole request to the evaluator as context
    pub context_request: bool,
    pub allow_unknown_headers: bool,
    pub allow_unknown_body: bool,
    pub allow_unknown_query: bool,
    pub allow_unknown_params: bool,
    pub allow_unknown_cookies: bool,
    /// Status reported by a validation failure
    pub status: u16,
    /// Status text reported by a validation failure
    pub status_text: String,
    /// Serialize failures as a flat message list
    pub flatten: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            context_request: false,
            allow_unknown_headers: true,
            allow_unknown_body: true,
            allow_unknown_query: true,
            allow_unknown_params: true,
            allow_unknown_cookies: true,
            status: 400,
            status_text: "Bad Request".to_string(),
            flatten: false,
        }
    }
}

impl Options {
    /// Whether undeclared keys are accepted in a location.
    pub fn allow_unknown(&self, location: Location) -> bool {
        match location {
            Location::Headers => self.allow_unknown_headers,
            Location::Body => self.allow_unknown_body,
            Location::Query => self.allow_unknown_query,
            Location::Params => self.allow_unknown_params,
            Location::Cookies => self.allow_unknown_cookies,
        }
    }
}

/// A partial set of options. Unset fields defer to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionsOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_unknown_headers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_unknown_body: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_unknown_query: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_unknown_params: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_unknown_cookies: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
}

/// Environment form of [`OptionsOverride`] (`SPECGUARD_STATUS`, `SPECGUARD_ALLOW_UNKNOWN_BODY`, ...).
#[derive(Debug, Deserialize)]
struct EnvOptions {
    context_request: Option<bool>,
    allow_unknown_headers: Option<bool>,
    allow_unknown_body: Option<bool>,
    allow_unknown_query: Option<bool>,
    allow_unknown_params: Option<bool>,
    allow_unknown_cookies: Option<bool>,
    status: Option<u16>,
    status_text: Option<String>,
    flatten: Option<bool>,
}

impl From<EnvOptions> for OptionsOverride {
    fn from(env: EnvOptions) -> Self {
        Self {
            context_request: env.context_request,
            allow_unknown_headers: env.allow_unknown_headers,
            allow_unknown_body: env.allow_unknown_body,
            allow_unknown_query: env.allow_unknown_query,
            allow_unknown_params: env.allow_unknown_params,
            allow_unknown_cookies: env.allow_unknown_cookies,
            status: env.status,
            status_text: env.status_text,
            flatten: env.flatten,
        }
    }
}

impl OptionsOverride {
    /// Create an empty override.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overrides from `SPECGUARD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let env: EnvOptions = envy::prefixed("SPECGUARD_").from_env()?;
        Ok(env.into())
    }

    /// Set `contextRequest`.
    pub fn context_request(mut self, enabled: bool) -> Self {
        self.context_request = Some(enabled);
        self
    }

    /// Set the `allowUnknown*` flag of one location.
    pub fn allow_unknown(mut self, location: Location, allow: bool) -> Self {
        *self.allow_unknown_slot(location) = Some(allow);
        self
    }

    /// Set the failure status.
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the failure status text.
    pub fn status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = Some(text.into());
        self
    }

    /// Set `flatten`.
    pub fn flatten(mut self, flatten: bool) -> Self {
        self.flatten = Some(flatten);
        self
    }

    /// Check whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn allow_unknown_slot(&mut self, location: Location) -> &mut Option<bool> {
        match location {
            Location::Headers => &mut self.allow_unknown_headers,
            Location::Body => &mut self.allow_unknown_body,
            Location::Query => &mut self.allow_unknown_query,
            Location::Params => &mut self.allow_unknown_params,
            Location::Cookies => &mut self.allow_unknown_cookies,
        }
    }

    /// Field-wise merge: fields set on `self` win, the rest come from `fallback`.
    pub fn or(&self, fallback: &OptionsOverride) -> OptionsOverride {
        OptionsOverride {
            context_request: self.context_request.or(fallback.context_request),
            allow_unknown_headers: self.allow_unknown_headers.or(fallback.allow_unknown_headers),
            allow_unknown_body: self.allow_unknown_body.or(fallback.allow_unknown_body),
            allow_unknown_query: self.allow_unknown_query.or(fallback.allow_unknown_query),
            allow_unknown_params: self.allow_unknown_params.or(fallback.allow_unknown_params),
            allow_unknown_cookies: self.allow_unknown_cookies.or(fallback.allow_unknown_cookies),
            status: self.status.or(fallback.status),
            status_text: self
                .status_text
                .clone()
                .or_else(|| fallback.status_text.clone()),
            flatten: self.flatten.or(fallback.flatten),
        }
    }

    /// Fill every unset field from `defaults`.
    pub fn apply_to(&self, defaults: &Options) -> Options {
        Options {
            context_request: self.context_request.unwrap_or(defaults.context_request),
            allow_unknown_headers: self
                .allow_unknown_headers
                .unwrap_or(defaults.allow_unknown_headers),
            allow_unknown_body: self.allow_unknown_body.unwrap_or(defaults.allow_unknown_body),
            allow_unknown_query: self.allow_unknown_query.unwrap_or(defaults.allow_unknown_query),
            allow_unknown_params: self
                .allow_unknown_params
                .unwrap_or(defaults.allow_unknown_params),
            allow_unknown_cookies: self
                .allow_unknown_cookies
                .unwrap_or(defaults.allow_unknown_cookies),
            status: self.status.unwrap_or(defaults.status),
            status_text: self
                .status_text
                .clone()
                .unwrap_or_else(|| defaults.status_text.clone()),
            flatten: self.flatten.unwrap_or(defaults.flatten),
        }
    }
}

/// Merge the three option layers: per-call > process-wide > defaults.
///
/// Absent layers count as empty. Inputs are never mutated.
pub fn resolve(
    per_call: Option<&OptionsOverride>,
    process: Option<&OptionsOverride>,
    defaults: &Options,
) -> Options {
    let empty = OptionsOverride::default();
    let per_call = per_call.unwrap_or(&empty);
    let process = process.unwrap_or(&empty);
    per_call.or(process).apply_to(defaults)
}

/// Holder of process-wide option overrides.
///
/// Writers replace the whole value; readers take a snapshot. An update that
/// races with an in-flight validation may or may not apply to it
/// (last writer wins).
#[derive(Debug, Default)]
pub struct OptionsStore {
    current: RwLock<OptionsOverride>,
}

impl OptionsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current overrides.
    pub fn snapshot(&self) -> OptionsOverride {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Update the overrides.
    ///
    /// `None` clears everything. `Some(opts)` keeps every field that is
    /// already set and takes the remaining fields from `opts`.
    pub fn set(&self, opts: Option<OptionsOverride>) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = match opts {
            None => OptionsOverride::default(),
            Some(opts) => current.or(&opts),
        };
    }
}

static PROCESS_OPTIONS: OnceLock<OptionsStore> = OnceLock::new();

fn process_store() -> &'static OptionsStore {
    PROCESS_OPTIONS.get_or_init(OptionsStore::new)
}

/// Update the process-wide option overrides. See [`OptionsStore::set`].
pub fn set_options(opts: Option<OptionsOverride>) {
    tracing::debug!(reset = opts.is_none(), "updating process validation options");
    process_store().set(opts);
}

/// Snapshot of the process-wide option overrides.
pub fn global_options() -> OptionsOverride {
    process_store().snapshot()
}
