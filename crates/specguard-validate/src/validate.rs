//! The request validation pipeline.
//!
//! A [`RequestValidator`] is built once per route from a [`RequestSchema`] and
//! then run against every incoming request. Each configured location is
//! evaluated in turn (headers, body, query, params, cookies), every violation
//! is collected, and the request either passes with its locations replaced by
//! the converted values or fails with a single [`ValidationFailure`].

use crate::aggregate::aggregate;
use crate::error::{ConfigurationError, FieldError, ValidationFailure, Violation};
use crate::location::Location;
use crate::options::{global_options, resolve, Options, OptionsOverride};
use crate::schema::{CompiledSchema, EvalOptions, ExternalRule, ExternalRules, ObjectSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Per-route validation schema: one optional object schema per location plus
/// option overrides that take precedence over the process-wide ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<ObjectSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ObjectSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<ObjectSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<ObjectSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<ObjectSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OptionsOverride>,
}

impl RequestSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(mut self, schema: ObjectSchema) -> Self {
        self.headers = Some(schema);
        self
    }

    pub fn body(mut self, schema: ObjectSchema) -> Self {
        self.body = Some(schema);
        self
    }

    pub fn query(mut self, schema: ObjectSchema) -> Self {
        self.query = Some(schema);
        self
    }

    pub fn params(mut self, schema: ObjectSchema) -> Self {
        self.params = Some(schema);
        self
    }

    pub fn cookies(mut self, schema: ObjectSchema) -> Self {
        self.cookies = Some(schema);
        self
    }

    /// Per-route option overrides.
    pub fn options(mut self, options: OptionsOverride) -> Self {
        self.options = Some(options);
        self
    }

    /// The schema configured for a location, if any.
    pub fn location(&self, location: Location) -> Option<&ObjectSchema> {
        match location {
            Location::Headers => self.headers.as_ref(),
            Location::Body => self.body.as_ref(),
            Location::Query => self.query.as_ref(),
            Location::Params => self.params.as_ref(),
            Location::Cookies => self.cookies.as_ref(),
        }
    }
}

/// Access to the five request locations.
///
/// Host frameworks implement this for whatever they use to carry parsed
/// request data; [`RequestInputs`] is a ready-made implementation.
pub trait RequestLocations: Send {
    /// Mutable access to a location's value. `None` means the request does not
    /// carry that location.
    fn location_mut(&mut self, location: Location) -> Option<&mut Value>;

    /// The whole request as one JSON object keyed by location name.
    fn snapshot(&self) -> Value;
}

/// Parsed request data, one JSON value per location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestInputs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Value>,
}

impl RequestInputs {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, location: Location) -> &mut Option<Value> {
        match location {
            Location::Headers => &mut self.headers,
            Location::Body => &mut self.body,
            Location::Query => &mut self.query,
            Location::Params => &mut self.params,
            Location::Cookies => &mut self.cookies,
        }
    }

    pub fn get(&self, location: Location) -> Option<&Value> {
        match location {
            Location::Headers => self.headers.as_ref(),
            Location::Body => self.body.as_ref(),
            Location::Query => self.query.as_ref(),
            Location::Params => self.params.as_ref(),
            Location::Cookies => self.cookies.as_ref(),
        }
    }

    pub fn set(&mut self, location: Location, value: Value) {
        *self.slot(location) = Some(value);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, location: Location, value: Value) -> Self {
        self.set(location, value);
        self
    }
}

impl RequestLocations for RequestInputs {
    fn location_mut(&mut self, location: Location) -> Option<&mut Value> {
        self.slot(location).as_mut()
    }

    fn snapshot(&self) -> Value {
        let mut map = Map::new();
        for location in Location::ALL {
            if let Some(value) = self.get(location) {
                map.insert(location.as_str().to_string(), value.clone());
            }
        }
        Value::Object(map)
    }
}

/// Validate one location in place.
///
/// Does nothing when either the value or the schema is absent. `context`
/// defaults to the location value itself. On success the converted value is
/// merged into `raw` key by key, so keys the evaluator did not produce are
/// kept. On failure `raw` is left untouched.
pub async fn validate_location(
    raw: Option<&mut Value>,
    schema: Option<&CompiledSchema>,
    allow_unknown: bool,
    context: Option<&Value>,
) -> Vec<Violation> {
    let (Some(raw), Some(schema)) = (raw, schema) else {
        return Vec::new();
    };

    let own_context;
    let context = match context {
        Some(context) => context,
        None => {
            own_context = raw.clone();
            &own_context
        }
    };

    let evaluation = schema
        .validate(
            raw,
            &EvalOptions {
                allow_unknown,
                context,
            },
        )
        .await;

    if evaluation.is_valid() {
        assign_in(raw, evaluation.value);
        Vec::new()
    } else {
        evaluation.violations
    }
}

fn assign_in(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => target.extend(source),
        (target, source) => *target = source,
    }
}

/// Build a validator, failing when no schema is given.
pub fn validation(schema: Option<RequestSchema>) -> Result<RequestValidator, ConfigurationError> {
    RequestValidator::new(schema.ok_or(ConfigurationError::MissingSchema)?)
}

/// A compiled per-route validator. Cheap to share behind an `Arc`; holds no
/// per-request state.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    schema: RequestSchema,
    compiled: Vec<(Location, CompiledSchema)>,
    externals: ExternalRules,
}

impl RequestValidator {
    /// Compile every location schema of `schema`.
    ///
    /// Header keys are lowercased to match how header names are read.
    pub fn new(mut schema: RequestSchema) -> Result<Self, ConfigurationError> {
        schema.headers = schema.headers.map(lowercase_keys);
        let compiled = Location::ALL
            .into_iter()
            .filter_map(|location| {
                schema
                    .location(location)
                    .map(|object| CompiledSchema::compile(object.clone()).map(|c| (location, c)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            schema,
            compiled,
            externals: ExternalRules::new(),
        })
    }

    /// Register an asynchronous rule referenced by [`Schema::external`](crate::schema::Schema::external).
    pub fn external(mut self, name: impl Into<String>, rule: impl ExternalRule + 'static) -> Self {
        self.externals.insert(name, Arc::new(rule));
        self.attach_externals()
    }

    /// Register every rule of `rules`, replacing rules of the same name.
    pub fn with_rules(mut self, rules: &ExternalRules) -> Self {
        if rules.is_empty() {
            return self;
        }
        for (name, rule) in rules.iter() {
            self.externals.insert(name.clone(), rule.clone());
        }
        self.attach_externals()
    }

    /// Fail when any location names an external rule that is not registered.
    pub fn check_externals(&self) -> Result<(), ConfigurationError> {
        for (location, compiled) in &self.compiled {
            compiled.check_externals().map_err(|err| match err {
                ConfigurationError::UnregisteredRule { field, rule } => ConfigurationError::UnregisteredRule {
                    field: format!("{location}.{field}"),
                    rule,
                },
                other => other,
            })?;
        }
        Ok(())
    }

    fn attach_externals(mut self) -> Self {
        let externals = &self.externals;
        self.compiled = std::mem::take(&mut self.compiled)
            .into_iter()
            .map(|(location, compiled)| (location, compiled.with_externals(externals.clone())))
            .collect();
        self
    }

    pub fn schema(&self) -> &RequestSchema {
        &self.schema
    }

    /// Resolve the options for one call against a process-wide snapshot.
    pub fn resolve_options(&self, process: &OptionsOverride) -> Options {
        resolve(self.schema.options.as_ref(), Some(process), &Options::default())
    }

    fn compiled(&self, location: Location) -> Option<&CompiledSchema> {
        self.compiled
            .iter()
            .find(|(l, _)| *l == location)
            .map(|(_, c)| c)
    }

    /// Validate a request using the current process-wide options.
    pub async fn validate<R>(&self, request: &mut R) -> Result<(), ValidationFailure>
    where
        R: RequestLocations + ?Sized,
    {
        let process = global_options();
        self.validate_with(request, &process).await
    }

    /// Validate a request against an explicit process-wide options snapshot.
    ///
    /// Locations are evaluated one after another and every one is attempted,
    /// even after an earlier one failed.
    pub async fn validate_with<R>(
        &self,
        request: &mut R,
        process: &OptionsOverride,
    ) -> Result<(), ValidationFailure>
    where
        R: RequestLocations + ?Sized,
    {
        let options = self.resolve_options(process);
        let mut errors: Vec<FieldError> = Vec::new();

        for location in Location::ALL {
            let Some(schema) = self.compiled(location) else {
                continue;
            };
            let context = options.context_request.then(|| request.snapshot());

            let violations = validate_location(
                request.location_mut(location),
                Some(schema),
                options.allow_unknown(location),
                context.as_ref(),
            )
            .await;

            tracing::debug!(
                location = %location,
                violations = violations.len(),
                "validated request location"
            );
            aggregate(&mut errors, violations, location);
        }

        if errors.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            fields = errors.len(),
            status = options.status,
            "request validation failed"
        );
        Err(ValidationFailure::new(errors, &options))
    }
}

fn lowercase_keys(headers: ObjectSchema) -> ObjectSchema {
    headers
        .fields()
        .iter()
        .map(|field| {
            let mut schema = field.schema.clone();
            for condition in &mut schema.conditions {
                if !condition.reference.starts_with('$') {
                    condition.reference = condition.reference.to_ascii_lowercase();
                }
            }
            (field.name.to_ascii_lowercase(), schema)
        })
        .collect()
}
