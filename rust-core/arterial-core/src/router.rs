//! # Route Registry & Request Dispatcher
//!
//! Holds route definitions in registration order, compiles them at
//! registration time and dispatches inbound requests to the first route
//! whose method and path match. No scoring and no specificity ranking:
//! overlapping routes are the registrant's responsibility, earlier wins.
//!
//! The dispatch table (ordered compiled routes plus the name index used for
//! URL resolution) is built lazily on first use and cached. Adding a route
//! invalidates the cache; the next resolution rebuilds the table fully and
//! publishes it in one swap, so concurrent readers never observe a
//! half-built table.

use crate::binding::{build_bindings, BindingKind, ParameterBinding, RouteBindings};
use crate::body::{parse_body, BodyParseConfig, ParsedBody};
use crate::error::{Error, Result};
use crate::pattern::CompiledPattern;
use crate::provider::{ServiceProvider, ServiceRef};
use crate::request::{percent_decode, RouteRequest};
use crate::route::{Method, RouteDefinition};
use crate::schema::{join_path, ValueSchema};
use crate::url::build_url;
use crate::validation::{FieldError, ValidationErrors};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

/// One materialized handler argument
#[derive(Clone)]
pub enum HandlerArg {
    /// A converted request-derived value
    Value(Value),
    /// An injected service
    Service(ServiceRef),
    /// The accumulated validation errors (error-sink parameter)
    Errors(ValidationErrors),
}

impl std::fmt::Debug for HandlerArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Service(_) => f.write_str("Service(..)"),
            Self::Errors(e) => f.debug_tuple("Errors").field(e).finish(),
        }
    }
}

impl HandlerArg {
    /// The JSON value, if this argument is one
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The collected errors, if this is the sink argument
    #[must_use]
    pub fn as_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Errors(e) => Some(e),
            _ => None,
        }
    }

    /// The service handle, if this argument is injected
    #[must_use]
    pub fn as_service(&self) -> Option<&ServiceRef> {
        match self {
            Self::Service(s) => Some(s),
            _ => None,
        }
    }
}

/// A route definition with its derived matching and binding state
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    def: Arc<RouteDefinition>,
    pattern: CompiledPattern,
    bindings: RouteBindings,
}

impl CompiledRoute {
    /// Compile a definition: pattern first, then parameter classification.
    fn compile(def: Arc<RouteDefinition>) -> Result<Self> {
        let pattern = CompiledPattern::compile(&def.full_path(), def.param_patterns())?;
        let bindings = build_bindings(&def, &pattern)?;
        Ok(Self {
            def,
            pattern,
            bindings,
        })
    }

    /// The underlying definition
    #[must_use]
    pub fn definition(&self) -> &RouteDefinition {
        &self.def
    }

    /// Whether materialization must parse the request body
    #[must_use]
    pub fn needs_body(&self) -> bool {
        self.bindings.needs_body
    }

    /// Whether resolution suspends (true iff the body must be parsed)
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.needs_body()
    }

    pub(crate) fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub(crate) fn bindings(&self) -> &[ParameterBinding] {
        &self.bindings.bindings
    }
}

/// The published dispatch table: routes in registration order plus the
/// name index for URL resolution (last-registered name wins).
struct RouteTable {
    routes: Vec<Arc<CompiledRoute>>,
    by_name: HashMap<String, usize>,
}

impl RouteTable {
    fn build(routes: &[Arc<CompiledRoute>]) -> Self {
        let mut by_name = HashMap::new();
        for (index, route) in routes.iter().enumerate() {
            by_name.insert(route.def.name().to_string(), index);
        }
        Self {
            routes: routes.to_vec(),
            by_name,
        }
    }
}

/// Route registry and request dispatcher
///
/// Registration happens during startup with `&mut self`; dispatch is
/// `&self` and read-only apart from the table cache.
pub struct Router {
    routes: Vec<Arc<CompiledRoute>>,
    table: RwLock<Option<Arc<RouteTable>>>,
    body_config: BodyParseConfig,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create an empty router with default body-parsing limits
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BodyParseConfig::default())
    }

    /// Create an empty router with explicit body-parsing configuration
    #[must_use]
    pub fn with_config(body_config: BodyParseConfig) -> Self {
        Self {
            routes: Vec::new(),
            table: RwLock::new(None),
            body_config,
        }
    }

    /// Register a route.
    ///
    /// The definition is compiled immediately so malformed templates and
    /// binding conflicts fail here, not at request time. Invalidates the
    /// cached dispatch table.
    ///
    /// # Errors
    ///
    /// Returns the configuration error that made the definition unusable.
    pub fn add_route(&mut self, def: RouteDefinition) -> Result<()> {
        let def = Arc::new(def);
        let compiled = Arc::new(CompiledRoute::compile(Arc::clone(&def))?);
        debug!(
            name = def.name(),
            method = %def.method(),
            path = %def.full_path(),
            "route registered"
        );
        self.routes.push(compiled);
        *self.table.write().expect("route table lock poisoned") = None;
        Ok(())
    }

    /// All registered definitions, in registration order
    #[must_use]
    pub fn routes(&self) -> Vec<Arc<RouteDefinition>> {
        self.routes.iter().map(|r| Arc::clone(&r.def)).collect()
    }

    /// The cached dispatch table, building it if a route was added since
    /// the last resolution.
    fn table(&self) -> Arc<RouteTable> {
        if let Some(table) = self
            .table
            .read()
            .expect("route table lock poisoned")
            .as_ref()
        {
            return Arc::clone(table);
        }

        // Build fully before publishing
        let built = Arc::new(RouteTable::build(&self.routes));
        debug!(routes = built.routes.len(), "route table rebuilt");
        *self.table.write().expect("route table lock poisoned") = Some(Arc::clone(&built));
        built
    }

    /// Match a request by method and target (`/path` or `/path?query`).
    ///
    /// Routes are tried in registration order; the first whose method and
    /// path both match wins. `None` means no route matched, which is a
    /// defined outcome, not an error.
    #[must_use]
    pub fn resolve(&self, method: Method, target: &str) -> Option<ResolvedInvocation> {
        let path = target.split_once('?').map_or(target, |(p, _)| p);
        let table = self.table();

        for route in &table.routes {
            if route.def.method() != method {
                continue;
            }
            if let Some(captures) = route.pattern().match_path(path) {
                trace!(name = route.def.name(), %path, "route matched");
                let path_values = captures
                    .iter()
                    .map(|raw| percent_decode(raw, false))
                    .collect();
                return Some(ResolvedInvocation {
                    route: Arc::clone(route),
                    path_values,
                    body_config: self.body_config.clone(),
                });
            }
        }
        trace!(%method, %path, "no route matched");
        None
    }

    /// Match an already-built request
    #[must_use]
    pub fn resolve_request(&self, request: &RouteRequest) -> Option<ResolvedInvocation> {
        self.resolve(request.method, &request.path)
    }

    /// Reconstruct a URL from a route name and parameter values.
    ///
    /// Path tokens are substituted from `params` (percent-encoded); every
    /// query-bound parameter present in `params` with a defined value is
    /// appended to the query string. On duplicate route names the
    /// last-registered route wins.
    ///
    /// # Errors
    ///
    /// [`Error::RouteNotFound`] for an unknown name,
    /// [`Error::MissingParameter`] when a path token has no value.
    pub fn resolve_url(&self, name: &str, params: &HashMap<String, Value>) -> Result<String> {
        let table = self.table();
        let route = table
            .by_name
            .get(name)
            .map(|&index| &table.routes[index])
            .ok_or_else(|| Error::RouteNotFound {
                name: name.to_string(),
            })?;
        build_url(route, params)
    }
}

/// A matched route plus everything needed to materialize handler arguments
pub struct ResolvedInvocation {
    route: Arc<CompiledRoute>,
    path_values: Vec<String>,
    body_config: BodyParseConfig,
}

impl ResolvedInvocation {
    /// The matched route's definition
    #[must_use]
    pub fn definition(&self) -> &RouteDefinition {
        self.route.definition()
    }

    /// Decoded path captures in token order
    #[must_use]
    pub fn path_values(&self) -> &[String] {
        &self.path_values
    }

    /// Decoded path capture by parameter name
    #[must_use]
    pub fn path_value(&self, name: &str) -> Option<&str> {
        self.route
            .pattern()
            .param_index(name)
            .map(|i| self.path_values[i].as_str())
    }

    /// Whether materialization suspends to parse the body
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.route.is_async()
    }

    /// Build the ordered handler argument list.
    ///
    /// Converters and validators run per binding in declaration order; all
    /// validation errors are accumulated rather than short-circuiting. When
    /// the route declares an error-sink parameter, the accumulated errors
    /// are delivered through it and dispatch succeeds; otherwise any error
    /// fails materialization with [`Error::Validation`].
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] on failed conversion/validation (no sink),
    /// [`Error::ServiceNotFound`] for unresolvable injected parameters, and
    /// body-parsing errors from [`parse_body`].
    pub async fn materialize(
        &self,
        request: &RouteRequest,
        provider: &dyn ServiceProvider,
    ) -> Result<Vec<HandlerArg>> {
        // The only suspension point: everything below is synchronous
        let parsed = if self.route.needs_body() {
            Some(parse_body(request, &self.body_config).await?)
        } else {
            None
        };

        let mut errors = ValidationErrors::new();
        let mut body_errors = ValidationErrors::new();
        let bindings = self.route.bindings();
        let mut args = Vec::with_capacity(bindings.len());

        for binding in bindings {
            let arg = match &binding.kind {
                BindingKind::Path { index } => {
                    let raw = &self.path_values[*index];
                    match binding.schema.coerce(raw, &binding.name) {
                        Ok(v) => {
                            binding.schema.validate(&v, &binding.name, &mut errors);
                            HandlerArg::Value(v)
                        }
                        Err(e) => {
                            errors.add(e);
                            HandlerArg::Value(Value::Null)
                        }
                    }
                }
                BindingKind::Query { path } if path.is_empty() => {
                    HandlerArg::Value(request.query_object())
                }
                BindingKind::Query { path } => {
                    HandlerArg::Value(materialize_query(request, binding, path, &mut errors))
                }
                BindingKind::Body { path } => {
                    let parsed = parsed.as_ref().expect("body parsed for body bindings");
                    HandlerArg::Value(materialize_body(
                        parsed,
                        binding,
                        path.as_deref(),
                        &mut body_errors,
                    ))
                }
                BindingKind::Injected { key } => match provider.resolve(key) {
                    Some(service) => HandlerArg::Service(service),
                    None => {
                        return Err(Error::ServiceNotFound { key: key.clone() });
                    }
                },
                // Placeholder; replaced once all errors are known
                BindingKind::ErrorSink => HandlerArg::Value(Value::Null),
            };
            args.push(arg);
        }

        if let Some(sink) = self.route.bindings.sink {
            errors.merge(body_errors);
            args[sink] = HandlerArg::Errors(errors);
            return Ok(args);
        }

        if !errors.is_empty() || !body_errors.is_empty() {
            errors.merge(body_errors);
            return Err(Error::Validation(errors));
        }
        Ok(args)
    }
}

/// Convert and validate one query-bound parameter.
///
/// Class-typed parameters expand field-by-field over bracketed keys
/// (`path[field]`), arrays collect every pair under their single key, and
/// scalars read one key. Error paths stay dotted.
fn materialize_query(
    request: &RouteRequest,
    binding: &ParameterBinding,
    path: &str,
    errors: &mut ValidationErrors,
) -> Value {
    match &binding.schema {
        ValueSchema::Object(fields) => {
            let mut map = serde_json::Map::new();
            let mut any_present = false;
            for field in fields {
                let err_path = join_path(path, &field.name);
                let key = crate::binding::dotted_to_bracket(&err_path);
                if let Some(raw) = request.query_map().get(&key) {
                    any_present = true;
                    match field.schema.coerce(raw, &err_path) {
                        Ok(v) => {
                            field.schema.validate(&v, &err_path, errors);
                            map.insert(field.name.clone(), v);
                        }
                        Err(e) => errors.add(e),
                    }
                } else if field.required && !binding.optional {
                    errors.add(FieldError::required(err_path));
                }
            }
            if map.is_empty() && !any_present {
                Value::Null
            } else {
                Value::Object(map)
            }
        }
        ValueSchema::Array(inner) => {
            let key = crate::binding::dotted_to_bracket(path);
            let raws = request.query_values(&key);
            if raws.is_empty() {
                if !binding.optional {
                    errors.add(FieldError::required(path));
                }
                return Value::Null;
            }
            let mut items = Vec::with_capacity(raws.len());
            for (i, raw) in raws.iter().enumerate() {
                let item_path = format!("{path}.{i}");
                match inner.coerce(raw, &item_path) {
                    Ok(v) => {
                        inner.validate(&v, &item_path, errors);
                        items.push(v);
                    }
                    Err(e) => errors.add(e),
                }
            }
            Value::Array(items)
        }
        schema => {
            let key = crate::binding::dotted_to_bracket(path);
            match request.query_map().get(&key) {
                Some(raw) => match schema.coerce(raw, path) {
                    Ok(v) => {
                        schema.validate(&v, path, errors);
                        v
                    }
                    Err(e) => {
                        errors.add(e);
                        Value::Null
                    }
                },
                None => {
                    if !binding.optional {
                        errors.add(FieldError::required(path));
                    }
                    Value::Null
                }
            }
        }
    }
}

/// Convert and validate one body-bound parameter against the parsed payload,
/// narrowed to its sub-path when given. Errors land in the body accumulator.
fn materialize_body(
    parsed: &ParsedBody,
    binding: &ParameterBinding,
    sub_path: Option<&str>,
    errors: &mut ValidationErrors,
) -> Value {
    let base = sub_path.unwrap_or("");
    let target = if base.is_empty() {
        Some(&parsed.root)
    } else {
        parsed.field(base)
    };

    match target {
        Some(value) if !value.is_null() => {
            let value = binding.schema.coerce_value(value.clone());
            // A whole-payload object validates at the root so field errors
            // carry bare field paths
            let type_path = if base.is_empty() {
                binding.name.as_str()
            } else {
                base
            };
            match &binding.schema {
                ValueSchema::Object(_) if value.is_object() => {
                    binding.schema.validate(&value, base, errors);
                }
                ValueSchema::Object(_) => {
                    errors.add(FieldError::invalid_type(type_path, "object"));
                }
                schema => schema.validate(&value, type_path, errors),
            }
            value
        }
        _ => {
            if !binding.optional {
                report_missing_body(binding, base, errors);
            }
            Value::Null
        }
    }
}

/// Record Required errors for an absent body value: object schemas report
/// each required field, everything else reports the parameter itself.
fn report_missing_body(binding: &ParameterBinding, base: &str, errors: &mut ValidationErrors) {
    match &binding.schema {
        ValueSchema::Object(fields) => {
            for field in fields.iter().filter(|f| f.required) {
                errors.add(FieldError::required(join_path(base, &field.name)));
            }
        }
        _ => {
            let path = if base.is_empty() {
                binding.name.as_str()
            } else {
                base
            };
            errors.add(FieldError::required(path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{HandlerRef, ParamSpec};
    use crate::schema::FieldSchema;
    use crate::validation::ValidationCode;
    use crate::ServiceMap;
    use serde_json::json;

    fn trace_init() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn handler() -> HandlerRef {
        HandlerRef::new("TestController", "handle")
    }

    fn users_detail() -> RouteDefinition {
        RouteDefinition::new("user-detail", Method::Get, "/users/:id", handler()).with_param(
            ParamSpec::value(
                "id",
                ValueSchema::Int {
                    min: Some(1),
                    max: None,
                },
            ),
        )
    }

    #[test]
    fn test_exact_match_method_and_path() {
        trace_init();
        let mut router = Router::new();
        router
            .add_route(RouteDefinition::new(
                "users-list",
                Method::Get,
                "/users",
                handler(),
            ))
            .unwrap();

        assert!(router.resolve(Method::Get, "/users").is_some());
        assert!(router.resolve(Method::Post, "/users").is_none());
        assert!(router.resolve(Method::Get, "/users/").is_none());
        assert!(router.resolve(Method::Get, "/other").is_none());
    }

    #[test]
    fn test_unmatched_is_none_not_error() {
        let router = Router::new();
        assert!(router.resolve(Method::Get, "/anything").is_none());
    }

    #[test]
    fn test_registration_order_wins() {
        let mut router = Router::new();
        router
            .add_route(RouteDefinition::new(
                "first",
                Method::Get,
                "/items/:id",
                handler(),
            ))
            .unwrap();
        router
            .add_route(RouteDefinition::new(
                "second",
                Method::Get,
                "/items/:key",
                handler(),
            ))
            .unwrap();

        let resolved = router.resolve(Method::Get, "/items/42").unwrap();
        assert_eq!(resolved.definition().name(), "first");
    }

    #[test]
    fn test_adding_route_rebuilds_table() {
        let mut router = Router::new();
        router
            .add_route(RouteDefinition::new(
                "a",
                Method::Get,
                "/a",
                handler(),
            ))
            .unwrap();
        assert!(router.resolve(Method::Get, "/a").is_some());
        assert!(router.resolve(Method::Get, "/b").is_none());

        router
            .add_route(RouteDefinition::new(
                "b",
                Method::Get,
                "/b",
                handler(),
            ))
            .unwrap();
        assert!(router.resolve(Method::Get, "/b").is_some());
    }

    #[test]
    fn test_malformed_template_fails_registration() {
        let mut router = Router::new();
        let err = router
            .add_route(RouteDefinition::new("bad", Method::Get, "/x/:", handler()))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(router.routes().is_empty());
    }

    #[test]
    fn test_path_captures_decoded_in_order() {
        let mut router = Router::new();
        router
            .add_route(RouteDefinition::new(
                "post-detail",
                Method::Get,
                "/users/:user_id/posts/:post_id",
                handler(),
            ))
            .unwrap();

        let resolved = router
            .resolve(Method::Get, "/users/ann%20b/posts/42")
            .unwrap();
        assert_eq!(resolved.path_values(), ["ann b", "42"]);
        assert_eq!(resolved.path_value("post_id"), Some("42"));
    }

    #[tokio::test]
    async fn test_path_param_converts_and_validates() {
        let mut router = Router::new();
        router.add_route(users_detail()).unwrap();
        let services = ServiceMap::new();

        let resolved = router.resolve(Method::Get, "/users/42").unwrap();
        assert!(!resolved.is_async());
        let args = resolved
            .materialize(&RouteRequest::get("/users/42"), &services)
            .await
            .unwrap();
        assert_eq!(args[0].as_value(), Some(&json!(42)));
    }

    #[tokio::test]
    async fn test_path_param_conversion_failure() {
        let mut router = Router::new();
        router.add_route(users_detail()).unwrap();
        let services = ServiceMap::new();

        let resolved = router.resolve(Method::Get, "/users/abc").unwrap();
        let err = resolved
            .materialize(&RouteRequest::get("/users/abc"), &services)
            .await
            .unwrap_err();
        let Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors[0].path, "id");
        assert_eq!(errors.errors[0].code, ValidationCode::InvalidType);
    }

    #[tokio::test]
    async fn test_query_object_param_field_errors() {
        let mut router = Router::new();
        router
            .add_route(
                RouteDefinition::new("search", Method::Get, "/search", handler()).with_param(
                    ParamSpec::query(
                        "value",
                        ValueSchema::Object(vec![
                            FieldSchema::required(
                                "a",
                                ValueSchema::String {
                                    min_length: Some(2),
                                    max_length: None,
                                },
                            ),
                            FieldSchema::optional("b", ValueSchema::int()),
                        ]),
                    ),
                ),
            )
            .unwrap();
        let services = ServiceMap::new();

        // Valid: bracket keys expand per field
        let req = RouteRequest::get("/search?value[a]=hi&value[b]=3");
        let args = router
            .resolve_request(&req)
            .unwrap()
            .materialize(&req, &services)
            .await
            .unwrap();
        assert_eq!(args[0].as_value(), Some(&json!({"a": "hi", "b": 3})));

        // Errors carry dotted paths
        let req = RouteRequest::get("/search?value[a]=x&value[b]=nope");
        let err = router
            .resolve_request(&req)
            .unwrap()
            .materialize(&req, &services)
            .await
            .unwrap_err();
        let Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let paths: Vec<_> = errors.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"value.a"));
        assert!(paths.contains(&"value.b"));
    }

    #[tokio::test]
    async fn test_whole_query_object_binding() {
        let mut router = Router::new();
        router
            .add_route(
                RouteDefinition::new("raw", Method::Get, "/raw", handler())
                    .with_param(ParamSpec::query("q", ValueSchema::Any).with_path("")),
            )
            .unwrap();
        let services = ServiceMap::new();

        let req = RouteRequest::get("/raw?a=1&b=two");
        let args = router
            .resolve_request(&req)
            .unwrap()
            .materialize(&req, &services)
            .await
            .unwrap();
        assert_eq!(args[0].as_value(), Some(&json!({"a": "1", "b": "two"})));
    }

    #[tokio::test]
    async fn test_optional_query_param_missing_is_null() {
        let mut router = Router::new();
        router
            .add_route(
                RouteDefinition::new("list", Method::Get, "/list", handler())
                    .with_param(ParamSpec::query("page", ValueSchema::int()).optional()),
            )
            .unwrap();
        let services = ServiceMap::new();

        let req = RouteRequest::get("/list");
        let args = router
            .resolve_request(&req)
            .unwrap()
            .materialize(&req, &services)
            .await
            .unwrap();
        assert_eq!(args[0].as_value(), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_query_array_collects_repeated_keys() {
        let mut router = Router::new();
        router
            .add_route(
                RouteDefinition::new("tagged", Method::Get, "/tagged", handler()).with_param(
                    ParamSpec::query("tag", ValueSchema::Array(Box::new(ValueSchema::int()))),
                ),
            )
            .unwrap();
        let services = ServiceMap::new();

        let req = RouteRequest::get("/tagged?tag=1&tag=2&tag=3");
        let args = router
            .resolve_request(&req)
            .unwrap()
            .materialize(&req, &services)
            .await
            .unwrap();
        assert_eq!(args[0].as_value(), Some(&json!([1, 2, 3])));
    }

    #[tokio::test]
    async fn test_body_param_validates_fields() {
        let mut router = Router::new();
        router
            .add_route(
                RouteDefinition::new("create-item", Method::Post, "/items", handler()).with_param(
                    ParamSpec::body(
                        "payload",
                        ValueSchema::Object(vec![FieldSchema::required(
                            "name",
                            ValueSchema::String {
                                min_length: Some(3),
                                max_length: None,
                            },
                        )]),
                    ),
                ),
            )
            .unwrap();
        let services = ServiceMap::new();

        let post = |body: &str| {
            let mut headers = std::collections::HashMap::new();
            headers.insert(
                "content-type".to_string(),
                "application/json".to_string(),
            );
            RouteRequest::new(
                Method::Post,
                "/items",
                headers,
                Some(hyper::body::Bytes::copy_from_slice(body.as_bytes())),
            )
        };

        // Too short: minLength error at the bare field path
        let req = post(r#"{"name": "ab"}"#);
        let resolved = router.resolve_request(&req).unwrap();
        assert!(resolved.is_async());
        let err = resolved.materialize(&req, &services).await.unwrap_err();
        let Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.errors[0].path, "name");
        assert_eq!(errors.errors[0].code, ValidationCode::TooShort);

        // Long enough: the typed object comes through
        let req = post(r#"{"name": "abcd"}"#);
        let args = router
            .resolve_request(&req)
            .unwrap()
            .materialize(&req, &services)
            .await
            .unwrap();
        assert_eq!(args[0].as_value(), Some(&json!({"name": "abcd"})));
    }

    #[tokio::test]
    async fn test_body_sub_path_narrowing() {
        let mut router = Router::new();
        router
            .add_route(
                RouteDefinition::new("nested", Method::Post, "/nested", handler()).with_param(
                    ParamSpec::body("city", ValueSchema::string()).with_path("address.city"),
                ),
            )
            .unwrap();
        let services = ServiceMap::new();

        let mut headers = std::collections::HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let req = RouteRequest::new(
            Method::Post,
            "/nested",
            headers,
            Some(hyper::body::Bytes::from_static(
                br#"{"address": {"city": "Oslo"}}"#,
            )),
        );

        let args = router
            .resolve_request(&req)
            .unwrap()
            .materialize(&req, &services)
            .await
            .unwrap();
        assert_eq!(args[0].as_value(), Some(&json!("Oslo")));
    }

    #[tokio::test]
    async fn test_error_sink_consumes_errors() {
        let mut router = Router::new();
        router
            .add_route(
                RouteDefinition::new("lenient", Method::Get, "/users/:id", handler())
                    .with_param(ParamSpec::value("id", ValueSchema::int()))
                    .with_param(ParamSpec::error_sink("errors")),
            )
            .unwrap();
        let services = ServiceMap::new();

        // Invalid path input never raises; the sink holds the errors
        let req = RouteRequest::get("/users/abc");
        let args = router
            .resolve_request(&req)
            .unwrap()
            .materialize(&req, &services)
            .await
            .unwrap();
        let sink = args[1].as_errors().unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.errors[0].path, "id");

        // Valid input leaves the sink empty
        let req = RouteRequest::get("/users/42");
        let args = router
            .resolve_request(&req)
            .unwrap()
            .materialize(&req, &services)
            .await
            .unwrap();
        assert!(args[1].as_errors().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_injected_param_resolution() {
        struct Mailer {
            from: &'static str,
        }

        let mut router = Router::new();
        router
            .add_route(
                RouteDefinition::new("notify", Method::Post, "/notify", handler())
                    .with_param(ParamSpec::service("mailer", "mailer")),
            )
            .unwrap();

        let services = ServiceMap::new();
        services.register("mailer", Mailer { from: "noreply" });

        let req = RouteRequest::new(
            Method::Post,
            "/notify",
            std::collections::HashMap::new(),
            None,
        );
        let args = router
            .resolve_request(&req)
            .unwrap()
            .materialize(&req, &services)
            .await
            .unwrap();
        let mailer = args[0]
            .as_service()
            .unwrap()
            .clone()
            .downcast::<Mailer>()
            .unwrap();
        assert_eq!(mailer.from, "noreply");
    }

    #[tokio::test]
    async fn test_missing_service_fails() {
        let mut router = Router::new();
        router
            .add_route(
                RouteDefinition::new("notify", Method::Post, "/notify", handler())
                    .with_param(ParamSpec::service("mailer", "mailer")),
            )
            .unwrap();
        let services = ServiceMap::new();

        let req = RouteRequest::new(
            Method::Post,
            "/notify",
            std::collections::HashMap::new(),
            None,
        );
        let err = router
            .resolve_request(&req)
            .unwrap()
            .materialize(&req, &services)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ServiceNotFound { key } if key == "mailer"));
    }

    #[test]
    fn test_base_path_applies_to_matching() {
        let mut router = Router::new();
        router
            .add_route(
                RouteDefinition::new("versioned", Method::Get, "/users/:id", handler())
                    .with_base_path("/api/v1"),
            )
            .unwrap();

        assert!(router.resolve(Method::Get, "/api/v1/users/7").is_some());
        assert!(router.resolve(Method::Get, "/users/7").is_none());
    }

    #[test]
    fn test_param_pattern_override_rejects_nonmatching() {
        let mut router = Router::new();
        router
            .add_route(
                RouteDefinition::new("numeric", Method::Get, "/users/:id", handler())
                    .with_param_pattern("id", "[0-9]+"),
            )
            .unwrap();

        assert!(router.resolve(Method::Get, "/users/42").is_some());
        assert!(router.resolve(Method::Get, "/users/abc").is_none());
    }

    #[test]
    fn test_query_ignored_during_matching() {
        let mut router = Router::new();
        router
            .add_route(RouteDefinition::new("list", Method::Get, "/list", handler()))
            .unwrap();
        assert!(router.resolve(Method::Get, "/list?page=2").is_some());
    }
}
