//! # Route Definitions
//!
//! The immutable identity record for one route: HTTP method, path template,
//! handler reference, declared handler parameters and introspection
//! metadata. Definitions are plain values produced by the surrounding
//! framework's registration step; the router owns them once added and never
//! mutates them.

use crate::schema::ValueSchema;
use std::collections::HashMap;

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP HEAD
    Head,
    /// HTTP OPTIONS
    Options,
}

impl Method {
    /// Parse a method name case-insensitively
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

/// Opaque reference to the handler a matched route dispatches to.
///
/// The router never calls the handler; it only hands this reference back as
/// part of the resolved invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRef {
    /// Controller or service identifier
    pub target: String,
    /// Method name on the target
    pub method: String,
}

impl HandlerRef {
    /// Create a handler reference
    pub fn new(target: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method: method.into(),
        }
    }
}

/// Free-form route metadata, carried for introspection only
#[derive(Debug, Clone, Default)]
pub struct RouteMetadata {
    /// Human-readable description
    pub description: Option<String>,
    /// Grouping category
    pub category: Option<String>,
    /// Arbitrary tags
    pub tags: Vec<String>,
}

/// Binding hint supplied by the registration layer for one handler parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceHint {
    /// Bind from the parsed request body, optionally narrowed to a dotted
    /// sub-path
    Body(Option<String>),
    /// Bind from the query string; `None` defaults to the parameter's own
    /// name, `Some("")` means the whole query object
    Query(Option<String>),
}

/// Declared type of one handler parameter
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    /// A request-derived value with its conversion/validation schema
    Value(ValueSchema),
    /// Marker type: the parameter receives the accumulated validation
    /// errors instead of the route failing on them
    ErrorSink,
    /// A service resolved from the capability provider under this key
    Service(String),
}

/// One declared handler parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name as declared on the handler
    pub name: String,
    /// Declared type
    pub ty: DeclaredType,
    /// Binding hint from the registration layer, if any
    pub hint: Option<SourceHint>,
    /// Route-level optionality; may relax the schema's requirements but
    /// never tighten them
    pub optional: bool,
}

impl ParamSpec {
    /// A required value parameter with no binding hint
    pub fn value(name: impl Into<String>, schema: ValueSchema) -> Self {
        Self {
            name: name.into(),
            ty: DeclaredType::Value(schema),
            hint: None,
            optional: false,
        }
    }

    /// A query-bound parameter using its own name as access path
    pub fn query(name: impl Into<String>, schema: ValueSchema) -> Self {
        Self {
            name: name.into(),
            ty: DeclaredType::Value(schema),
            hint: Some(SourceHint::Query(None)),
            optional: false,
        }
    }

    /// A body-bound parameter receiving the whole payload
    pub fn body(name: impl Into<String>, schema: ValueSchema) -> Self {
        Self {
            name: name.into(),
            ty: DeclaredType::Value(schema),
            hint: Some(SourceHint::Body(None)),
            optional: false,
        }
    }

    /// The validation-error-sink parameter
    pub fn error_sink(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: DeclaredType::ErrorSink,
            hint: None,
            optional: false,
        }
    }

    /// An injected service parameter
    pub fn service(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: DeclaredType::Service(key.into()),
            hint: None,
            optional: false,
        }
    }

    /// Override the binding hint's access path
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.hint = match self.hint {
            Some(SourceHint::Body(_)) => Some(SourceHint::Body(Some(path.into()))),
            Some(SourceHint::Query(_)) | None => Some(SourceHint::Query(Some(path.into()))),
        };
        self
    }

    /// Mark the parameter optional
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Immutable identity record for one route
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    name: String,
    method: Method,
    path: String,
    base_path: Option<String>,
    handler: HandlerRef,
    param_patterns: HashMap<String, String>,
    params: Vec<ParamSpec>,
    metadata: RouteMetadata,
}

impl RouteDefinition {
    /// Create a definition for `method` + `path` dispatching to `handler`.
    ///
    /// `name` must be unique within a registry for URL resolution to be
    /// deterministic; on duplicates the last-registered route wins.
    pub fn new(
        name: impl Into<String>,
        method: Method,
        path: impl Into<String>,
        handler: HandlerRef,
    ) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            base_path: None,
            handler,
            param_patterns: HashMap::new(),
            params: Vec::new(),
            metadata: RouteMetadata::default(),
        }
    }

    /// Prefix the template with a controller-level base path
    #[must_use]
    pub fn with_base_path(mut self, base: impl Into<String>) -> Self {
        self.base_path = Some(base.into());
        self
    }

    /// Override the regex fragment for one path parameter
    #[must_use]
    pub fn with_param_pattern(
        mut self,
        name: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        self.param_patterns.insert(name.into(), fragment.into());
        self
    }

    /// Declare a handler parameter; declaration order is argument order
    #[must_use]
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Attach introspection metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: RouteMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Route name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// HTTP method
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Path template as declared (base path excluded)
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full template: base path joined with the declared path
    #[must_use]
    pub fn full_path(&self) -> String {
        match &self.base_path {
            None => self.path.clone(),
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = self.path.trim_start_matches('/');
                format!("{base}/{path}")
            }
        }
    }

    /// Handler reference
    #[must_use]
    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// Per-parameter regex overrides
    #[must_use]
    pub fn param_patterns(&self) -> &HashMap<String, String> {
        &self.param_patterns
    }

    /// Declared handler parameters in argument order
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Introspection metadata
    #[must_use]
    pub fn metadata(&self) -> &RouteMetadata {
        &self.metadata
    }
}
