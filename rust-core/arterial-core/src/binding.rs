//! # Parameter Binding
//!
//! Classifies each declared handler parameter into its binding: path
//! capture, query value, body value, injected service or error sink. The
//! classification order is fixed: sink marker, then body hint, then query
//! hint, then path-template match, then injection as the fallback.
//!
//! Query and body access paths are dotted (`filter.name`); query paths map
//! onto bracket-style keys (`filter[name]`) in the wire format.

use crate::error::{Error, Result};
use crate::pattern::CompiledPattern;
use crate::route::{DeclaredType, RouteDefinition, SourceHint};
use crate::schema::ValueSchema;
use serde_json::Value;

/// Where a parameter's value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    /// Path capture at this position
    Path {
        /// Capture index in token order
        index: usize,
    },
    /// Query value at a dotted access path; empty means the whole query
    /// object
    Query {
        /// Dotted access path
        path: String,
    },
    /// Parsed body, optionally narrowed to a dotted sub-path
    Body {
        /// Dotted sub-path into the payload
        path: Option<String>,
    },
    /// Service resolved from the capability provider
    Injected {
        /// Provider lookup key
        key: String,
    },
    /// Receives the accumulated validation errors
    ErrorSink,
}

/// One classified handler parameter
#[derive(Debug, Clone)]
pub struct ParameterBinding {
    /// Parameter name as declared
    pub name: String,
    /// Value source
    pub kind: BindingKind,
    /// Conversion/validation schema (`Any` for sink and injected bindings)
    pub schema: ValueSchema,
    /// Route-level optionality
    pub optional: bool,
}

/// Classified bindings for a whole route
#[derive(Debug, Clone)]
pub(crate) struct RouteBindings {
    /// Bindings in handler argument order
    pub bindings: Vec<ParameterBinding>,
    /// Whether any binding reads the request body
    pub needs_body: bool,
    /// Position of the error sink binding, if declared
    pub sink: Option<usize>,
}

/// Build the bindings for `def` against its compiled pattern.
pub(crate) fn build_bindings(
    def: &RouteDefinition,
    pattern: &CompiledPattern,
) -> Result<RouteBindings> {
    let mut bindings = Vec::with_capacity(def.params().len());
    let mut needs_body = false;
    let mut sink = None;

    for (position, param) in def.params().iter().enumerate() {
        let schema = match &param.ty {
            DeclaredType::Value(schema) => schema.clone(),
            DeclaredType::ErrorSink | DeclaredType::Service(_) => ValueSchema::Any,
        };

        let kind = if matches!(param.ty, DeclaredType::ErrorSink) {
            if sink.replace(position).is_some() {
                return Err(Error::DuplicateErrorSink {
                    route: def.name().to_string(),
                });
            }
            BindingKind::ErrorSink
        } else if let Some(SourceHint::Body(path)) = &param.hint {
            needs_body = true;
            BindingKind::Body { path: path.clone() }
        } else if let Some(SourceHint::Query(path)) = &param.hint {
            BindingKind::Query {
                path: path.clone().unwrap_or_else(|| param.name.clone()),
            }
        } else if let Some(index) = pattern.param_index(&param.name) {
            BindingKind::Path { index }
        } else {
            let key = match &param.ty {
                DeclaredType::Service(key) => key.clone(),
                _ => param.name.clone(),
            };
            BindingKind::Injected { key }
        };

        bindings.push(ParameterBinding {
            name: param.name.clone(),
            kind,
            schema,
            optional: param.optional,
        });
    }

    Ok(RouteBindings {
        bindings,
        needs_body,
        sink,
    })
}

/// Convert a dotted access path to its bracketed query-key form:
/// `a.b.c` → `a[b][c]`.
#[must_use]
pub fn dotted_to_bracket(path: &str) -> String {
    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return String::new();
    };
    let mut key = first.to_string();
    for segment in segments {
        key.push('[');
        key.push_str(segment);
        key.push(']');
    }
    key
}

/// Traverse a JSON value along a dotted path. Numeric segments index into
/// arrays.
#[must_use]
pub(crate) fn lookup_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
