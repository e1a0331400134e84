//! # URL Generation
//!
//! Reconstructs literal URLs from route names and parameter values: path
//! tokens are substituted with percent-encoded string forms, then a query
//! string is appended from every query-bound parameter with a defined
//! value. Undefined (absent or null) values are omitted entirely, never
//! serialized as empty. Class-typed values flatten field-by-field with the
//! same dotted-to-bracket convention validation uses; arrays repeat their
//! single key.

use crate::binding::{dotted_to_bracket, BindingKind};
use crate::error::Result;
use crate::router::CompiledRoute;
use serde_json::Value;
use std::collections::HashMap;

/// Build the URL for a compiled route from a name→value mapping.
pub(crate) fn build_url(route: &CompiledRoute, params: &HashMap<String, Value>) -> Result<String> {
    let mut path_values = HashMap::new();
    for name in route.pattern().param_names() {
        if let Some(value) = params.get(name) {
            path_values.insert(name.clone(), stringify(value));
        }
    }
    let path = route.pattern().expand(&path_values)?;

    let mut pairs: Vec<(String, String)> = Vec::new();
    for binding in route.bindings() {
        let BindingKind::Query { path: access } = &binding.kind else {
            continue;
        };
        let Some(value) = params.get(&binding.name) else {
            continue;
        };
        append_pairs(&mut pairs, &dotted_to_bracket(access), value);
    }

    if pairs.is_empty() {
        return Ok(path);
    }

    let query = pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    Ok(format!("{path}?{query}"))
}

/// The query/path string form of a value: strings verbatim, scalars via
/// their JSON rendering.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten one value into key/value pairs. Objects expand to bracketed
/// keys (recursively), arrays repeat the key per element, null is skipped.
/// An empty key (whole-query binding) puts object fields at the top level.
fn append_pairs(pairs: &mut Vec<(String, String)>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (field, v) in map {
                let sub = if key.is_empty() {
                    field.clone()
                } else {
                    format!("{key}[{field}]")
                };
                append_pairs(pairs, &sub, v);
            }
        }
        Value::Array(items) => {
            for item in items {
                append_pairs(pairs, key, item);
            }
        }
        scalar => {
            if !key.is_empty() {
                pairs.push((key.to_string(), stringify(scalar)));
            }
        }
    }
}
