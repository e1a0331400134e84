//! # Value Schemas
//!
//! Declared parameter types and the conversion/validation service built on
//! them. A [`ValueSchema`] describes what a handler parameter expects; from
//! it the router derives a converter (raw string → typed value) and a
//! validator (typed value → structured errors). `Any` is a passthrough.

use crate::validation::{FieldError, ValidationErrors};
use serde_json::Value;
use std::fmt;

/// Schema for one declared parameter or object field
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSchema {
    /// No conversion, no validation
    Any,
    /// UTF-8 string with optional length bounds
    String {
        /// Minimum length in characters
        min_length: Option<usize>,
        /// Maximum length in characters
        max_length: Option<usize>,
    },
    /// Signed integer with optional bounds
    Int {
        /// Minimum accepted value
        min: Option<i64>,
        /// Maximum accepted value
        max: Option<i64>,
    },
    /// 64-bit float
    Float,
    /// Boolean, accepting "true"/"false", "1"/"0", "yes"/"no" in raw form
    Bool,
    /// Homogeneous array of the inner schema
    Array(Box<ValueSchema>),
    /// Class-typed value with named fields
    Object(Vec<FieldSchema>),
}

/// One field of an [`ValueSchema::Object`]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// Field name
    pub name: String,
    /// Field schema
    pub schema: ValueSchema,
    /// Whether the field must be present
    pub required: bool,
}

impl FieldSchema {
    /// Create a required field
    pub fn required(name: impl Into<String>, schema: ValueSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            required: true,
        }
    }

    /// Create an optional field
    pub fn optional(name: impl Into<String>, schema: ValueSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            required: false,
        }
    }
}

impl ValueSchema {
    /// Unbounded string schema
    #[must_use]
    pub const fn string() -> Self {
        Self::String {
            min_length: None,
            max_length: None,
        }
    }

    /// Unbounded integer schema
    #[must_use]
    pub const fn int() -> Self {
        Self::Int {
            min: None,
            max: None,
        }
    }

    /// Get the type name for error messages
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::String { .. } => "string",
            Self::Int { .. } => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Convert a raw string (path segment or query value) to a typed value.
    ///
    /// Structured schemas (`Array`, `Object`) cannot be produced from a single
    /// raw string; those values arrive pre-shaped from the body parser or from
    /// bracket-expanded query keys.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldError`] at `path` if the raw string does not parse.
    pub fn coerce(&self, raw: &str, path: &str) -> Result<Value, FieldError> {
        match self {
            Self::Any | Self::String { .. } => Ok(Value::String(raw.to_string())),
            Self::Int { .. } => raw
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| FieldError::invalid_type(path, "int")),
            Self::Float => raw
                .parse::<f64>()
                .map(Value::from)
                .map_err(|_| FieldError::invalid_type(path, "float")),
            Self::Bool => match raw.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "no" => Ok(Value::Bool(false)),
                _ => Err(FieldError::invalid_type(path, "bool")),
            },
            Self::Array(_) | Self::Object(_) => {
                Err(FieldError::invalid_type(path, self.type_name()))
            }
        }
    }

    /// Re-coerce an already-materialized value toward this schema.
    ///
    /// Form-encoded bodies deliver every field as a string; a string value
    /// against a scalar schema is given one parse attempt before validation
    /// judges it. Everything else passes through untouched.
    #[must_use]
    pub fn coerce_value(&self, value: Value) -> Value {
        let parsed = match (&value, self) {
            (Value::String(s), Self::Int { .. } | Self::Float | Self::Bool) => {
                self.coerce(s, "").ok()
            }
            _ => None,
        };
        parsed.unwrap_or(value)
    }

    /// Validate a typed value against this schema, appending structured
    /// errors at `path` (dotted for nested object fields). `Null` is treated
    /// as absent; presence requirements are the caller's concern.
    pub fn validate(&self, value: &Value, path: &str, errors: &mut ValidationErrors) {
        if value.is_null() {
            return;
        }
        match self {
            Self::Any => {}
            Self::String {
                min_length,
                max_length,
            } => match value.as_str() {
                Some(s) => {
                    let chars = s.chars().count();
                    if let Some(min) = min_length {
                        if chars < *min {
                            errors.add(FieldError::too_short(path, *min));
                        }
                    }
                    if let Some(max) = max_length {
                        if chars > *max {
                            errors.add(FieldError::too_long(path, *max));
                        }
                    }
                }
                None => errors.add(FieldError::invalid_type(path, "string")),
            },
            Self::Int { min, max } => match value.as_i64() {
                Some(n) => {
                    if let Some(min) = min {
                        if n < *min {
                            errors.add(FieldError::too_small(path, *min));
                        }
                    }
                    if let Some(max) = max {
                        if n > *max {
                            errors.add(FieldError::too_large(path, *max));
                        }
                    }
                }
                None => errors.add(FieldError::invalid_type(path, "int")),
            },
            Self::Float => {
                if value.as_f64().is_none() {
                    errors.add(FieldError::invalid_type(path, "float"));
                }
            }
            Self::Bool => {
                if !value.is_boolean() {
                    errors.add(FieldError::invalid_type(path, "bool"));
                }
            }
            Self::Array(inner) => match value.as_array() {
                Some(items) => {
                    for (i, item) in items.iter().enumerate() {
                        inner.validate(item, &format!("{path}.{i}"), errors);
                    }
                }
                None => errors.add(FieldError::invalid_type(path, "array")),
            },
            Self::Object(fields) => match value.as_object() {
                Some(map) => {
                    for field in fields {
                        let field_path = join_path(path, &field.name);
                        match map.get(&field.name) {
                            Some(v) if !v.is_null() => {
                                field.schema.validate(v, &field_path, errors);
                            }
                            _ if field.required => errors.add(FieldError::required(field_path)),
                            _ => {}
                        }
                    }
                }
                None => errors.add(FieldError::invalid_type(path, "object")),
            },
        }
    }
}

impl fmt::Display for ValueSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Join a base path and a field name with a dot, tolerating an empty base.
pub(crate) fn join_path(base: &str, field: &str) -> String {
    if base.is_empty() {
        field.to_string()
    } else {
        format!("{base}.{field}")
    }
}
