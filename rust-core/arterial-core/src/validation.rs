//! # Validation Errors
//!
//! Structured validation errors accumulated during parameter
//! materialization. Each error carries the dotted access path of the value
//! it refers to (`id`, `value.a`, `address.city`), so callers can map the
//! aggregate straight onto an API error response.

use serde::Serialize;
use std::collections::HashMap;

/// Error code for categorizing validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// Required value is missing
    Required,
    /// Value is not of the declared type
    InvalidType,
    /// Value is too short
    TooShort,
    /// Value is too long
    TooLong,
    /// Value is below minimum
    TooSmall,
    /// Value is above maximum
    TooLarge,
    /// Value doesn't match the expected format
    InvalidFormat,
    /// Custom validation failed
    Custom,
}

/// A single validation error for one access path
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// Dotted access path (e.g., "id", "value.a", "user.address.city")
    pub path: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    pub code: ValidationCode,
}

impl FieldError {
    /// Create a new field error
    pub fn new(path: impl Into<String>, message: impl Into<String>, code: ValidationCode) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code,
        }
    }

    /// Create a "required value" error
    pub fn required(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            message: format!("{path} is required"),
            path,
            code: ValidationCode::Required,
        }
    }

    /// Create an "invalid type" error
    pub fn invalid_type(path: impl Into<String>, expected: &str) -> Self {
        let path = path.into();
        Self {
            message: format!("{path} must be {expected}"),
            path,
            code: ValidationCode::InvalidType,
        }
    }

    /// Create a "too short" error
    pub fn too_short(path: impl Into<String>, min: usize) -> Self {
        let path = path.into();
        Self {
            message: format!("{path} must be at least {min} characters"),
            path,
            code: ValidationCode::TooShort,
        }
    }

    /// Create a "too long" error
    pub fn too_long(path: impl Into<String>, max: usize) -> Self {
        let path = path.into();
        Self {
            message: format!("{path} must be at most {max} characters"),
            path,
            code: ValidationCode::TooLong,
        }
    }

    /// Create a "below minimum" error
    pub fn too_small(path: impl Into<String>, min: i64) -> Self {
        let path = path.into();
        Self {
            message: format!("{path} must be at least {min}"),
            path,
            code: ValidationCode::TooSmall,
        }
    }

    /// Create an "above maximum" error
    pub fn too_large(path: impl Into<String>, max: i64) -> Self {
        let path = path.into();
        Self {
            message: format!("{path} must be at most {max}"),
            path,
            code: ValidationCode::TooLarge,
        }
    }
}

/// Collection of validation errors
///
/// Accumulates every field error for a single dispatch; materialization
/// never stops at the first failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    /// List of field-level errors
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty error collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field error
    pub fn add(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Append every error from another collection
    pub fn merge(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Convert to JSON response body
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"errors":[]}"#.to_string())
    }

    /// Group errors by access path
    #[must_use]
    pub fn by_path(&self) -> HashMap<String, Vec<&FieldError>> {
        let mut map: HashMap<String, Vec<&FieldError>> = HashMap::new();
        for error in &self.errors {
            map.entry(error.path.clone()).or_default().push(error);
        }
        map
    }
}
