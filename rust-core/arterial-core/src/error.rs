//! # Error Handling
//!
//! Centralized error types for the Arterial routing core.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Configuration errors (`InvalidRoutePattern`, `DuplicateParameter`,
//! `DuplicateErrorSink`) are raised when a route is registered and are fatal
//! to that registration. `Validation` is raised per dispatch and is meant to
//! be mapped to a 4xx response by the caller. A request that matches no route
//! is not an error at all; `Router::resolve` returns `None` for it.

use crate::validation::ValidationErrors;
use thiserror::Error;

/// Result type alias for Arterial operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Arterial router
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid route path template
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid template
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// The same parameter name appears twice in one path template
    #[error("Duplicate parameter ':{name}' in route pattern: {pattern}")]
    DuplicateParameter {
        /// The offending template
        pattern: String,
        /// The repeated parameter name
        name: String,
    },

    /// A route declared more than one validation-error-sink parameter
    #[error("Route '{route}' declares more than one error sink parameter")]
    DuplicateErrorSink {
        /// Name of the offending route
        route: String,
    },

    /// URL resolution was asked for a name no route is registered under
    #[error("No route registered under name: {name}")]
    RouteNotFound {
        /// The unknown route name
        name: String,
    },

    /// URL resolution is missing a value for a path parameter
    #[error("Missing value for path parameter ':{name}' in template: {template}")]
    MissingParameter {
        /// The parameter without a value
        name: String,
        /// The template being expanded
        template: String,
    },

    /// Parameter conversion or validation failed during dispatch
    #[error("Validation failed with {} error(s)", .0.len())]
    Validation(ValidationErrors),

    /// An injected parameter could not be resolved from the capability provider
    #[error("No service registered for key: {key}")]
    ServiceNotFound {
        /// The unresolved service key
        key: String,
    },

    /// Request body could not be parsed into a field mapping
    #[error("Malformed request body: {reason}")]
    MalformedBody {
        /// Parser error detail
        reason: String,
    },

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes, received={actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Actual size
        actual: usize,
    },

    /// HTTP protocol error while ingesting a request
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a route configuration problem (registration-fatal)
    /// rather than a per-request failure.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidRoutePattern { .. }
                | Self::DuplicateParameter { .. }
                | Self::DuplicateErrorSink { .. }
        )
    }
}
