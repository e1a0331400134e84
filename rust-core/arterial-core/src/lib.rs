//! # Arterial Core
//!
//! Compiled request routing for the Arterial framework.
//! Turns declarative route definitions into matchers, resolves inbound
//! requests into ready-to-call argument lists, and reconstructs URLs from
//! route names.
//!
//! ## Architecture
//!
//! The surrounding framework registers plain [`RouteDefinition`] values;
//! this crate never inspects annotations or controllers itself. Dispatch is
//! strict registration order, first match wins. The only asynchronous step
//! in a dispatch is body parsing.
//!
//! ## Modules
//!
//! - `router` - Route registry, first-match dispatcher, cached dispatch table
//! - `route` - Route definitions, methods, handler references
//! - `pattern` - Path template compilation and expansion
//! - `binding` - Handler parameter classification
//! - `schema` - Declared value types, conversion and validation
//! - `request` - Inbound request representation and hyper ingestion
//! - `body` - JSON / form / multipart body normalization
//! - `provider` - Capability provider for injected parameters
//! - `url` - URL generation from route names
//! - `validation` - Structured validation errors
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod binding;
pub mod body;
pub mod error;
pub mod pattern;
pub mod provider;
pub mod request;
pub mod route;
pub mod router;
pub mod schema;
pub mod validation;

mod url;

pub use binding::{dotted_to_bracket, BindingKind, ParameterBinding};
pub use body::{parse_body, BodyParseConfig, ParsedBody, UploadedFile};
pub use error::{Error, Result};
pub use pattern::CompiledPattern;
pub use provider::{ServiceMap, ServiceProvider, ServiceRef};
pub use request::RouteRequest;
pub use route::{
    DeclaredType, HandlerRef, Method, ParamSpec, RouteDefinition, RouteMetadata, SourceHint,
};
pub use router::{CompiledRoute, HandlerArg, ResolvedInvocation, Router};
pub use schema::{FieldSchema, ValueSchema};
pub use validation::{FieldError, ValidationCode, ValidationErrors};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
