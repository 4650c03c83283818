#![deny(missing_docs)]

//! # Paths Module
//!
//! Entry point for `paths` and `webhooks`.
//! Orchestrates Model -> Resolution -> Flattening into [`OperationDescriptor`]s.

pub mod flatten;
pub mod model;
pub mod parameters;
pub mod resolve;

pub use flatten::{flatten, merge_parameters};
pub use model::{
    Components, HttpMethod, Operation, OperationDescriptor, Parameter, ParameterOrRef, PathItem,
    PathMap, Reference, RouteKind, Server,
};
pub use resolve::{
    resolve_path_item, ExternalPathItem, ExternalResolver, ParameterOrigin, ResolutionContext,
    ResolvedPathItem,
};
