#![deny(missing_docs)]

//! # oasgraph core
//!
//! Intermediate representation for OpenAPI 3.x and JSON Schema 2020-12 documents:
//! schema graphs with type inference and reference resolution, Path Item
//! resolution across documents, operation flattening and parameter wire encoding.

/// Shared error types.
pub mod error;

/// URI and JSON Pointer helpers shared by the resolvers.
pub mod refs;

/// Schema graph, type inference and `$ref` / `$dynamicRef` resolution.
pub mod schema;

/// Parameter descriptors, styles and wire encoding.
pub mod params;

/// Path Item model, resolution and flattening.
pub mod paths;

/// Whole-document loading.
pub mod document;

/// Multi-document registry.
pub mod registry;

pub use document::ApiDocument;
pub use error::{AppError, AppResult};
pub use params::{
    encode, ParamLocation, ParamStyle, ParameterDescriptor, ParameterEncoding, ParameterPayload,
    WireForm,
};
pub use paths::{
    flatten, merge_parameters, resolve_path_item, Components, ExternalPathItem, ExternalResolver,
    HttpMethod, OperationDescriptor, PathItem, PathMap, ResolutionContext, ResolvedPathItem,
    RouteKind,
};
pub use registry::{DocumentEntry, DocumentRegistry};
pub use schema::{
    infer_types, value_types, DynamicAnchorScope, SchemaGraph, SchemaId, SchemaNode, TypeClassifier,
    TypeSet, ValueShape,
};
