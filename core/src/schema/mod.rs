#![deny(missing_docs)]

//! # Schema Module
//!
//! - **graph**: the schema arena and traversal helpers.
//! - **loader**: JSON values in, JSON values out.
//! - **inference**: implicit types from constraint keywords.
//! - **dynamic**: `$dynamicAnchor` scopes and `$dynamicRef` resolution.
//! - **resolve**: static `$ref` resolution inside one graph.
//! - **classify**: effective types and value shapes.

pub mod classify;
pub mod dynamic;
pub mod graph;
pub mod inference;
pub mod loader;
pub mod resolve;

pub use classify::{value_types, TypeClassifier, ValueShape};
pub use dynamic::{dynamic_anchor_name, DynamicAnchorResource, DynamicAnchorScope};
pub use graph::{SchemaGraph, SchemaId, SchemaNode, Semantics, TypeSet, Walk};
pub use inference::{infer_types, json_type};
