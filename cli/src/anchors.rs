#![deny(missing_docs)]

//! # Anchors Command
//!
//! Builds the dynamic scope of a standalone JSON Schema and resolves one
//! `$dynamicRef` at a chosen node.

use crate::error::{CliError, CliResult};
use oasgraph_core::{AppError, DynamicAnchorScope, SchemaGraph};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Arguments for the anchors command.
#[derive(clap::Args, Debug, Clone)]
pub struct AnchorsArgs {
    /// Path to the JSON Schema (YAML or JSON).
    #[clap(long, env = "OASGRAPH_INPUT")]
    pub input: PathBuf,

    /// JSON Pointer of the node the reference is evaluated at. Defaults to the root.
    #[clap(long, default_value = "")]
    pub pointer: String,

    /// The `$dynamicRef` value, e.g. `#node`.
    #[clap(long)]
    pub dynamic_ref: String,
}

/// Executes the anchors command.
pub fn execute(args: &AnchorsArgs) -> CliResult<()> {
    println!("{}", render(args)?);
    Ok(())
}

/// Resolves the reference and returns the target schema as pretty JSON.
pub fn render(args: &AnchorsArgs) -> CliResult<String> {
    let content = fs::read_to_string(&args.input)?;
    let raw: Value = serde_yaml::from_str(&content)
        .map_err(|e| AppError::Parse(format!("Failed to parse schema: {}", e)))?;
    let graph = SchemaGraph::from_value(&raw)?;
    let root = graph
        .root()
        .ok_or_else(|| CliError::General("Schema document is empty".into()))?;

    let node = if args.pointer.is_empty() {
        root
    } else {
        let pointer = format!("#{}", args.pointer);
        graph.resolve_ref(Some(root), &pointer).ok_or_else(|| {
            CliError::General(format!("No schema at pointer '{}'", args.pointer))
        })?
    };

    let scope = DynamicAnchorScope::build(&graph, root);
    tracing::debug!(depth = scope.stack(node).len(), "dynamic scope at node");
    let target = scope
        .resolve_dynamic_ref(node, &args.dynamic_ref)
        .ok_or_else(|| {
            CliError::General(format!(
                "Dynamic reference '{}' is unresolved at '{}'",
                args.dynamic_ref, args.pointer
            ))
        })?;

    Ok(serde_json::to_string_pretty(&graph.to_value(target))?)
}
