#![deny(missing_docs)]

//! # Operations Command
//!
//! Flattens `paths` and `webhooks` of a document and prints the operations.

use crate::error::CliResult;
use crate::source::{file_uri, register_file, OnDemandResolver};
use oasgraph_core::{ApiDocument, DocumentRegistry, OperationDescriptor};
use std::fs;
use std::path::PathBuf;

/// Output encodings.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty printed JSON.
    Json,
    /// YAML.
    Yaml,
}

/// Arguments for the operations command.
#[derive(clap::Args, Debug, Clone)]
pub struct OperationsArgs {
    /// Path to the OpenAPI document.
    #[clap(long, env = "OASGRAPH_INPUT")]
    pub input: PathBuf,

    /// Output format.
    #[clap(long, value_enum, default_value_t = OutputFormat::Json, env = "OASGRAPH_FORMAT")]
    pub format: OutputFormat,

    /// Additional documents that external references may point to.
    #[clap(long = "registry", env = "OASGRAPH_REGISTRY", value_delimiter = ',')]
    pub registry: Vec<PathBuf>,
}

/// Executes the operations command.
pub fn execute(args: &OperationsArgs) -> CliResult<()> {
    println!("{}", render(args)?);
    Ok(())
}

/// Loads the input, flattens it and renders the result.
pub fn render(args: &OperationsArgs) -> CliResult<String> {
    let operations = collect(args)?;
    let text = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&operations)?,
        OutputFormat::Yaml => serde_yaml::to_string(&operations)?,
    };
    Ok(text)
}

fn collect(args: &OperationsArgs) -> CliResult<Vec<OperationDescriptor>> {
    let mut registry = DocumentRegistry::new();
    for path in &args.registry {
        register_file(&mut registry, path)?;
    }

    let content = fs::read_to_string(&args.input)?;
    let document = ApiDocument::from_yaml_str(&content)?.with_retrieval_uri(file_uri(&args.input)?);

    let resolver = OnDemandResolver::new(registry);
    let operations = document.operations(Some(&resolver))?;
    tracing::info!(
        count = operations.len(),
        documents = resolver.document_count(),
        "flattened document"
    );
    Ok(operations)
}
