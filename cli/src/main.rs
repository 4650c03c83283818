#![deny(missing_docs)]

//! # oasgraph CLI
//!
//! Command line front-end over the oasgraph core.
//!
//! Supported Commands:
//! - `operations`: Flattens paths and webhooks into operations.
//! - `encode`: Serializes a parameter value into its wire form.
//! - `anchors`: Resolves a `$dynamicRef` inside a JSON Schema.

use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::error::CliResult;

mod anchors;
mod encode;
mod error;
mod operations;
mod source;

#[derive(Parser, Debug)]
#[clap(author, version, about = "OpenAPI graph and parameter toolkit")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the flattened operations of a document.
    Operations(operations::OperationsArgs),
    /// Encode a parameter value.
    Encode(encode::EncodeArgs),
    /// Resolve a dynamic reference in a JSON Schema.
    Anchors(anchors::AnchorsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("oasgraph=warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Operations(args) => operations::execute(args)?,
        Commands::Encode(args) => encode::execute(args)?,
        Commands::Anchors(args) => anchors::execute(args)?,
    }

    Ok(())
}
