#![deny(missing_docs)]

//! # Encode Command
//!
//! Serializes one parameter value into its wire form.

use crate::error::CliResult;
use oasgraph_core::{ParamLocation, ParamStyle, ParameterEncoding, ValueShape};
use serde_json::Value;

/// Arguments for the encode command.
#[derive(clap::Args, Debug, Clone)]
pub struct EncodeArgs {
    /// Parameter location (path, query, querystring, header, cookie).
    #[clap(long, env = "OASGRAPH_LOCATION")]
    pub location: ParamLocation,

    /// Serialization style; the location default when omitted.
    #[clap(long, env = "OASGRAPH_STYLE")]
    pub style: Option<ParamStyle>,

    /// Explode flag; the style default when omitted.
    #[clap(long, env = "OASGRAPH_EXPLODE")]
    pub explode: Option<bool>,

    /// Keep RFC 3986 reserved characters unescaped.
    #[clap(long, env = "OASGRAPH_ALLOW_RESERVED")]
    pub allow_reserved: bool,

    /// Parameter name.
    #[clap(long)]
    pub name: String,

    /// JSON value to encode. Text that is not JSON is taken as a string.
    #[clap(long)]
    pub value: String,
}

/// Executes the encode command.
pub fn execute(args: &EncodeArgs) -> CliResult<()> {
    println!("{}", render(args)?);
    Ok(())
}

/// Encodes the value and returns the wire text.
pub fn render(args: &EncodeArgs) -> CliResult<String> {
    let value: Value =
        serde_json::from_str(&args.value).unwrap_or_else(|_| Value::String(args.value.clone()));

    let mut encoding =
        ParameterEncoding::new(args.location).with_allow_reserved(args.allow_reserved);
    if let Some(style) = args.style {
        encoding = encoding.with_style(style);
    }
    if let Some(explode) = args.explode {
        encoding = encoding.with_explode(explode);
    }

    let wire = encoding.encode(&args.name, ValueShape::of_value(&value), &value)?;
    Ok(wire.text)
}
