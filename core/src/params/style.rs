#![deny(missing_docs)]

//! # Parameter Styles
//!
//! Locations, styles and the default/validation rules tying them together
//! (OAS 3.2 "Style Values" and "Style Examples").

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a parameter travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    /// Templated path segment.
    Path,
    /// Individual query parameter.
    Query,
    /// The whole query string (OAS 3.2).
    #[serde(rename = "querystring")]
    QueryString,
    /// Request header.
    Header,
    /// Cookie header entry.
    Cookie,
}

impl ParamLocation {
    /// The `in` value of this location.
    pub fn as_str(self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::QueryString => "querystring",
            ParamLocation::Header => "header",
            ParamLocation::Cookie => "cookie",
        }
    }

    /// Style used when a parameter declares none.
    pub fn default_style(self) -> ParamStyle {
        match self {
            ParamLocation::Path | ParamLocation::Header => ParamStyle::Simple,
            ParamLocation::Query | ParamLocation::QueryString | ParamLocation::Cookie => {
                ParamStyle::Form
            }
        }
    }

    /// Styles a parameter at this location may declare.
    pub fn allowed_styles(self) -> &'static [ParamStyle] {
        match self {
            ParamLocation::Path => &[ParamStyle::Matrix, ParamStyle::Label, ParamStyle::Simple],
            ParamLocation::Query | ParamLocation::QueryString => &[
                ParamStyle::Form,
                ParamStyle::SpaceDelimited,
                ParamStyle::PipeDelimited,
                ParamStyle::DeepObject,
            ],
            ParamLocation::Header => &[ParamStyle::Simple],
            ParamLocation::Cookie => &[ParamStyle::Form, ParamStyle::Cookie],
        }
    }
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamLocation {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path" => Ok(ParamLocation::Path),
            "query" => Ok(ParamLocation::Query),
            "querystring" => Ok(ParamLocation::QueryString),
            "header" => Ok(ParamLocation::Header),
            "cookie" => Ok(ParamLocation::Cookie),
            other => Err(AppError::Parse(format!(
                "Unknown parameter location '{}'",
                other
            ))),
        }
    }
}

/// Serialization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamStyle {
    /// `matrix` (RFC 6570 path-style `;`)
    Matrix,
    /// `label` (RFC 6570 `.`)
    Label,
    /// `form` (RFC 6570 `?` / `&`)
    Form,
    /// `simple` (RFC 6570 `{var}`)
    Simple,
    /// `spaceDelimited`
    SpaceDelimited,
    /// `pipeDelimited`
    PipeDelimited,
    /// `deepObject`
    DeepObject,
    /// `cookie` (OAS 3.2)
    Cookie,
}

impl ParamStyle {
    /// Every style, in vocabulary order.
    pub const ALL: [ParamStyle; 8] = [
        ParamStyle::Simple,
        ParamStyle::Form,
        ParamStyle::Matrix,
        ParamStyle::Label,
        ParamStyle::SpaceDelimited,
        ParamStyle::PipeDelimited,
        ParamStyle::DeepObject,
        ParamStyle::Cookie,
    ];

    /// The `style` keyword value.
    pub fn as_str(self) -> &'static str {
        match self {
            ParamStyle::Matrix => "matrix",
            ParamStyle::Label => "label",
            ParamStyle::Form => "form",
            ParamStyle::Simple => "simple",
            ParamStyle::SpaceDelimited => "spaceDelimited",
            ParamStyle::PipeDelimited => "pipeDelimited",
            ParamStyle::DeepObject => "deepObject",
            ParamStyle::Cookie => "cookie",
        }
    }

    /// `explode` used when a parameter declares none: true for `form` and `cookie`.
    pub fn default_explode(self) -> bool {
        matches!(self, ParamStyle::Form | ParamStyle::Cookie)
    }
}

impl fmt::Display for ParamStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamStyle {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamStyle::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| AppError::Parse(format!("Unknown parameter style '{}'", s)))
    }
}

/// Resolves the effective style.
pub fn resolve_style(explicit: Option<ParamStyle>, location: ParamLocation) -> ParamStyle {
    explicit.unwrap_or_else(|| location.default_style())
}

/// Resolves the effective explode flag for an already resolved style.
pub fn resolve_explode(explicit: Option<bool>, style: ParamStyle) -> bool {
    explicit.unwrap_or_else(|| style.default_explode())
}

/// Rejects styles the location does not define.
pub fn validate_style_for_location(
    name: &str,
    location: ParamLocation,
    style: ParamStyle,
) -> AppResult<()> {
    let allowed = location.allowed_styles();
    if allowed.contains(&style) {
        return Ok(());
    }
    let names: Vec<&str> = allowed.iter().map(|s| s.as_str()).collect();
    Err(AppError::invalid_parameter(
        name,
        format!(
            "style '{}' is not allowed for {} parameters. Allowed styles: {}",
            style,
            location,
            names.join(", ")
        ),
    ))
}

/// Rejects `spaceDelimited` / `pipeDelimited` combined with `explode = true`.
pub fn validate_explode_for_style(name: &str, style: ParamStyle, explode: bool) -> AppResult<()> {
    if explode && matches!(style, ParamStyle::SpaceDelimited | ParamStyle::PipeDelimited) {
        return Err(AppError::invalid_parameter(
            name,
            format!("style '{}' cannot be combined with explode=true", style),
        ));
    }
    Ok(())
}
