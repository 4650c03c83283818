#![deny(missing_docs)]

//! # Parameter Codec
//!
//! Serializes a parameter value into its wire form for a given location, style,
//! explode flag and reserved-character policy.
//!
//! The output is the text a request carries for this parameter:
//! - path: the expansion replacing `{name}` (`;id=5`, `.a.b`, `a,b`).
//! - query / cookie (form): one or more `name=value` pairs joined with `&`.
//! - querystring: the whole query string, without the leading `?`.
//! - header: the header value.
//! - cookie (cookie style): `name=value` pairs joined with `; `.
//!
//! Header values and `cookie`-style values are emitted verbatim. Everything else
//! is percent-encoded, keeping reserved characters when `allowReserved` is set.

use crate::error::{AppError, AppResult};
use crate::params::escape::{escape_allow_reserved, escape_unreserved};
use crate::params::style::{
    resolve_explode, resolve_style, validate_explode_for_style, validate_style_for_location,
    ParamLocation, ParamStyle,
};
use crate::schema::classify::ValueShape;
use serde::Serialize;
use serde_json::Value;

/// Serialization settings of one parameter. Unset fields take their OAS defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterEncoding {
    /// Where the parameter travels.
    pub location: ParamLocation,
    /// Declared style.
    pub style: Option<ParamStyle>,
    /// Declared explode flag.
    pub explode: Option<bool>,
    /// Keep RFC 3986 reserved characters unescaped.
    pub allow_reserved: bool,
}

impl ParameterEncoding {
    /// Encoding with every optional setting left to its default.
    pub fn new(location: ParamLocation) -> Self {
        Self {
            location,
            style: None,
            explode: None,
            allow_reserved: false,
        }
    }

    /// Sets the style.
    pub fn with_style(mut self, style: ParamStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Sets explode.
    pub fn with_explode(mut self, explode: bool) -> Self {
        self.explode = Some(explode);
        self
    }

    /// Sets allowReserved.
    pub fn with_allow_reserved(mut self, allow_reserved: bool) -> Self {
        self.allow_reserved = allow_reserved;
        self
    }

    /// Effective style.
    pub fn resolved_style(&self) -> ParamStyle {
        resolve_style(self.style, self.location)
    }

    /// Effective explode flag.
    pub fn resolved_explode(&self) -> bool {
        resolve_explode(self.explode, self.resolved_style())
    }

    /// Checks the settings on their own, independently of any value.
    pub fn validate(&self, name: &str) -> AppResult<()> {
        let style = self.resolved_style();
        validate_style_for_location(name, self.location, style)?;
        validate_explode_for_style(name, style, self.resolved_explode())
    }

    /// Serializes `value`, interpreted with `shape`. See [`encode`].
    pub fn encode(&self, name: &str, shape: ValueShape, value: &Value) -> AppResult<WireForm> {
        encode(self, shape, name, value)
    }
}

/// A serialized parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireForm {
    /// Where `text` goes.
    pub location: ParamLocation,
    /// The serialized text.
    pub text: String,
}

/// Serializes `value` for the parameter `name`.
///
/// With [`ValueShape::Array`] a non-array value is treated as a one-element array;
/// with [`ValueShape::Object`] the value must be an object (or null). `null` encodes
/// as the empty value of its shape.
///
/// Errors with `InvalidParameterConfiguration` on a style the location does not
/// allow, `spaceDelimited`/`pipeDelimited` with explode, `deepObject` on a
/// non-object and non-string `querystring` values.
pub fn encode(
    encoding: &ParameterEncoding,
    shape: ValueShape,
    name: &str,
    value: &Value,
) -> AppResult<WireForm> {
    encoding.validate(name)?;
    let style = encoding.resolved_style();
    let explode = encoding.resolved_explode();

    if encoding.location == ParamLocation::QueryString {
        return encode_querystring(name, shape, value);
    }
    if style == ParamStyle::DeepObject && shape != ValueShape::Object {
        return Err(AppError::invalid_parameter(
            name,
            "style 'deepObject' requires an object value",
        ));
    }

    let escaper = Escaper::for_parameter(encoding.location, style, encoding.allow_reserved);
    let parts = Parts::collect(name, shape, value, escaper)?;
    let name = escaper.apply(name);

    let text = match style {
        ParamStyle::Simple => simple(&parts, explode),
        ParamStyle::Label => label(&parts, explode),
        ParamStyle::Matrix => matrix(&name, &parts, explode),
        ParamStyle::Form => form(&name, &parts, explode),
        ParamStyle::SpaceDelimited => delimited(&name, &parts, "%20"),
        ParamStyle::PipeDelimited => delimited(&name, &parts, "|"),
        ParamStyle::DeepObject => deep_object(&name, &parts),
        ParamStyle::Cookie => cookie(&name, &parts, explode),
    };

    tracing::trace!(
        parameter = %name,
        location = %encoding.location,
        style = %style,
        explode,
        "encoded parameter"
    );

    Ok(WireForm {
        location: encoding.location,
        text,
    })
}

fn encode_querystring(name: &str, shape: ValueShape, value: &Value) -> AppResult<WireForm> {
    match (shape, value) {
        (ValueShape::Scalar, Value::String(text)) => Ok(WireForm {
            location: ParamLocation::QueryString,
            text: escape_allow_reserved(text),
        }),
        (ValueShape::Scalar, Value::Null) => Ok(WireForm {
            location: ParamLocation::QueryString,
            text: String::new(),
        }),
        _ => Err(AppError::invalid_parameter(
            name,
            "querystring parameters take the whole query string as a single string value",
        )),
    }
}

#[derive(Debug, Clone, Copy)]
enum Escaper {
    Verbatim,
    Unreserved,
    AllowReserved,
}

impl Escaper {
    fn for_parameter(location: ParamLocation, style: ParamStyle, allow_reserved: bool) -> Self {
        if location == ParamLocation::Header || style == ParamStyle::Cookie {
            Escaper::Verbatim
        } else if allow_reserved {
            Escaper::AllowReserved
        } else {
            Escaper::Unreserved
        }
    }

    fn apply(self, raw: &str) -> String {
        match self {
            Escaper::Verbatim => raw.to_string(),
            Escaper::Unreserved => escape_unreserved(raw),
            Escaper::AllowReserved => escape_allow_reserved(raw),
        }
    }
}

/// Escaped members of a value.
enum Parts {
    Scalar(String),
    Array(Vec<String>),
    Object(Vec<(String, String)>),
}

impl Parts {
    fn collect(name: &str, shape: ValueShape, value: &Value, escaper: Escaper) -> AppResult<Self> {
        Ok(match shape {
            ValueShape::Scalar => Parts::Scalar(escaper.apply(&scalar_text(value))),
            ValueShape::Array => {
                let items = match value {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items.iter().map(scalar_text).collect(),
                    other => vec![scalar_text(other)],
                };
                Parts::Array(items.iter().map(|item| escaper.apply(item)).collect())
            }
            ValueShape::Object => {
                let members = match value {
                    Value::Null => Vec::new(),
                    Value::Object(map) => map
                        .iter()
                        .map(|(k, v)| (escaper.apply(k), escaper.apply(&scalar_text(v))))
                        .collect(),
                    _ => {
                        return Err(AppError::invalid_parameter(
                            name,
                            "an object-shaped parameter requires an object value",
                        ))
                    }
                };
                Parts::Object(members)
            }
        })
    }

    fn is_empty(&self) -> bool {
        match self {
            Parts::Scalar(text) => text.is_empty(),
            Parts::Array(items) => items.is_empty(),
            Parts::Object(members) => members.is_empty(),
        }
    }

    /// Members as a flat list: array items, or `k1, v1, k2, v2`.
    fn flat(&self) -> Vec<&str> {
        match self {
            Parts::Scalar(text) => vec![text.as_str()],
            Parts::Array(items) => items.iter().map(String::as_str).collect(),
            Parts::Object(members) => members
                .iter()
                .flat_map(|(k, v)| [k.as_str(), v.as_str()])
                .collect(),
        }
    }

    /// Members as `k=v` pairs.
    fn pairs(members: &[(String, String)]) -> impl Iterator<Item = String> + '_ {
        members.iter().map(|(k, v)| format!("{}={}", k, v))
    }
}

/// Text of a member value. Strings are taken raw, nested structures as compact JSON.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn simple(parts: &Parts, explode: bool) -> String {
    match parts {
        Parts::Object(members) if explode => Parts::pairs(members).collect::<Vec<_>>().join(","),
        _ => parts.flat().join(","),
    }
}

fn label(parts: &Parts, explode: bool) -> String {
    let body = match parts {
        Parts::Array(items) if explode => items.join("."),
        Parts::Object(members) if explode => Parts::pairs(members).collect::<Vec<_>>().join("."),
        _ => parts.flat().join(","),
    };
    format!(".{}", body)
}

fn matrix(name: &str, parts: &Parts, explode: bool) -> String {
    if parts.is_empty() {
        return format!(";{}", name);
    }
    match parts {
        Parts::Array(items) if explode => items.iter().map(|v| format!(";{}={}", name, v)).collect(),
        Parts::Object(members) if explode => Parts::pairs(members).map(|p| format!(";{}", p)).collect(),
        _ => format!(";{}={}", name, parts.flat().join(",")),
    }
}

fn form(name: &str, parts: &Parts, explode: bool) -> String {
    if parts.is_empty() {
        return format!("{}=", name);
    }
    match parts {
        Parts::Array(items) if explode => items
            .iter()
            .map(|v| format!("{}={}", name, v))
            .collect::<Vec<_>>()
            .join("&"),
        Parts::Object(members) if explode => Parts::pairs(members).collect::<Vec<_>>().join("&"),
        _ => format!("{}={}", name, parts.flat().join(",")),
    }
}

fn delimited(name: &str, parts: &Parts, delimiter: &str) -> String {
    format!("{}={}", name, parts.flat().join(delimiter))
}

fn deep_object(name: &str, parts: &Parts) -> String {
    let Parts::Object(members) = parts else {
        return String::new();
    };
    members
        .iter()
        .map(|(k, v)| format!("{}[{}]={}", name, k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn cookie(name: &str, parts: &Parts, explode: bool) -> String {
    match parts {
        Parts::Array(items) if explode && !items.is_empty() => items
            .iter()
            .map(|v| format!("{}={}", name, v))
            .collect::<Vec<_>>()
            .join("; "),
        Parts::Object(members) if explode && !members.is_empty() => {
            Parts::pairs(members).collect::<Vec<_>>().join("; ")
        }
        _ => format!("{}={}", name, parts.flat().join(",")),
    }
}
