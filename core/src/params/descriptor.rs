//! Fully resolved parameters as handed to consumers.

use crate::error::AppResult;
use crate::params::codec::{ParameterEncoding, WireForm};
use crate::params::style::{ParamLocation, ParamStyle};
use crate::schema::classify::ValueShape;
use crate::schema::graph::TypeSet;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Schema or per-media-type content of a parameter. The two are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterPayload {
    /// `schema`, kept raw.
    Schema(Value),
    /// `content`, keyed by media type.
    Content(IndexMap<String, Value>),
}

/// A parameter with its reference resolved and style/explode defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    /// Parameter name.
    pub name: String,
    /// Where the parameter travels.
    #[serde(rename = "in")]
    pub location: ParamLocation,
    /// Description (a reference's own description wins).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Always true for path parameters.
    pub required: bool,
    /// Deprecation flag.
    pub deprecated: bool,
    /// Effective style.
    pub style: ParamStyle,
    /// Effective explode flag.
    pub explode: bool,
    /// Keep reserved characters unescaped.
    pub allow_reserved: bool,
    /// Query parameters only.
    pub allow_empty_value: bool,
    /// Schema or content, when declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ParameterPayload>,
    /// Effective types of the schema. Empty when unknown.
    #[serde(skip_serializing_if = "TypeSet::is_empty")]
    pub value_types: TypeSet,
    /// Specification extensions.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, Value>,
}

impl ParameterDescriptor {
    /// Key identifying the parameter within an operation.
    pub fn key(&self) -> (ParamLocation, &str) {
        (self.location, self.name.as_str())
    }

    /// Codec settings of this parameter.
    pub fn encoding(&self) -> ParameterEncoding {
        ParameterEncoding::new(self.location)
            .with_style(self.style)
            .with_explode(self.explode)
            .with_allow_reserved(self.allow_reserved)
    }

    /// Shape expected for values. Falls back to the value's own shape when the
    /// schema type is unknown.
    pub fn shape_for(&self, value: &Value) -> ValueShape {
        if self.value_types.is_empty() {
            ValueShape::of_value(value)
        } else {
            ValueShape::from_types(&self.value_types)
        }
    }

    /// Serializes `value` for this parameter.
    pub fn encode(&self, value: &Value) -> AppResult<WireForm> {
        self.encoding()
            .encode(&self.name, self.shape_for(value), value)
    }
}
