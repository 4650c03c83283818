#![deny(missing_docs)]

//! # Document Model
//!
//! Deserialization structures for Path Item containers, operations, parameters
//! and components, plus the flattened [`OperationDescriptor`] output.
//!
//! Maps keep declaration order; output order follows input order.

use crate::params::descriptor::ParameterDescriptor;
use crate::params::style::{ParamLocation, ParamStyle};
use crate::schema::dynamic::DynamicAnchorScope;
use crate::schema::graph::SchemaGraph;
use indexmap::IndexMap;
use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

/// A Reference Object. `summary` and `description` override the target's.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Reference {
    /// The reference string.
    #[serde(rename = "$ref")]
    pub reference: String,
    /// Overriding summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Overriding description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A parameter entry: inline or by reference.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParameterOrRef {
    /// `{"$ref": ...}`
    Ref(Reference),
    /// Inline Parameter Object.
    Item(Box<Parameter>),
}

/// A Parameter Object as written in the document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Location.
    #[serde(rename = "in")]
    pub location: ParamLocation,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Required flag.
    #[serde(default)]
    pub required: bool,
    /// Deprecation flag.
    #[serde(default)]
    pub deprecated: bool,
    /// Allow empty values (query only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_empty_value: Option<bool>,
    /// Declared style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ParamStyle>,
    /// Declared explode flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
    /// Declared allowReserved flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_reserved: Option<bool>,
    /// Schema, kept raw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Content map keyed by media type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, Value>>,
    /// Remaining fields (examples, extensions).
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// A Server Object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Server {
    /// Target host URL (may be templated).
    pub url: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Server variables.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, Value>,
    /// Extensions.
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// An Operation Object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Unique operation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Operation-level parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterOrRef>,
    /// Request body, kept raw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    /// Responses, kept raw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Value>,
    /// Callbacks, kept raw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callbacks: Option<IndexMap<String, Value>>,
    /// Deprecation flag.
    #[serde(default)]
    pub deprecated: bool,
    /// Security requirements. `Some(vec![])` explicitly removes security.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<Value>>,
    /// Operation-level servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<Server>>,
    /// Extensions and unmodelled fields.
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// A Path Item Object, possibly a reference to one.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathItem {
    /// Reference to a component Path Item.
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Summary for every operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Description for every operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Servers for every operation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// Parameters shared by every operation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterOrRef>,
    /// GET.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// PUT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// POST.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// DELETE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// OPTIONS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    /// PATCH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// TRACE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
    /// QUERY (OAS 3.2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Operation>,
    /// Operations keyed by free-form method token (OAS 3.2).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub additional_operations: IndexMap<String, Operation>,
    /// Extensions.
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl PathItem {
    /// Populated fixed-method slots in canonical order.
    pub fn fixed_operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        [
            (HttpMethod::Get, &self.get),
            (HttpMethod::Put, &self.put),
            (HttpMethod::Post, &self.post),
            (HttpMethod::Delete, &self.delete),
            (HttpMethod::Options, &self.options),
            (HttpMethod::Head, &self.head),
            (HttpMethod::Patch, &self.patch),
            (HttpMethod::Trace, &self.trace),
            (HttpMethod::Query, &self.query),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
    }

    /// True when the item declares at least one operation.
    pub fn has_operations(&self) -> bool {
        self.fixed_operations().next().is_some() || !self.additional_operations.is_empty()
    }
}

/// Request method of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
    /// HEAD
    Head,
    /// PATCH
    Patch,
    /// TRACE
    Trace,
    /// QUERY
    Query,
    /// A method declared under `additionalOperations`, with its raw token.
    Custom(String),
}

impl HttpMethod {
    /// The method token.
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Query => "QUERY",
            HttpMethod::Custom(token) => token,
        }
    }

    /// True for methods declared under `additionalOperations`.
    pub fn is_custom(&self) -> bool {
        matches!(self, HttpMethod::Custom(_))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HttpMethod {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Whether an operation comes from `paths` or `webhooks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    /// Declared under `paths`.
    Path,
    /// Declared under `webhooks`.
    Webhook,
}

/// Reusable definitions of one document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    /// `components.schemas`, loaded into a graph of named roots.
    #[serde(default, deserialize_with = "deserialize_schemas")]
    pub schemas: SchemaGraph,
    /// `components.parameters`.
    #[serde(default)]
    pub parameters: IndexMap<String, ParameterOrRef>,
    /// `components.pathItems`.
    #[serde(default)]
    pub path_items: IndexMap<String, PathItem>,
    /// Other component maps (responses, requestBodies, ...) and extensions.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
    #[serde(skip)]
    schema_scope: OnceLock<DynamicAnchorScope>,
}

impl Components {
    /// Dynamic scope over every component schema, built on first use.
    pub fn schema_scope(&self) -> &DynamicAnchorScope {
        self.schema_scope
            .get_or_init(|| DynamicAnchorScope::build_all(&self.schemas))
    }
}

fn deserialize_schemas<'de, D>(deserializer: D) -> Result<SchemaGraph, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
    SchemaGraph::from_named_values(&raw).map_err(DeError::custom)
}

/// A Paths (or Webhooks) Object: entries in declaration order, `x-` keys apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathMap {
    /// Path Items keyed by path template (or webhook name).
    pub items: IndexMap<String, PathItem>,
    /// Extensions of the map itself.
    pub extensions: IndexMap<String, Value>,
}

impl PathMap {
    /// True when no entry is declared.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'de> Deserialize<'de> for PathMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
        let mut items = IndexMap::new();
        let mut extensions = IndexMap::new();

        for (key, value) in raw {
            if key.starts_with("x-") {
                extensions.insert(key, value);
                continue;
            }
            let item = serde_json::from_value::<PathItem>(value).map_err(|e| {
                DeError::custom(format!("Failed to parse path item '{}': {}", key, e))
            })?;
            items.insert(key, item);
        }

        Ok(Self { items, extensions })
    }
}

impl Serialize for PathMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.items.len() + self.extensions.len()))?;
        for (key, value) in &self.items {
            map.serialize_entry(key, value)?;
        }
        for (key, value) in &self.extensions {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// One fully merged operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    /// Path template, or webhook name.
    pub path: String,
    /// Origin of the container.
    pub kind: RouteKind,
    /// Method token.
    pub method: HttpMethod,
    /// Operation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Operation summary, else the container's.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description, else the container's.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Deprecation flag.
    pub deprecated: bool,
    /// Merged parameters.
    pub parameters: Vec<ParameterDescriptor>,
    /// Request body, raw.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    /// Responses, raw.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<Value>,
    /// Callbacks, raw.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callbacks: Option<IndexMap<String, Value>>,
    /// Effective security requirements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<Value>>,
    /// Effective servers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// Operation extensions.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, Value>,
}

impl OperationDescriptor {
    /// Finds a parameter by location and name.
    pub fn parameter(&self, location: ParamLocation, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters
            .iter()
            .find(|p| p.location == location && p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_map_splits_extensions_and_keeps_order() {
        let yaml = r#"
/z:
  get: {}
x-internal: true
/a:
  post: {}
"#;
        let map: PathMap = serde_yaml::from_str(yaml).unwrap();
        let keys: Vec<&str> = map.items.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["/z", "/a"]);
        assert_eq!(map.extensions["x-internal"], Value::Bool(true));
    }

    #[test]
    fn test_parameter_or_ref() {
        let yaml = r#"
- $ref: '#/components/parameters/Limit'
  description: Page size
- name: id
  in: path
  required: true
  schema: {type: string}
  x-trace: on
"#;
        let params: Vec<ParameterOrRef> = serde_yaml::from_str(yaml).unwrap();
        match &params[0] {
            ParameterOrRef::Ref(r) => {
                assert_eq!(r.reference, "#/components/parameters/Limit");
                assert_eq!(r.description.as_deref(), Some("Page size"));
            }
            other => panic!("expected reference, got {:?}", other),
        }
        match &params[1] {
            ParameterOrRef::Item(p) => {
                assert_eq!(p.location, ParamLocation::Path);
                assert!(p.extensions.contains_key("x-trace"));
            }
            other => panic!("expected parameter, got {:?}", other),
        }
    }

    #[test]
    fn test_fixed_operation_order() {
        let yaml = r#"
query: {}
post: {}
get: {}
additionalOperations:
  LINK: {}
"#;
        let item: PathItem = serde_yaml::from_str(yaml).unwrap();
        let methods: Vec<HttpMethod> = item.fixed_operations().map(|(m, _)| m).collect();
        assert_eq!(methods, vec![HttpMethod::Get, HttpMethod::Post, HttpMethod::Query]);
        assert!(item.additional_operations.contains_key("LINK"));
        assert!(item.has_operations());
        assert!(!PathItem::default().has_operations());
    }

    #[test]
    fn test_components_load_schema_graph() {
        let yaml = r#"
schemas:
  Pet:
    type: object
pathItems:
  Pets:
    get: {}
responses:
  NotFound:
    description: missing
"#;
        let components: Components = serde_yaml::from_str(yaml).unwrap();
        assert!(components.schemas.named("Pet").is_some());
        assert!(components.path_items.contains_key("Pets"));
        assert!(components.extra.contains_key("responses"));
    }

    #[test]
    fn test_method_serialization() {
        let custom = HttpMethod::Custom("COPY".to_string());
        assert_eq!(serde_json::to_value(&custom).unwrap(), "COPY");
        assert_eq!(HttpMethod::Query.to_string(), "QUERY");
        assert!(custom.is_custom());
    }
}
