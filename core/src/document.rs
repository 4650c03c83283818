#![deny(missing_docs)]

//! # API Documents
//!
//! Loads a whole OpenAPI 3.x document (YAML or JSON) into the document model and
//! runs the flattener over it.

use crate::error::{AppError, AppResult};
use crate::paths::flatten::flatten;
use crate::paths::model::{Components, OperationDescriptor, PathMap, Server};
use crate::paths::resolve::{ExternalResolver, ResolutionContext};
use crate::refs::resolve_against;
use crate::schema::dynamic::DynamicAnchorScope;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// A parsed API description.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDocument {
    /// OpenAPI version (e.g. "3.2.0").
    pub openapi: Option<String>,
    /// Swagger version, only read to report it as unsupported.
    pub swagger: Option<String>,
    /// `$self` (OAS 3.2).
    #[serde(rename = "$self")]
    pub self_uri: Option<String>,
    /// Default `$schema` of Schema Objects.
    pub json_schema_dialect: Option<String>,
    /// Info Object, raw.
    pub info: Option<Value>,
    /// Document-level servers.
    #[serde(default)]
    pub servers: Vec<Server>,
    /// Paths Object.
    #[serde(default)]
    pub paths: PathMap,
    /// Webhooks Object.
    pub webhooks: Option<PathMap>,
    /// Components Object.
    #[serde(default)]
    pub components: Components,
    /// Document-level security requirements.
    pub security: Option<Vec<Value>>,
    /// Remaining top-level fields.
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
    /// URI the document was read from.
    #[serde(skip)]
    pub retrieval_uri: Option<String>,
}

impl ApiDocument {
    /// Parses a YAML (or JSON) document.
    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        let raw: Value = serde_yaml::from_str(content)
            .map_err(|e| AppError::Parse(format!("Failed to parse OpenAPI YAML: {}", e)))?;
        Self::from_json_value(raw)
    }

    /// Builds a document from an already parsed JSON value.
    pub fn from_json_value(raw: Value) -> AppResult<Self> {
        let document: ApiDocument = serde_json::from_value(raw)
            .map_err(|e| AppError::Parse(format!("Failed to parse OpenAPI document: {}", e)))?;
        document.check_version()?;
        Ok(document)
    }

    /// Records where the document was read from. Relative `$self` values resolve
    /// against it.
    pub fn with_retrieval_uri(mut self, retrieval_uri: impl Into<String>) -> Self {
        self.retrieval_uri = Some(retrieval_uri.into());
        self
    }

    fn check_version(&self) -> AppResult<()> {
        match (&self.openapi, &self.swagger) {
            (Some(version), _) if version.starts_with("3.") => Ok(()),
            (Some(version), _) => Err(AppError::Parse(format!(
                "Unsupported OpenAPI version '{}'. Expected 3.x",
                version
            ))),
            (None, Some(version)) => Err(AppError::Parse(format!(
                "Swagger {} documents are not supported. Convert to OpenAPI 3.x first",
                version
            ))),
            (None, None) => Err(AppError::Parse(
                "Document is missing the 'openapi' version field".into(),
            )),
        }
    }

    /// Base URI identifying this document: `$self` resolved against the retrieval
    /// URI, else the retrieval URI.
    pub fn base_uri(&self) -> Option<String> {
        match (&self.self_uri, &self.retrieval_uri) {
            (Some(self_uri), retrieval) => Some(resolve_against(self_uri, retrieval.as_deref())),
            (None, Some(retrieval)) => Some(resolve_against(retrieval, None)),
            (None, None) => None,
        }
    }

    /// Resolution context for this document, borrowing `base_uri` from the caller.
    pub fn context<'a>(
        &'a self,
        base_uri: Option<&'a str>,
        external: Option<&'a dyn ExternalResolver>,
    ) -> ResolutionContext<'a> {
        ResolutionContext {
            components: &self.components,
            self_uri: base_uri,
            external,
            global_security: self.security.as_deref(),
        }
    }

    /// Flattens `paths` then `webhooks` into operations.
    pub fn operations(
        &self,
        external: Option<&dyn ExternalResolver>,
    ) -> AppResult<Vec<OperationDescriptor>> {
        let base = self.base_uri();
        let ctx = self.context(base.as_deref(), external);
        let operations = flatten(&self.paths, self.webhooks.as_ref(), &ctx)?;
        tracing::debug!(
            count = operations.len(),
            base = base.as_deref().unwrap_or("<none>"),
            "flattened operations"
        );
        Ok(operations)
    }

    /// Dynamic scope over every component schema.
    pub fn schema_scope(&self) -> &DynamicAnchorScope {
        self.components.schema_scope()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_check() {
        assert!(ApiDocument::from_yaml_str("openapi: 3.1.0\npaths: {}\n").is_ok());
        let err = ApiDocument::from_yaml_str("openapi: 2.5.0\n").unwrap_err();
        assert!(err.to_string().contains("Unsupported OpenAPI version"));
        let err = ApiDocument::from_yaml_str("swagger: '2.0'\n").unwrap_err();
        assert!(err.to_string().contains("not supported"));
        assert!(ApiDocument::from_yaml_str("info: {}\n").is_err());
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = ApiDocument::from_yaml_str("openapi: [unclosed").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn test_base_uri() {
        let doc = ApiDocument::from_yaml_str("openapi: 3.2.0\n$self: api.yaml\n")
            .unwrap()
            .with_retrieval_uri("https://example.com/specs/root.yaml");
        assert_eq!(doc.base_uri().as_deref(), Some("https://example.com/specs/api.yaml"));

        let doc = ApiDocument::from_yaml_str("openapi: 3.2.0\n")
            .unwrap()
            .with_retrieval_uri("https://example.com/specs/root.yaml");
        assert_eq!(doc.base_uri().as_deref(), Some("https://example.com/specs/root.yaml"));
    }

    #[test]
    fn test_operations_with_global_security() {
        let yaml = r#"
openapi: 3.2.0
security:
  - bearer: []
paths:
  /pets:
    $ref: '#/components/pathItems/Pets'
    summary: Pets here
webhooks:
  petAdded:
    post:
      security: []
components:
  pathItems:
    Pets:
      get:
        operationId: listPets
"#;
        let doc = ApiDocument::from_yaml_str(yaml).unwrap();
        let ops = doc.operations(None).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].summary.as_deref(), Some("Pets here"));
        assert_eq!(ops[0].security.as_ref().map(Vec::len), Some(1));
        assert_eq!(ops[1].security.as_ref().map(Vec::len), Some(0));
    }

    #[test]
    fn test_schema_scope_skips_sibling_resources() {
        let yaml = r##"
openapi: 3.2.0
paths:
  /trees:
    get:
      parameters:
        - name: leaf
          in: query
          style: deepObject
          schema:
            $ref: '#/components/schemas/Tree/$defs/Strict/properties/leaf'
components:
  schemas:
    Tree:
      $id: https://example.com/tree
      $dynamicAnchor: node
      type: object
      $defs:
        Other:
          $id: https://example.com/other
          $dynamicAnchor: node
          type: string
        Strict:
          $id: https://example.com/strict
          type: object
          properties:
            leaf:
              $dynamicRef: '#node'
"##;
        let doc = ApiDocument::from_yaml_str(yaml).unwrap();
        let graph = &doc.components.schemas;
        let tree = graph.named("Tree").unwrap();
        let strict = graph.node(tree).defs["Strict"];
        let leaf = graph.node(strict).properties["leaf"];

        assert_eq!(doc.schema_scope().resolve_dynamic_ref(leaf, "#node"), Some(tree));

        let ops = doc.operations(None).unwrap();
        let param = &ops[0].parameters[0];
        assert_eq!(param.value_types.iter().collect::<Vec<_>>(), vec!["object"]);
    }
}
