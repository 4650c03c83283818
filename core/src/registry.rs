#![deny(missing_docs)]

//! # Document Registry
//!
//! Stores externally supplied OpenAPI documents so Path Item references that
//! cross documents can be followed. No network access is performed.

use crate::document::ApiDocument;
use crate::error::{AppError, AppResult};
use crate::paths::resolve::{ExternalPathItem, ExternalResolver};
use crate::refs::{resolve_against, strip_fragment};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// A single registered document entry.
#[derive(Debug, Clone)]
pub struct DocumentEntry {
    /// Retrieval URI used when registering the document.
    pub retrieval_uri: String,
    /// Base URI resolved from `$self` / retrieval URI.
    pub base_uri: Option<String>,
    /// Parsed document.
    pub document: ApiDocument,
}

/// Registry for externally supplied OpenAPI documents, keyed by every URI that
/// identifies them.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    docs: Vec<DocumentEntry>,
    index: HashMap<String, usize>,
}

impl DocumentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an OpenAPI document from YAML.
    pub fn register_openapi_yaml(&mut self, retrieval_uri: &str, yaml: &str) -> AppResult<()> {
        let document = ApiDocument::from_yaml_str(yaml)?;
        self.register(retrieval_uri, document)
    }

    /// Registers an OpenAPI document from JSON value.
    pub fn register_openapi_json(&mut self, retrieval_uri: &str, raw: JsonValue) -> AppResult<()> {
        let document = ApiDocument::from_json_value(raw)?;
        self.register(retrieval_uri, document)
    }

    /// Registers an already parsed document.
    pub fn register(&mut self, retrieval_uri: &str, document: ApiDocument) -> AppResult<()> {
        let document = document.with_retrieval_uri(retrieval_uri);
        let entry = DocumentEntry {
            retrieval_uri: retrieval_uri.to_string(),
            base_uri: document.base_uri(),
            document,
        };
        self.insert_entry(entry)?;
        Ok(())
    }

    /// Returns a registered document by any known URI (fragment ignored).
    pub fn get(&self, uri: &str) -> Option<&DocumentEntry> {
        let key = strip_fragment(uri);
        self.index
            .get(key)
            .or_else(|| self.index.get(&resolve_against(key, None)))
            .and_then(|idx| self.docs.get(*idx))
    }

    /// True when a document is known under `uri`.
    pub fn contains(&self, uri: &str) -> bool {
        self.get(uri).is_some()
    }

    /// Number of registered documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Registered documents in registration order.
    pub fn documents(&self) -> impl Iterator<Item = &DocumentEntry> {
        self.docs.iter()
    }

    /// Looks up `#/components/pathItems/{key}` in the document known as `base`.
    pub fn path_item(&self, base: &str, key: &str) -> Option<ExternalPathItem> {
        let entry = self.get(base)?;
        let item = entry.document.components.path_items.get(key)?;
        Some(ExternalPathItem {
            item: item.clone(),
            components: Some(entry.document.components.clone()),
            self_base: entry.base_uri.clone(),
        })
    }

    fn insert_entry(&mut self, entry: DocumentEntry) -> AppResult<usize> {
        let idx = self.docs.len();
        let mut aliases: Vec<String> = Vec::new();
        let candidates = [
            Some(entry.retrieval_uri.clone()),
            Some(resolve_against(&entry.retrieval_uri, None)),
            entry.base_uri.clone(),
        ];
        for alias in candidates.into_iter().flatten() {
            let alias = strip_fragment(&alias).to_string();
            if !alias.is_empty() && !aliases.contains(&alias) {
                aliases.push(alias);
            }
        }

        for alias in &aliases {
            if let Some(existing) = self.index.get(alias) {
                let existing_uri = self
                    .docs
                    .get(*existing)
                    .map(|d| d.retrieval_uri.as_str())
                    .unwrap_or("<unknown>");
                return Err(AppError::General(format!(
                    "Document registry URI collision for '{}': already registered as {}",
                    alias, existing_uri
                )));
            }
        }

        tracing::debug!(retrieval_uri = %entry.retrieval_uri, ?aliases, "registered document");
        self.docs.push(entry);
        for alias in aliases {
            self.index.insert(alias, idx);
        }
        Ok(idx)
    }
}

impl ExternalResolver for DocumentRegistry {
    fn resolve(&self, base: Option<&str>, key: &str) -> AppResult<Option<ExternalPathItem>> {
        Ok(base.and_then(|base| self.path_item(base, key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::resolve::{resolve_path_item, ResolutionContext};
    use crate::paths::model::{Components, PathItem};

    const SHARED: &str = r#"
openapi: 3.2.0
$self: https://example.com/shared.yaml
components:
  parameters:
    Tenant:
      name: tenant
      in: header
      schema: {type: string}
  pathItems:
    Users:
      summary: Shared users
      parameters:
        - $ref: '#/components/parameters/Tenant'
      get:
        operationId: listUsers
    Indirect:
      $ref: '#/components/pathItems/Users'
      description: Indirect users
"#;

    #[test]
    fn test_register_and_lookup_by_aliases() {
        let mut registry = DocumentRegistry::new();
        registry
            .register_openapi_yaml("file:///specs/shared.yaml", SHARED)
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("file:///specs/shared.yaml"));
        assert!(registry.contains("https://example.com/shared.yaml#/components"));
        assert!(!registry.contains("https://example.com/other.yaml"));
    }

    #[test]
    fn test_collision_is_an_error() {
        let mut registry = DocumentRegistry::new();
        registry
            .register_openapi_yaml("file:///specs/shared.yaml", SHARED)
            .unwrap();
        let err = registry
            .register_openapi_yaml("file:///specs/copy.yaml", SHARED)
            .unwrap_err();
        assert!(err.to_string().contains("URI collision"));
    }

    #[test]
    fn test_invalid_document_rejected() {
        let mut registry = DocumentRegistry::new();
        assert!(registry
            .register_openapi_yaml("file:///x.yaml", "swagger: '2.0'\n")
            .is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolves_external_path_items() {
        let mut registry = DocumentRegistry::new();
        registry
            .register_openapi_yaml("file:///specs/shared.yaml", SHARED)
            .unwrap();

        let local = Components::default();
        let ctx = ResolutionContext::new(&local)
            .with_self_uri(Some("https://example.com/api.yaml"))
            .with_external(&registry);
        let item = PathItem {
            reference: Some("shared.yaml#/components/pathItems/Indirect".to_string()),
            ..PathItem::default()
        };

        let resolved = resolve_path_item(&item, &ctx).unwrap();
        assert_eq!(resolved.item.summary.as_deref(), Some("Shared users"));
        assert_eq!(resolved.item.description.as_deref(), Some("Indirect users"));
        assert_eq!(
            resolved.self_uri.as_deref(),
            Some("https://example.com/shared.yaml")
        );
        assert!(resolved.components.parameters.contains_key("Tenant"));
    }

    #[test]
    fn test_unknown_key_or_base_is_a_miss() {
        let mut registry = DocumentRegistry::new();
        registry
            .register_openapi_yaml("file:///specs/shared.yaml", SHARED)
            .unwrap();
        assert!(registry
            .resolve(Some("https://example.com/shared.yaml"), "Nope")
            .unwrap()
            .is_none());
        assert!(registry.resolve(None, "Users").unwrap().is_none());
    }
}
