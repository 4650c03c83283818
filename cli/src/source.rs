#![deny(missing_docs)]

//! # Document Sources
//!
//! Reads documents from disk (and over HTTP(S) with the `client` feature) and
//! feeds them into a [`DocumentRegistry`] as external references ask for them.

use crate::error::{CliError, CliResult};
use oasgraph_core::{AppError, AppResult, DocumentRegistry, ExternalPathItem, ExternalResolver};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use url::Url;

/// `file://` URI of a local path, used as the document's retrieval URI.
pub fn file_uri(path: &Path) -> CliResult<String> {
    let absolute = fs::canonicalize(path)?;
    Url::from_file_path(&absolute)
        .map(|url| url.to_string())
        .map_err(|_| CliError::General(format!("Cannot express {:?} as a file URI", absolute)))
}

/// Reads the document behind an absolute URI.
pub fn read_uri(uri: &str) -> CliResult<String> {
    let url = Url::parse(uri)
        .map_err(|e| CliError::General(format!("Invalid document URI '{}': {}", uri, e)))?;
    match url.scheme() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| CliError::General(format!("Invalid file URI '{}'", uri)))?;
            Ok(fs::read_to_string(path)?)
        }
        "http" | "https" => fetch(uri),
        other => Err(CliError::General(format!(
            "Unsupported URI scheme '{}' in '{}'",
            other, uri
        ))),
    }
}

#[cfg(feature = "client")]
fn fetch(uri: &str) -> CliResult<String> {
    tracing::info!(uri, "fetching external document");
    ureq::get(uri)
        .call()
        .and_then(|mut response| response.body_mut().read_to_string())
        .map_err(|e| CliError::General(format!("Failed to fetch '{}': {}", uri, e)))
}

#[cfg(not(feature = "client"))]
fn fetch(uri: &str) -> CliResult<String> {
    Err(CliError::General(format!(
        "Cannot fetch '{}': built without the `client` feature",
        uri
    )))
}

/// Loads a local file into the registry under its `file://` URI.
pub fn register_file(registry: &mut DocumentRegistry, path: &Path) -> CliResult<()> {
    let uri = file_uri(path)?;
    let content = fs::read_to_string(path)?;
    registry.register_openapi_yaml(&uri, &content)?;
    Ok(())
}

/// External resolver that loads unknown documents the first time they are
/// referenced.
#[derive(Debug, Default)]
pub struct OnDemandResolver {
    registry: RefCell<DocumentRegistry>,
}

impl OnDemandResolver {
    /// Wraps a pre-filled registry.
    pub fn new(registry: DocumentRegistry) -> Self {
        Self {
            registry: RefCell::new(registry),
        }
    }

    /// Number of documents known so far.
    pub fn document_count(&self) -> usize {
        self.registry.borrow().len()
    }

    fn load(&self, base: &str) -> AppResult<()> {
        let content = read_uri(base).map_err(|e| AppError::General(e.to_string()))?;
        self.registry
            .borrow_mut()
            .register_openapi_yaml(base, &content)
    }
}

impl ExternalResolver for OnDemandResolver {
    fn resolve(&self, base: Option<&str>, key: &str) -> AppResult<Option<ExternalPathItem>> {
        let Some(base) = base else {
            return Ok(None);
        };
        let known = self.registry.borrow().contains(base);
        if !known {
            self.load(base)?;
        }
        Ok(self.registry.borrow().path_item(base, key))
    }
}
