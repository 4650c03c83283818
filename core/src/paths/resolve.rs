#![deny(missing_docs)]

//! # Path Item Resolution
//!
//! Follows `$ref` on Path Item containers:
//!
//! 1. No `$ref`: the container is returned as is.
//! 2. The reference must look like `[base]#/components/pathItems/{key}`.
//! 3. Without a base, or with a base identifying the current document (`$self`),
//!    `key` is looked up in the local components.
//! 4. Otherwise, and for local misses with a base, the external resolver is asked.
//! 5. A target that is itself a reference is followed; a revisited `(base, key)` is
//!    a cycle and resolves to nothing.
//! 6. On the way back, each referrer's `summary`/`description` override the
//!    target's, its non-empty `parameters`/`servers` replace the target's, and
//!    extensions merge with the referrer winning. Replaced parameters remember the
//!    document they were written in.

use crate::error::AppResult;
use crate::paths::model::{Components, PathItem};
use crate::refs::{parse_component_ref, resolve_against, same_document, strip_fragment};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;

/// A Path Item obtained from another document.
#[derive(Debug, Clone, Default)]
pub struct ExternalPathItem {
    /// The Path Item.
    pub item: PathItem,
    /// Components of the document it came from, for nested references.
    pub components: Option<Components>,
    /// `$self` (or retrieval URI) of that document.
    pub self_base: Option<String>,
}

/// Caller-supplied lookup of Path Items living in other documents.
///
/// Called at most once per external reference, synchronously. An `Err` is logged
/// and treated like a miss.
pub trait ExternalResolver {
    /// Looks up `#/components/pathItems/{key}` in the document identified by `base`.
    fn resolve(&self, base: Option<&str>, key: &str) -> AppResult<Option<ExternalPathItem>>;
}

impl<F> ExternalResolver for F
where
    F: Fn(Option<&str>, &str) -> Option<ExternalPathItem>,
{
    fn resolve(&self, base: Option<&str>, key: &str) -> AppResult<Option<ExternalPathItem>> {
        Ok(self(base, key))
    }
}

/// Everything resolution needs to know about the document being processed.
#[derive(Clone, Copy)]
pub struct ResolutionContext<'a> {
    /// Components of the document.
    pub components: &'a Components,
    /// The document's `$self`.
    pub self_uri: Option<&'a str>,
    /// Lookup for other documents.
    pub external: Option<&'a dyn ExternalResolver>,
    /// Document-level security requirements.
    pub global_security: Option<&'a [Value]>,
}

impl<'a> ResolutionContext<'a> {
    /// Context without `$self`, external resolver or global security.
    pub fn new(components: &'a Components) -> Self {
        Self {
            components,
            self_uri: None,
            external: None,
            global_security: None,
        }
    }

    /// Sets `$self`.
    pub fn with_self_uri(mut self, self_uri: Option<&'a str>) -> Self {
        self.self_uri = self_uri;
        self
    }

    /// Sets the external resolver.
    pub fn with_external(mut self, external: &'a dyn ExternalResolver) -> Self {
        self.external = Some(external);
        self
    }

    /// Sets the document-level security.
    pub fn with_global_security(mut self, security: Option<&'a [Value]>) -> Self {
        self.global_security = security;
        self
    }
}

/// A container with every reference followed.
#[derive(Debug, Clone)]
pub struct ResolvedPathItem<'a> {
    /// The merged Path Item (never carries `$ref`).
    pub item: PathItem,
    /// Components of the document the final target lives in.
    pub components: Cow<'a, Components>,
    /// `$self` of that document.
    pub self_uri: Option<String>,
    /// Set when a referrer replaced the container parameters.
    pub parameter_origin: Option<ParameterOrigin<'a>>,
}

/// The document a container-level `parameters` list was written in.
#[derive(Debug, Clone)]
pub struct ParameterOrigin<'a> {
    /// Components of that document.
    pub components: Cow<'a, Components>,
    /// `$self` of that document.
    pub self_uri: Option<String>,
}

impl ResolvedPathItem<'_> {
    /// Components and `$self` that the container `parameters` must be resolved in.
    pub fn parameter_context(&self) -> (&Components, Option<&str>) {
        match &self.parameter_origin {
            Some(origin) => (origin.components.as_ref(), origin.self_uri.as_deref()),
            None => (self.components.as_ref(), self.self_uri.as_deref()),
        }
    }
}

/// Resolves a container. `None` is the Unresolved state.
pub fn resolve_path_item<'a>(
    item: &PathItem,
    ctx: &ResolutionContext<'a>,
) -> Option<ResolvedPathItem<'a>> {
    let mut visited = HashSet::new();
    resolve_inner(
        item,
        Cow::Borrowed(ctx.components),
        ctx.self_uri.map(str::to_string),
        ctx,
        &mut visited,
    )
}

fn resolve_inner<'a>(
    item: &PathItem,
    components: Cow<'a, Components>,
    self_uri: Option<String>,
    ctx: &ResolutionContext<'a>,
    visited: &mut HashSet<(String, String)>,
) -> Option<ResolvedPathItem<'a>> {
    let Some(reference) = item.reference.as_deref() else {
        return Some(ResolvedPathItem {
            item: item.clone(),
            components,
            self_uri,
            parameter_origin: None,
        });
    };

    let Some(target) = parse_component_ref(reference, "pathItems") else {
        tracing::debug!(reference, "not a path item component reference");
        return None;
    };
    let base = target
        .base
        .as_deref()
        .map(|b| resolve_against(b, self_uri.as_deref()));

    let is_local = match (&base, &self_uri) {
        (None, _) => true,
        (Some(base), Some(current)) => same_document(base, current),
        (Some(_), None) => false,
    };

    let document = if is_local {
        self_uri.as_deref().map(strip_fragment).unwrap_or_default()
    } else {
        base.as_deref().map(strip_fragment).unwrap_or_default()
    };
    if !visited.insert((document.to_string(), target.key.clone())) {
        tracing::debug!(reference, "path item reference cycle");
        return None;
    }

    let origin = (!item.parameters.is_empty()).then(|| ParameterOrigin {
        components: components.clone(),
        self_uri: self_uri.clone(),
    });

    let local = if is_local {
        components.path_items.get(&target.key).cloned()
    } else {
        None
    };

    let (next, next_components, next_self) = match local {
        Some(found) => (found, components, self_uri),
        None if base.is_some() => {
            let external = lookup_external(ctx, base.as_deref(), &target.key)?;
            let next_self = external.self_base.or(base);
            let next_components = Cow::Owned(external.components.unwrap_or_default());
            (external.item, next_components, next_self)
        }
        None => {
            tracing::debug!(reference, "path item not found in local components");
            return None;
        }
    };

    let mut resolved = resolve_inner(&next, next_components, next_self, ctx, visited)?;
    apply_overrides(&mut resolved.item, item);
    if origin.is_some() {
        resolved.parameter_origin = origin;
    }
    Some(resolved)
}

fn lookup_external(
    ctx: &ResolutionContext<'_>,
    base: Option<&str>,
    key: &str,
) -> Option<ExternalPathItem> {
    let Some(external) = ctx.external else {
        tracing::debug!(base, key, "no external resolver for path item reference");
        return None;
    };
    match external.resolve(base, key) {
        Ok(Some(found)) => Some(found),
        Ok(None) => {
            tracing::debug!(base, key, "external resolver has no such path item");
            None
        }
        Err(err) => {
            tracing::warn!(base, key, error = %err, "external resolver failed");
            None
        }
    }
}

/// Reference-object override of `target` by the fields of `referrer`.
fn apply_overrides(target: &mut PathItem, referrer: &PathItem) {
    target.reference = None;
    if referrer.summary.is_some() {
        target.summary = referrer.summary.clone();
    }
    if referrer.description.is_some() {
        target.description = referrer.description.clone();
    }
    if !referrer.parameters.is_empty() {
        target.parameters = referrer.parameters.clone();
    }
    if !referrer.servers.is_empty() {
        target.servers = referrer.servers.clone();
    }
    for (key, value) in &referrer.extensions {
        target.extensions.insert(key.clone(), value.clone());
    }
}
