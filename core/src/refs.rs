#![deny(missing_docs)]

//! # Reference Utilities
//!
//! Parsing and normalization of `$ref` strings shared by schema and Path Item
//! resolution.
//!
//! These helpers never fetch anything. Malformed fragments and bases degrade to
//! the literal input instead of failing, since reference text routinely crosses
//! tool boundaries half-formed.

use percent_encoding::percent_decode_str;
use std::path::Path;
use std::sync::OnceLock;
use url::Url;

use regex::Regex;

const DUMMY_BASE: &str = "http://example.invalid/";

/// The parsed form of a component reference (`[base]#/components/{kind}/{key}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceTarget {
    /// Document part of the reference, absent for same-document references.
    pub base: Option<String>,
    /// Decoded component key.
    pub key: String,
}

/// Parses a component reference of the given `kind` (e.g. `pathItems`, `parameters`).
///
/// Returns `None` when the reference does not have the component shape or names
/// another component kind.
pub fn parse_component_ref(reference: &str, kind: &str) -> Option<ReferenceTarget> {
    static COMPONENT_RE: OnceLock<Regex> = OnceLock::new();
    let re = COMPONENT_RE.get_or_init(|| {
        Regex::new(r"^(?P<base>[^#]*)#/components/(?P<kind>[^/]+)/(?P<key>[^/]+)$")
            .expect("Invalid regex")
    });

    let caps = re.captures(reference.trim())?;
    if &caps["kind"] != kind {
        return None;
    }
    let key = decode_pointer_segment(&caps["key"]);
    if key.is_empty() {
        return None;
    }
    let base = caps
        .name("base")
        .map(|m| m.as_str())
        .filter(|b| !b.is_empty())
        .map(str::to_string);
    Some(ReferenceTarget { base, key })
}

/// Renders any reference as a symbolic name.
///
/// - `#/a/b/Name` yields the last pointer segment.
/// - `#Name` yields the fragment as-is.
/// - Anything else yields the referenced file's base name without extension, then
///   the last path segment, then the last `/`-delimited token of the raw text.
///
/// The mapping is lossy: distinct URIs can share a name.
pub fn resolve_ref_to_name(reference: &str) -> String {
    let reference = reference.trim();
    if let Some(pointer) = reference.strip_prefix("#/") {
        let last = pointer.rsplit('/').next().unwrap_or(pointer);
        return decode_pointer_segment(last);
    }
    if let Some(fragment) = reference.strip_prefix('#') {
        return fragment.to_string();
    }

    let (document, _) = split_fragment(reference);
    let path = match Url::parse(document) {
        Ok(url) => url.path().to_string(),
        Err(_) => document.split('?').next().unwrap_or(document).to_string(),
    };

    if let Some(segment) = path.rsplit('/').find(|s| !s.is_empty()) {
        let stem = Path::new(segment)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(segment);
        return percent_decode_lossy(stem);
    }

    reference
        .trim_end_matches(&['/', '#'][..])
        .rsplit('/')
        .next()
        .unwrap_or(reference)
        .to_string()
}

/// Splits a reference into its document part and optional fragment (without `#`).
pub fn split_fragment(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once('#') {
        Some((document, fragment)) => (document, Some(fragment)),
        None => (reference, None),
    }
}

/// Removes any fragment and trailing `#` from a URI.
pub fn strip_fragment(uri: &str) -> &str {
    split_fragment(uri.trim()).0.trim_end_matches('#')
}

/// Decodes a JSON Pointer segment (handles `~1`, `~0` and percent-encoding).
pub fn decode_pointer_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_lossy(&decoded)
}

/// Percent-decodes a string, returning the input unchanged if it is not valid UTF-8
/// once decoded.
pub fn percent_decode_lossy(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => {
            tracing::debug!(fragment = raw, "percent-decoding failed, keeping raw text");
            raw.to_string()
        }
    }
}

/// Resolves `reference` against `context_base` with RFC 3986 relative resolution.
///
/// Relative bases (`/api/openapi.yaml`, `specs/root.yaml`) are resolved through a
/// placeholder origin and returned relative again. Anything unresolvable is returned
/// literally.
pub fn resolve_against(reference: &str, context_base: Option<&str>) -> String {
    let reference = reference.trim();
    if let Ok(url) = Url::parse(reference) {
        return url.to_string();
    }
    let Some(context) = context_base.map(str::trim).filter(|c| !c.is_empty()) else {
        return reference.to_string();
    };

    if let Ok(base) = Url::parse(context) {
        return match base.join(reference) {
            Ok(joined) => joined.to_string(),
            Err(_) => reference.to_string(),
        };
    }

    // Relative context: resolve under a placeholder origin and strip it again.
    let Ok(dummy) = Url::parse(DUMMY_BASE) else {
        return reference.to_string();
    };
    let joined = dummy
        .join(context)
        .and_then(|base| base.join(reference));
    match joined {
        Ok(url) => {
            let text = url.to_string();
            let stripped = text.trim_start_matches(DUMMY_BASE);
            if context.starts_with('/') {
                format!("/{}", stripped)
            } else {
                stripped.to_string()
            }
        }
        Err(_) => reference.to_string(),
    }
}

/// Checks whether a (resolved) document URI identifies the document whose `$self` is
/// `self_uri`.
///
/// Both sides are compared after stripping fragments. Absolute URIs additionally
/// match on scheme/host/port/path, and an absolute-path `$self` matches the path
/// component of an absolute reference.
pub fn same_document(document: &str, self_uri: &str) -> bool {
    let document = strip_fragment(document);
    let self_uri = strip_fragment(self_uri);
    if document.is_empty() || self_uri.is_empty() {
        return false;
    }
    if document == self_uri {
        return true;
    }

    if let (Ok(doc_url), Ok(self_url)) = (Url::parse(document), Url::parse(self_uri)) {
        return doc_url.scheme() == self_url.scheme()
            && doc_url.host() == self_url.host()
            && doc_url.port() == self_url.port()
            && doc_url.path() == self_url.path();
    }

    if self_uri.starts_with('/') {
        if let Ok(doc_url) = Url::parse(document) {
            return doc_url.path() == self_uri;
        }
    }

    if !self_uri.contains("://") && !document.contains("://") {
        return Path::new(document) == Path::new(self_uri);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_ref_local() {
        let target = parse_component_ref("#/components/pathItems/Users", "pathItems").unwrap();
        assert_eq!(target.base, None);
        assert_eq!(target.key, "Users");
    }

    #[test]
    fn test_component_ref_external_base() {
        let target =
            parse_component_ref("common.yaml#/components/pathItems/Health", "pathItems").unwrap();
        assert_eq!(target.base.as_deref(), Some("common.yaml"));
        assert_eq!(target.key, "Health");
    }

    #[test]
    fn test_component_ref_wrong_kind_or_shape() {
        assert!(parse_component_ref("#/components/schemas/User", "pathItems").is_none());
        assert!(parse_component_ref("#/paths/~1users", "pathItems").is_none());
        assert!(parse_component_ref("#/components/pathItems/a/b", "pathItems").is_none());
    }

    #[test]
    fn test_component_ref_decodes_key() {
        let target =
            parse_component_ref("#/components/parameters/Page%20Size~1v2", "parameters").unwrap();
        assert_eq!(target.key, "Page Size/v2");
    }

    #[test]
    fn test_ref_to_name_pointer() {
        assert_eq!(resolve_ref_to_name("#/components/schemas/User"), "User");
        assert_eq!(resolve_ref_to_name("#/$defs/a~1b"), "a/b");
    }

    #[test]
    fn test_ref_to_name_bare_fragment() {
        assert_eq!(resolve_ref_to_name("#Address"), "Address");
        assert_eq!(resolve_ref_to_name("#My%20Anchor"), "My%20Anchor");
    }

    #[test]
    fn test_ref_to_name_file_and_url() {
        assert_eq!(resolve_ref_to_name("schemas/Pet.yaml"), "Pet");
        assert_eq!(resolve_ref_to_name("./Pet.schema.json#/"), "Pet.schema");
        assert_eq!(
            resolve_ref_to_name("https://example.com/models/Order.json#/properties/id"),
            "Order"
        );
        assert_eq!(resolve_ref_to_name("Pet"), "Pet");
    }

    #[test]
    fn test_ref_to_name_falls_back_to_raw_token() {
        assert_eq!(resolve_ref_to_name("https://example.com/"), "example.com");
    }

    #[test]
    fn test_decode_pointer_segment_percent_encoding() {
        assert_eq!(decode_pointer_segment("User%20Profile~1details"), "User Profile/details");
    }

    #[test]
    fn test_percent_decode_invalid_utf8_passthrough() {
        assert_eq!(percent_decode_lossy("bad%FFname"), "bad%FFname");
    }

    #[test]
    fn test_resolve_against_absolute_base() {
        assert_eq!(
            resolve_against("other.yaml", Some("https://example.com/api/openapi.yaml")),
            "https://example.com/api/other.yaml"
        );
        assert_eq!(
            resolve_against("https://x.org/a.yaml", Some("https://example.com/")),
            "https://x.org/a.yaml"
        );
    }

    #[test]
    fn test_resolve_against_relative_base() {
        assert_eq!(
            resolve_against("common.yaml", Some("/specs/root.yaml")),
            "/specs/common.yaml"
        );
        assert_eq!(
            resolve_against("common.yaml", Some("specs/root.yaml")),
            "specs/common.yaml"
        );
    }

    #[test]
    fn test_resolve_against_without_context_is_literal() {
        assert_eq!(resolve_against("common.yaml", None), "common.yaml");
    }

    #[test]
    fn test_same_document_variants() {
        assert!(same_document(
            "https://example.com/openapi.yaml#",
            "https://example.com/openapi.yaml"
        ));
        assert!(same_document(
            "https://example.com/api/openapi.yaml",
            "/api/openapi.yaml"
        ));
        assert!(same_document("./a/../openapi.yaml", "./a/../openapi.yaml"));
        assert!(!same_document(
            "https://example.com/other.yaml",
            "https://example.com/openapi.yaml"
        ));
        assert!(!same_document("", "https://example.com/openapi.yaml"));
    }
}
