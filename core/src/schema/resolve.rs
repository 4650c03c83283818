#![deny(missing_docs)]

//! # Static Schema References
//!
//! Resolves `$ref` strings to nodes of the same [`SchemaGraph`].
//!
//! Order of attempts:
//! 1. Same-document references: `#` (enclosing resource), component pointers
//!    (`#/components/schemas/X/...`), JSON Pointers from the resource root, then
//!    plain-name fragments against `$anchor` / `$dynamicAnchor`.
//! 2. Document references matching a `$id` in the graph, followed by their fragment.
//! 3. The symbolic name of the reference (see [`resolve_ref_to_name`]) against
//!    named roots and `$defs` keys.
//!
//! Nothing here fetches; unknown documents resolve to `None`.

use crate::refs::{decode_pointer_segment, resolve_against, resolve_ref_to_name, split_fragment, strip_fragment};
use crate::schema::graph::{SchemaGraph, SchemaId, Walk};

impl SchemaGraph {
    /// Resolves `reference` as written on (or evaluated at) `from`.
    ///
    /// Without `from`, same-document references are taken relative to the first root.
    pub fn resolve_ref(&self, from: Option<SchemaId>, reference: &str) -> Option<SchemaId> {
        let reference = reference.trim();
        let (document, fragment) = split_fragment(reference);
        let fragment = fragment.unwrap_or("");
        let resource = from.map(|id| self.resource_root(id)).or_else(|| self.root());

        let resolved = if document.is_empty() {
            resource.and_then(|base| self.resolve_fragment(base, fragment))
        } else {
            self.find_resource(document, resource)
                .and_then(|target| self.resolve_fragment(target, fragment))
        };

        resolved.or_else(|| {
            let name = resolve_ref_to_name(reference);
            let fallback = self.named(&name).or_else(|| self.find_def(&name));
            if fallback.is_none() {
                tracing::debug!(reference, "schema reference is unresolved");
            }
            fallback
        })
    }

    fn resolve_fragment(&self, base: SchemaId, fragment: &str) -> Option<SchemaId> {
        if fragment.is_empty() || fragment == "/" {
            return Some(base);
        }
        if let Some(pointer) = fragment.strip_prefix('/') {
            let segments: Vec<String> = pointer.split('/').map(decode_pointer_segment).collect();
            if segments.len() >= 3 && segments[0] == "components" && segments[1] == "schemas" {
                let root = self.named(&segments[2])?;
                return self.walk_pointer(root, &segments[3..]);
            }
            return self.walk_pointer(base, &segments);
        }

        let name = decode_pointer_segment(fragment);
        self.find_anchor(self.resource_root(base), &name)
            .or_else(|| self.ids().find(|id| self.declares_anchor(*id, &name)))
    }

    /// Follows JSON Pointer segments through schema keywords.
    pub fn walk_pointer(&self, start: SchemaId, segments: &[String]) -> Option<SchemaId> {
        let mut current = start;
        let mut iter = segments.iter();
        while let Some(keyword) = iter.next() {
            let node = self.get(current)?;
            current = match keyword.as_str() {
                "$defs" | "definitions" => *node.defs.get(iter.next()?.as_str())?,
                "properties" => *node.properties.get(iter.next()?.as_str())?,
                "patternProperties" => *node.pattern_properties.get(iter.next()?.as_str())?,
                "dependentSchemas" => *node.dependent_schemas.get(iter.next()?.as_str())?,
                "prefixItems" => *node.prefix_items.get(parse_index(iter.next()?)?)?,
                "allOf" => *node.all_of.get(parse_index(iter.next()?)?)?,
                "anyOf" => *node.any_of.get(parse_index(iter.next()?)?)?,
                "oneOf" => *node.one_of.get(parse_index(iter.next()?)?)?,
                "items" => node.items?,
                "contains" => node.contains?,
                "propertyNames" => node.property_names?,
                "additionalProperties" => node.additional_properties?,
                "unevaluatedProperties" => node.unevaluated_properties?,
                "unevaluatedItems" => node.unevaluated_items?,
                "contentSchema" => node.content_schema?,
                "not" => node.not?,
                "if" => node.if_schema?,
                "then" => node.then_schema?,
                "else" => node.else_schema?,
                _ => return None,
            };
        }
        Some(current)
    }

    fn find_anchor(&self, resource: SchemaId, name: &str) -> Option<SchemaId> {
        let mut found = None;
        self.walk(resource, |id, node| {
            if found.is_some() {
                return Walk::SkipChildren;
            }
            if id != resource && node.resource_id().is_some() {
                return Walk::SkipChildren;
            }
            if self.declares_anchor(id, name) {
                found = Some(id);
            }
            Walk::Continue
        });
        found
    }

    fn declares_anchor(&self, id: SchemaId, name: &str) -> bool {
        let node = self.node(id);
        node.anchor.as_deref().map(str::trim) == Some(name)
            || node.dynamic_anchor_name() == Some(name)
    }

    fn find_resource(&self, document: &str, context: Option<SchemaId>) -> Option<SchemaId> {
        let context_id = context.and_then(|id| self.node(id).resource_id().map(str::to_string));
        let wanted = resolve_against(document, context_id.as_deref());
        let wanted = strip_fragment(&wanted).to_string();
        let document = strip_fragment(document);

        self.ids().find(|id| {
            let Some(schema_id) = self.node(*id).resource_id() else {
                return false;
            };
            let declared = strip_fragment(schema_id);
            if declared == document {
                return true;
            }
            let parent_base = self
                .parent(*id)
                .map(|p| self.resource_root(p))
                .and_then(|p| self.node(p).resource_id().map(str::to_string));
            strip_fragment(&resolve_against(declared, parent_base.as_deref())) == wanted
        })
    }

    fn find_def(&self, name: &str) -> Option<SchemaId> {
        self.ids().find_map(|id| self.node(id).defs.get(name).copied())
    }
}

fn parse_index(segment: &str) -> Option<usize> {
    segment.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use indexmap::IndexMap;

    fn standalone() -> SchemaGraph {
        SchemaGraph::from_value(&json!({
            "$id": "https://example.com/root.json",
            "$defs": {
                "name": {"$anchor": "Name", "type": "string"},
                "address": {
                    "$id": "address.json",
                    "type": "object",
                    "properties": {"street": {"type": "string"}}
                }
            },
            "properties": {
                "tags": {"type": "array", "prefixItems": [{"type": "integer"}]}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_resolve_root_and_pointer() {
        let graph = standalone();
        let root = graph.root().unwrap();
        let tags = graph.node(root).properties["tags"];
        let first = graph.node(tags).prefix_items[0];

        assert_eq!(graph.resolve_ref(Some(tags), "#"), Some(root));
        assert_eq!(graph.resolve_ref(Some(root), "#/properties/tags/prefixItems/0"), Some(first));
        assert_eq!(graph.resolve_ref(Some(root), "#/properties/missing"), None);
    }

    #[test]
    fn test_resolve_anchor() {
        let graph = standalone();
        let root = graph.root().unwrap();
        let name = graph.node(root).defs["name"];
        assert_eq!(graph.resolve_ref(Some(root), "#Name"), Some(name));
    }

    #[test]
    fn test_resolve_relative_id() {
        let graph = standalone();
        let root = graph.root().unwrap();
        let address = graph.node(root).defs["address"];
        let street = graph.node(address).properties["street"];

        assert_eq!(graph.resolve_ref(Some(root), "address.json"), Some(address));
        assert_eq!(
            graph.resolve_ref(Some(root), "https://example.com/address.json#/properties/street"),
            Some(street)
        );
    }

    #[test]
    fn test_resolve_component_pointer_and_legacy_name() {
        let mut schemas = IndexMap::new();
        schemas.insert(
            "Pet".to_string(),
            json!({"type": "object", "properties": {"id": {"type": "integer"}}}),
        );
        let graph = SchemaGraph::from_named_values(&schemas).unwrap();
        let pet = graph.named("Pet").unwrap();
        let id = graph.node(pet).properties["id"];

        assert_eq!(graph.resolve_ref(None, "#/components/schemas/Pet"), Some(pet));
        assert_eq!(graph.resolve_ref(None, "#/components/schemas/Pet/properties/id"), Some(id));
        assert_eq!(graph.resolve_ref(None, "Pet"), Some(pet));
        assert_eq!(graph.resolve_ref(None, "models/Pet.yaml"), Some(pet));
        assert_eq!(graph.resolve_ref(None, "#Pet"), Some(pet));
        assert_eq!(graph.resolve_ref(None, "#/components/schemas/Dog"), None);
    }
}
