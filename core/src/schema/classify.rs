//! # Type Classification
//!
//! Computes the effective type set of a schema node by following `$ref`,
//! `$dynamicRef` and composition. Used to decide the value shape of a parameter.

use crate::schema::dynamic::DynamicAnchorScope;
use crate::schema::graph::{SchemaGraph, SchemaId, Semantics, TypeSet};
use serde_json::Value;
use std::collections::HashSet;

/// Coarse shape of a parameter value, as seen by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Strings, numbers, booleans and anything of unknown type.
    Scalar,
    /// JSON arrays.
    Array,
    /// JSON objects.
    Object,
}

impl ValueShape {
    /// Maps a type set to a shape. `null` is ignored; mixed or empty sets are scalar.
    pub fn from_types(types: &TypeSet) -> Self {
        let mut concrete = types.iter().filter(|t| t.as_str() != "null");
        match (concrete.next().map(String::as_str), concrete.next()) {
            (Some("array"), None) => ValueShape::Array,
            (Some("object"), None) => ValueShape::Object,
            _ => ValueShape::Scalar,
        }
    }

    /// The shape of a concrete JSON value.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Array(_) => ValueShape::Array,
            Value::Object(_) => ValueShape::Object,
            _ => ValueShape::Scalar,
        }
    }
}

/// Classifies nodes of one graph, optionally with a dynamic scope for `$dynamicRef`.
#[derive(Debug, Clone, Copy)]
pub struct TypeClassifier<'g> {
    graph: &'g SchemaGraph,
    scope: Option<&'g DynamicAnchorScope>,
}

impl<'g> TypeClassifier<'g> {
    /// Classifier with static resolution only.
    pub fn new(graph: &'g SchemaGraph) -> Self {
        Self { graph, scope: None }
    }

    /// Classifier resolving `$dynamicRef` through `scope`.
    pub fn with_scope(graph: &'g SchemaGraph, scope: &'g DynamicAnchorScope) -> Self {
        Self {
            graph,
            scope: Some(scope),
        }
    }

    /// Effective types of `id`. An empty set means unknown / any.
    ///
    /// Reference cycles terminate with the empty set.
    pub fn effective_types(&self, id: SchemaId) -> TypeSet {
        let mut path = HashSet::new();
        self.types_of(id, &mut path)
    }

    /// Where a reference node points, following `$dynamicRef` through the scope
    /// first and falling back to static resolution.
    pub fn target_of(&self, id: SchemaId) -> Option<SchemaId> {
        match self.graph.get(id)?.semantics() {
            Semantics::Reference(reference) => self.graph.resolve_ref(Some(id), reference),
            Semantics::DynamicReference(reference) => self
                .scope
                .and_then(|scope| scope.resolve_dynamic_ref(id, reference))
                .or_else(|| self.graph.resolve_ref(Some(id), reference)),
            Semantics::Boolean(_) | Semantics::Inline => None,
        }
    }

    /// Shape of values described by `id`.
    pub fn value_shape(&self, id: SchemaId) -> ValueShape {
        ValueShape::from_types(&self.effective_types(id))
    }

    fn types_of(&self, id: SchemaId, path: &mut HashSet<SchemaId>) -> TypeSet {
        if !path.insert(id) {
            tracing::debug!(node = id.index(), "reference cycle while classifying schema");
            return TypeSet::new();
        }
        let types = self.types_uncached(id, path);
        path.remove(&id);
        types
    }

    fn types_uncached(&self, id: SchemaId, path: &mut HashSet<SchemaId>) -> TypeSet {
        let Some(node) = self.graph.get(id) else {
            return TypeSet::new();
        };
        match node.semantics() {
            Semantics::Boolean(_) => TypeSet::new(),
            Semantics::Reference(_) | Semantics::DynamicReference(_) => {
                let from_target = self
                    .target_of(id)
                    .map(|target| self.types_of(target, path))
                    .unwrap_or_default();
                if from_target.is_empty() {
                    node.types.clone()
                } else {
                    from_target
                }
            }
            Semantics::Inline if !node.types.is_empty() => node.types.clone(),
            Semantics::Inline => {
                let branches: Vec<SchemaId> = node
                    .all_of
                    .iter()
                    .chain(&node.any_of)
                    .chain(&node.one_of)
                    .copied()
                    .collect();
                if branches.is_empty() {
                    return TypeSet::new();
                }
                let mut union = TypeSet::new();
                for branch in branches {
                    let types = self.types_of(branch, path);
                    if types.is_empty() {
                        return TypeSet::new();
                    }
                    union.extend(types);
                }
                union
            }
        }
    }
}

/// Effective types of a raw (parameter) schema value.
///
/// A top-level `$ref` is resolved in `components` and classified under `scope`, the
/// dynamic scope of those components. Inline schemas are loaded into a transient
/// graph, where nested references to components stay unknown.
pub fn value_types(schema: &Value, components: &SchemaGraph, scope: &DynamicAnchorScope) -> TypeSet {
    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
        return components
            .resolve_ref(None, reference)
            .map(|id| TypeClassifier::with_scope(components, scope).effective_types(id))
            .unwrap_or_default();
    }
    match SchemaGraph::from_value(schema) {
        Ok(graph) => graph
            .root()
            .map(|root| {
                let scope = DynamicAnchorScope::build(&graph, root);
                TypeClassifier::with_scope(&graph, &scope).effective_types(root)
            })
            .unwrap_or_default(),
        Err(err) => {
            tracing::debug!(error = %err, "parameter schema could not be classified");
            TypeSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::graph::SchemaNode;
    use indexmap::IndexMap;
    use serde_json::json;

    fn components() -> SchemaGraph {
        let mut schemas = IndexMap::new();
        schemas.insert("Ids".to_string(), json!({"type": "array", "items": {"type": "integer"}}));
        schemas.insert("Filter".to_string(), json!({"properties": {"q": {"type": "string"}}}));
        schemas.insert("A".to_string(), json!({"$ref": "#/components/schemas/B"}));
        schemas.insert("B".to_string(), json!({"$ref": "#/components/schemas/A"}));
        schemas.insert(
            "Either".to_string(),
            json!({"oneOf": [{"type": "string"}, {"type": "integer"}]}),
        );
        schemas.insert(
            "Partial".to_string(),
            json!({"anyOf": [{"type": "string"}, {"description": "anything"}]}),
        );
        SchemaGraph::from_named_values(&schemas).unwrap()
    }

    fn types_of(graph: &SchemaGraph, name: &str) -> Vec<String> {
        let id = graph.named(name).unwrap();
        TypeClassifier::new(graph).effective_types(id).into_iter().collect()
    }

    #[test]
    fn test_declared_and_inferred() {
        let graph = components();
        assert_eq!(types_of(&graph, "Ids"), vec!["array"]);
        assert_eq!(types_of(&graph, "Filter"), vec!["object"]);
    }

    #[test]
    fn test_reference_cycle_is_any() {
        let graph = components();
        assert!(types_of(&graph, "A").is_empty());
        assert!(types_of(&graph, "B").is_empty());
    }

    #[test]
    fn test_composition_union() {
        let graph = components();
        assert_eq!(types_of(&graph, "Either"), vec!["string", "integer"]);
        assert!(types_of(&graph, "Partial").is_empty());
    }

    #[test]
    fn test_shared_child_is_not_a_cycle() {
        let mut graph = SchemaGraph::new();
        let shared = graph.push(SchemaNode::typed("string"));
        let mut parent = SchemaNode::default();
        parent.all_of = vec![shared, shared];
        let parent = graph.push(parent);
        let types = TypeClassifier::new(&graph).effective_types(parent);
        assert_eq!(types.into_iter().collect::<Vec<_>>(), vec!["string"]);
    }

    #[test]
    fn test_dynamic_ref_uses_scope() {
        let graph = SchemaGraph::from_value(&json!({
            "$id": "https://example.com/list",
            "$dynamicAnchor": "item",
            "type": "object",
            "$defs": {
                "strings": {
                    "$id": "https://example.com/strings",
                    "$dynamicAnchor": "item",
                    "type": "string",
                    "not": {"$dynamicRef": "#item"}
                }
            }
        }))
        .unwrap();
        let root = graph.root().unwrap();
        let strings = graph.node(root).defs["strings"];
        let dynamic = graph.node(strings).not.unwrap();
        let scope = DynamicAnchorScope::build(&graph, root);

        let classifier = TypeClassifier::with_scope(&graph, &scope);
        assert_eq!(classifier.target_of(dynamic), Some(strings));
        assert_eq!(classifier.value_shape(dynamic), ValueShape::Scalar);
    }

    #[test]
    fn test_value_shape() {
        let graph = components();
        let classifier = TypeClassifier::new(&graph);
        assert_eq!(classifier.value_shape(graph.named("Ids").unwrap()), ValueShape::Array);
        assert_eq!(classifier.value_shape(graph.named("Filter").unwrap()), ValueShape::Object);

        let nullable: TypeSet = ["object".to_string(), "null".to_string()].into_iter().collect();
        assert_eq!(ValueShape::from_types(&nullable), ValueShape::Object);
        assert_eq!(ValueShape::of_value(&json!([1])), ValueShape::Array);
    }

    #[test]
    fn test_value_types_of_raw_schema() {
        let graph = components();
        let scope = DynamicAnchorScope::build_all(&graph);
        let by_ref = value_types(&json!({"$ref": "#/components/schemas/Ids"}), &graph, &scope);
        assert!(by_ref.contains("array"));
        let inline = value_types(&json!({"type": "string"}), &graph, &scope);
        assert!(inline.contains("string"));
        assert!(value_types(&json!({"$ref": "#/components/schemas/Missing"}), &graph, &scope).is_empty());
    }

    #[test]
    fn test_value_types_uses_enclosing_dynamic_anchor() {
        let mut schemas = IndexMap::new();
        schemas.insert(
            "A".to_string(),
            json!({
                "$id": "https://example.com/a",
                "$dynamicAnchor": "X",
                "type": "object",
                "$defs": {
                    "C": {"$id": "https://example.com/c", "$dynamicAnchor": "X", "type": "string"},
                    "B": {"$id": "https://example.com/b", "items": {"$dynamicRef": "#X"}}
                }
            }),
        );
        let graph = SchemaGraph::from_named_values(&schemas).unwrap();
        let scope = DynamicAnchorScope::build_all(&graph);

        let types = value_types(
            &json!({"$ref": "#/components/schemas/A/$defs/B/items"}),
            &graph,
            &scope,
        );
        assert_eq!(types.into_iter().collect::<Vec<_>>(), vec!["object".to_string()]);
    }
}
