#![deny(missing_docs)]

//! # Type Inference
//!
//! Derives an implicit type set from constraint keywords for schemas that declare
//! no `type`.
//!
//! Precedence, highest first: array keywords, object keywords, `const`, `enum`,
//! numeric keywords, string keywords. An empty result means "unknown / any".

use crate::schema::graph::{SchemaNode, TypeSet};
use serde_json::Value;

/// Infers the implicit types of `node`.
///
/// Callers only invoke this for inline nodes without declared types; boolean and
/// reference nodes yield an empty set.
pub fn infer_types(node: &SchemaNode) -> TypeSet {
    if node.boolean_schema.is_some() || node.reference.is_some() || node.dynamic_ref.is_some() {
        return TypeSet::new();
    }

    if has_array_keywords(node) {
        return single("array");
    }
    if has_object_keywords(node) {
        return single("object");
    }
    if let Some(value) = &node.const_value {
        return single(json_type(value));
    }
    if let Some(values) = &node.enum_values {
        return infer_enum_types(values);
    }
    if node.minimum.is_some()
        || node.maximum.is_some()
        || node.multiple_of.is_some()
        || node.exclusive_minimum.is_some()
        || node.exclusive_maximum.is_some()
    {
        return single("number");
    }
    if node.min_length.is_some()
        || node.max_length.is_some()
        || node.pattern.is_some()
        || node.content_encoding.is_some()
        || node.content_media_type.is_some()
        || node.format.is_some()
    {
        return single("string");
    }

    TypeSet::new()
}

fn has_array_keywords(node: &SchemaNode) -> bool {
    node.items.is_some()
        || !node.prefix_items.is_empty()
        || node.contains.is_some()
        || node.min_items.is_some()
        || node.max_items.is_some()
        || node.unique_items.is_some()
}

fn has_object_keywords(node: &SchemaNode) -> bool {
    !node.properties.is_empty()
        || node.additional_properties.is_some()
        || !node.pattern_properties.is_empty()
        || node.property_names.is_some()
        || !node.dependent_schemas.is_empty()
        || node.min_properties.is_some()
        || node.max_properties.is_some()
        || !node.required.is_empty()
}

/// Common type across enum members, `{T, null}` when null is the only outlier.
fn infer_enum_types(values: &[Value]) -> TypeSet {
    let mut common: Option<&'static str> = None;
    let mut saw_null = false;

    for value in values {
        let ty = json_type(value);
        if ty == "null" {
            saw_null = true;
            continue;
        }
        common = match common {
            None => Some(ty),
            Some(current) => match unify(current, ty) {
                Some(merged) => Some(merged),
                None => return TypeSet::new(),
            },
        };
    }

    match (common, saw_null) {
        (Some(ty), false) => single(ty),
        (Some(ty), true) => [ty, "null"].iter().map(|s| s.to_string()).collect(),
        (None, true) => single("null"),
        (None, false) => TypeSet::new(),
    }
}

fn unify(a: &'static str, b: &'static str) -> Option<&'static str> {
    match (a, b) {
        _ if a == b => Some(a),
        ("integer", "number") | ("number", "integer") => Some("number"),
        _ => None,
    }
}

/// The JSON Schema type name of a literal. Integral numbers are `integer`.
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn single(ty: &str) -> TypeSet {
    let mut set = TypeSet::new();
    set.insert(ty.to_string());
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::graph::{SchemaGraph, SchemaId};
    use serde_json::json;

    fn types(value: Value) -> Vec<String> {
        let graph = SchemaGraph::from_value(&value).unwrap();
        let root: SchemaId = graph.root().unwrap();
        infer_types(graph.node(root)).into_iter().collect()
    }

    #[test]
    fn test_minimum_infers_number() {
        assert_eq!(types(json!({"minimum": 0})), vec!["number"]);
    }

    #[test]
    fn test_properties_infers_object() {
        assert_eq!(types(json!({"properties": {"a": {}}})), vec!["object"]);
        assert_eq!(types(json!({"required": ["a"]})), vec!["object"]);
    }

    #[test]
    fn test_array_beats_object() {
        assert_eq!(
            types(json!({"minItems": 1, "properties": {"a": {}}})),
            vec!["array"]
        );
    }

    #[test]
    fn test_const_literal_type() {
        assert_eq!(types(json!({"const": "on"})), vec!["string"]);
        assert_eq!(types(json!({"const": 3})), vec!["integer"]);
        assert_eq!(types(json!({"const": null})), vec!["null"]);
    }

    #[test]
    fn test_enum_common_type() {
        assert_eq!(types(json!({"enum": ["a", "b"]})), vec!["string"]);
        assert_eq!(types(json!({"enum": [1, 2.5]})), vec!["number"]);
        assert_eq!(types(json!({"enum": ["a", null]})), vec!["string", "null"]);
        assert!(types(json!({"enum": ["a", 1]})).is_empty());
    }

    #[test]
    fn test_enum_beats_numeric_keywords() {
        assert_eq!(types(json!({"enum": ["x"], "maximum": 3})), vec!["string"]);
    }

    #[test]
    fn test_string_keywords() {
        assert_eq!(types(json!({"pattern": "^a"})), vec!["string"]);
        assert_eq!(types(json!({"format": "uuid"})), vec!["string"]);
    }

    #[test]
    fn test_nothing_inferred() {
        assert!(types(json!({"description": "anything"})).is_empty());
        assert!(types(json!({"$ref": "#/$defs/A", "minimum": 1})).is_empty());
    }
}
