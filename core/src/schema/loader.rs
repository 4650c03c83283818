#![deny(missing_docs)]

//! # Schema Loader
//!
//! Converts JSON values into [`SchemaGraph`] nodes and back.
//!
//! Legacy shapes are normalized on the way in:
//! - `definitions` is read as `$defs`.
//! - Array-valued `items` is read as `prefixItems` (with `additionalItems` as `items`).
//! - `nullable: true` adds `null` to the declared types.
//!
//! Keywords with an unexpected JSON type are preserved as custom keywords rather
//! than rejected.

use crate::error::{AppError, AppResult};
use crate::schema::graph::{SchemaGraph, SchemaId, SchemaNode};
use crate::schema::inference::infer_types;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Keywords kept verbatim as annotations.
const ANNOTATION_KEYWORDS: &[&str] = &[
    "title",
    "description",
    "default",
    "examples",
    "example",
    "deprecated",
    "readOnly",
    "writeOnly",
    "discriminator",
    "xml",
    "externalDocs",
];

impl SchemaGraph {
    /// Loads a standalone schema document. The document becomes the first root.
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let mut graph = Self::new();
        graph.insert_value(value)?;
        Ok(graph)
    }

    /// Loads `value` as an additional top-level schema.
    pub fn insert_value(&mut self, value: &Value) -> AppResult<SchemaId> {
        let id = self.load(value, "#")?;
        self.add_root(id);
        Ok(id)
    }

    /// Loads `value` as a named top-level schema (e.g. a component schema).
    pub fn insert_named(&mut self, name: &str, value: &Value) -> AppResult<SchemaId> {
        let pointer = format!("#/components/schemas/{}", name.replace('~', "~0").replace('/', "~1"));
        let id = self.load(value, &pointer)?;
        self.name_root(name, id);
        Ok(id)
    }

    /// Loads every entry of a `components.schemas` map.
    pub fn from_named_values(schemas: &IndexMap<String, Value>) -> AppResult<Self> {
        let mut graph = Self::new();
        for (name, value) in schemas {
            graph.insert_named(name, value)?;
        }
        Ok(graph)
    }

    fn load(&mut self, value: &Value, pointer: &str) -> AppResult<SchemaId> {
        match value {
            Value::Bool(b) => Ok(self.push(SchemaNode::boolean(*b))),
            Value::Object(map) => {
                let mut node = self.load_object(map, pointer)?;
                if node.types.is_empty() && node.reference.is_none() && node.dynamic_ref.is_none()
                {
                    node.types = infer_types(&node);
                    node.types_inferred = !node.types.is_empty();
                }
                Ok(self.push(node))
            }
            other => Err(AppError::Parse(format!(
                "Schema at '{}' must be an object or a boolean, found {}",
                pointer,
                json_kind(other)
            ))),
        }
    }

    fn load_child(&mut self, value: &Value, pointer: &str, key: &str) -> AppResult<SchemaId> {
        self.load(value, &format!("{}/{}", pointer, escape(key)))
    }

    fn load_map(
        &mut self,
        value: &Value,
        pointer: &str,
        key: &str,
    ) -> AppResult<Option<IndexMap<String, SchemaId>>> {
        let Value::Object(entries) = value else {
            return Ok(None);
        };
        let base = format!("{}/{}", pointer, escape(key));
        let mut out = IndexMap::new();
        for (name, child) in entries {
            let id = self.load_child(child, &base, name)?;
            out.insert(name.clone(), id);
        }
        Ok(Some(out))
    }

    fn load_list(
        &mut self,
        value: &Value,
        pointer: &str,
        key: &str,
    ) -> AppResult<Option<Vec<SchemaId>>> {
        let Value::Array(entries) = value else {
            return Ok(None);
        };
        let base = format!("{}/{}", pointer, escape(key));
        let mut out = Vec::with_capacity(entries.len());
        for (idx, child) in entries.iter().enumerate() {
            out.push(self.load_child(child, &base, &idx.to_string())?);
        }
        Ok(Some(out))
    }

    fn load_single(&mut self, value: &Value, pointer: &str, key: &str) -> AppResult<Option<SchemaId>> {
        if !matches!(value, Value::Object(_) | Value::Bool(_)) {
            return Ok(None);
        }
        self.load_child(value, pointer, key).map(Some)
    }

    fn load_object(&mut self, map: &Map<String, Value>, pointer: &str) -> AppResult<SchemaNode> {
        let mut node = SchemaNode::default();
        let mut nullable = false;
        let mut additional_items = None;
        let mut items_was_array = false;

        for (key, value) in map {
            if key.starts_with("x-") {
                node.extensions.insert(key.clone(), value.clone());
                continue;
            }
            if ANNOTATION_KEYWORDS.contains(&key.as_str()) {
                node.annotations.insert(key.clone(), value.clone());
                continue;
            }

            let accepted = match key.as_str() {
                "$ref" => set(&mut node.reference, as_string(value)),
                "$dynamicRef" => set(&mut node.dynamic_ref, as_string(value)),
                "$id" => set(&mut node.schema_id, as_string(value)),
                "$anchor" => set(&mut node.anchor, as_string(value)),
                "$dynamicAnchor" => set(&mut node.dynamic_anchor, as_string(value)),
                "$schema" => set(&mut node.dialect, as_string(value)),
                "$comment" => set(&mut node.comment, as_string(value)),
                "type" => match parse_types(value) {
                    Some(types) => {
                        node.types.extend(types);
                        true
                    }
                    None => false,
                },
                "nullable" => {
                    nullable = value.as_bool().unwrap_or(false);
                    value.is_boolean()
                }
                "format" => set(&mut node.format, as_string(value)),
                "enum" => set(&mut node.enum_values, value.as_array().cloned()),
                "const" => {
                    node.const_value = Some(value.clone());
                    true
                }
                "minimum" => set(&mut node.minimum, value.as_number().cloned()),
                "maximum" => set(&mut node.maximum, value.as_number().cloned()),
                "multipleOf" => set(&mut node.multiple_of, value.as_number().cloned()),
                "exclusiveMinimum" => set(&mut node.exclusive_minimum, number_or_bool(value)),
                "exclusiveMaximum" => set(&mut node.exclusive_maximum, number_or_bool(value)),
                "minLength" => set(&mut node.min_length, value.as_u64()),
                "maxLength" => set(&mut node.max_length, value.as_u64()),
                "pattern" => set(&mut node.pattern, as_string(value)),
                "contentEncoding" => set(&mut node.content_encoding, as_string(value)),
                "contentMediaType" => set(&mut node.content_media_type, as_string(value)),
                "contentSchema" => set(
                    &mut node.content_schema,
                    self.load_single(value, pointer, key)?,
                ),
                "items" => {
                    if let Some(list) = self.load_list(value, pointer, key)? {
                        items_was_array = true;
                        node.prefix_items = list;
                        true
                    } else {
                        set(&mut node.items, self.load_single(value, pointer, key)?)
                    }
                }
                "additionalItems" => {
                    additional_items = Some(value);
                    true
                }
                "prefixItems" => match self.load_list(value, pointer, key)? {
                    Some(list) => {
                        node.prefix_items = list;
                        true
                    }
                    None => false,
                },
                "contains" => set(&mut node.contains, self.load_single(value, pointer, key)?),
                "minItems" => set(&mut node.min_items, value.as_u64()),
                "maxItems" => set(&mut node.max_items, value.as_u64()),
                "uniqueItems" => set(&mut node.unique_items, value.as_bool()),
                "minContains" => set(&mut node.min_contains, value.as_u64()),
                "maxContains" => set(&mut node.max_contains, value.as_u64()),
                "unevaluatedItems" => set(
                    &mut node.unevaluated_items,
                    self.load_single(value, pointer, key)?,
                ),
                "properties" => assign_map(&mut node.properties, self.load_map(value, pointer, key)?),
                "patternProperties" => assign_map(
                    &mut node.pattern_properties,
                    self.load_map(value, pointer, key)?,
                ),
                "propertyNames" => set(
                    &mut node.property_names,
                    self.load_single(value, pointer, key)?,
                ),
                "additionalProperties" => set(
                    &mut node.additional_properties,
                    self.load_single(value, pointer, key)?,
                ),
                "dependentSchemas" => assign_map(
                    &mut node.dependent_schemas,
                    self.load_map(value, pointer, key)?,
                ),
                "unevaluatedProperties" => set(
                    &mut node.unevaluated_properties,
                    self.load_single(value, pointer, key)?,
                ),
                "required" => match value.as_array() {
                    Some(list) if list.iter().all(Value::is_string) => {
                        node.required = list
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect();
                        true
                    }
                    _ => false,
                },
                "minProperties" => set(&mut node.min_properties, value.as_u64()),
                "maxProperties" => set(&mut node.max_properties, value.as_u64()),
                "oneOf" => assign_list(&mut node.one_of, self.load_list(value, pointer, key)?),
                "anyOf" => assign_list(&mut node.any_of, self.load_list(value, pointer, key)?),
                "allOf" => assign_list(&mut node.all_of, self.load_list(value, pointer, key)?),
                "not" => set(&mut node.not, self.load_single(value, pointer, key)?),
                "if" => set(&mut node.if_schema, self.load_single(value, pointer, key)?),
                "then" => set(&mut node.then_schema, self.load_single(value, pointer, key)?),
                "else" => set(&mut node.else_schema, self.load_single(value, pointer, key)?),
                "$defs" | "definitions" => match self.load_map(value, pointer, key)? {
                    Some(defs) => {
                        node.defs.extend(defs);
                        true
                    }
                    None => false,
                },
                _ => false,
            };

            if !accepted {
                node.custom_keywords.insert(key.clone(), value.clone());
            }
        }

        if let Some(value) = additional_items {
            let loaded = if items_was_array && node.items.is_none() {
                self.load_single(value, pointer, "additionalItems")?
            } else {
                None
            };
            match loaded {
                Some(id) => node.items = Some(id),
                None => {
                    node.custom_keywords
                        .insert("additionalItems".to_string(), value.clone());
                }
            }
        }

        if nullable && !node.types.is_empty() {
            node.types.insert("null".to_string());
        } else if map.contains_key("nullable") && node.types.is_empty() {
            node.annotations
                .insert("nullable".to_string(), Value::Bool(nullable));
        }

        Ok(node)
    }

    /// Serializes a node (and its subtree) back into a JSON value.
    ///
    /// Inferred types are not emitted. Structural cycles are cut with `true`.
    pub fn to_value(&self, id: SchemaId) -> Value {
        let mut path = Vec::new();
        self.node_to_value(id, &mut path)
    }

    fn node_to_value(&self, id: SchemaId, path: &mut Vec<SchemaId>) -> Value {
        if path.contains(&id) {
            return Value::Bool(true);
        }
        let node = self.node(id);
        if let Some(b) = node.boolean_schema {
            return Value::Bool(b);
        }
        path.push(id);

        let mut out = Map::new();
        put_str(&mut out, "$schema", &node.dialect);
        put_str(&mut out, "$id", &node.schema_id);
        put_str(&mut out, "$anchor", &node.anchor);
        put_str(&mut out, "$dynamicAnchor", &node.dynamic_anchor);
        put_str(&mut out, "$ref", &node.reference);
        put_str(&mut out, "$dynamicRef", &node.dynamic_ref);
        put_str(&mut out, "$comment", &node.comment);

        if !node.types_inferred && !node.types.is_empty() {
            let value = if node.types.len() == 1 {
                Value::String(node.types[0].clone())
            } else {
                Value::Array(node.types.iter().cloned().map(Value::String).collect())
            };
            out.insert("type".into(), value);
        }
        put_str(&mut out, "format", &node.format);
        if let Some(values) = &node.enum_values {
            out.insert("enum".into(), Value::Array(values.clone()));
        }
        if let Some(value) = &node.const_value {
            out.insert("const".into(), value.clone());
        }

        put_num(&mut out, "minimum", &node.minimum);
        put_num(&mut out, "maximum", &node.maximum);
        put_value(&mut out, "exclusiveMinimum", &node.exclusive_minimum);
        put_value(&mut out, "exclusiveMaximum", &node.exclusive_maximum);
        put_num(&mut out, "multipleOf", &node.multiple_of);
        put_u64(&mut out, "minLength", node.min_length);
        put_u64(&mut out, "maxLength", node.max_length);
        put_str(&mut out, "pattern", &node.pattern);
        put_str(&mut out, "contentEncoding", &node.content_encoding);
        put_str(&mut out, "contentMediaType", &node.content_media_type);
        self.put_child(&mut out, "contentSchema", node.content_schema, path);

        self.put_child(&mut out, "items", node.items, path);
        self.put_list(&mut out, "prefixItems", &node.prefix_items, path);
        self.put_child(&mut out, "contains", node.contains, path);
        put_u64(&mut out, "minItems", node.min_items);
        put_u64(&mut out, "maxItems", node.max_items);
        if let Some(unique) = node.unique_items {
            out.insert("uniqueItems".into(), Value::Bool(unique));
        }
        put_u64(&mut out, "minContains", node.min_contains);
        put_u64(&mut out, "maxContains", node.max_contains);
        self.put_child(&mut out, "unevaluatedItems", node.unevaluated_items, path);

        self.put_map(&mut out, "properties", &node.properties, path);
        self.put_map(&mut out, "patternProperties", &node.pattern_properties, path);
        self.put_child(&mut out, "propertyNames", node.property_names, path);
        self.put_child(&mut out, "additionalProperties", node.additional_properties, path);
        self.put_map(&mut out, "dependentSchemas", &node.dependent_schemas, path);
        self.put_child(&mut out, "unevaluatedProperties", node.unevaluated_properties, path);
        if !node.required.is_empty() {
            out.insert(
                "required".into(),
                Value::Array(node.required.iter().cloned().map(Value::String).collect()),
            );
        }
        put_u64(&mut out, "minProperties", node.min_properties);
        put_u64(&mut out, "maxProperties", node.max_properties);

        self.put_list(&mut out, "oneOf", &node.one_of, path);
        self.put_list(&mut out, "anyOf", &node.any_of, path);
        self.put_list(&mut out, "allOf", &node.all_of, path);
        self.put_child(&mut out, "not", node.not, path);
        self.put_child(&mut out, "if", node.if_schema, path);
        self.put_child(&mut out, "then", node.then_schema, path);
        self.put_child(&mut out, "else", node.else_schema, path);
        self.put_map(&mut out, "$defs", &node.defs, path);

        for (key, value) in node
            .annotations
            .iter()
            .chain(node.custom_keywords.iter())
            .chain(node.extensions.iter())
        {
            out.insert(key.clone(), value.clone());
        }

        path.pop();
        Value::Object(out)
    }

    fn put_child(
        &self,
        out: &mut Map<String, Value>,
        key: &str,
        child: Option<SchemaId>,
        path: &mut Vec<SchemaId>,
    ) {
        if let Some(id) = child {
            out.insert(key.to_string(), self.node_to_value(id, path));
        }
    }

    fn put_list(
        &self,
        out: &mut Map<String, Value>,
        key: &str,
        children: &[SchemaId],
        path: &mut Vec<SchemaId>,
    ) {
        if children.is_empty() {
            return;
        }
        let values = children
            .iter()
            .map(|id| self.node_to_value(*id, path))
            .collect();
        out.insert(key.to_string(), Value::Array(values));
    }

    fn put_map(
        &self,
        out: &mut Map<String, Value>,
        key: &str,
        children: &IndexMap<String, SchemaId>,
        path: &mut Vec<SchemaId>,
    ) {
        if children.is_empty() {
            return;
        }
        let mut map = Map::new();
        for (name, id) in children {
            map.insert(name.clone(), self.node_to_value(*id, path));
        }
        out.insert(key.to_string(), Value::Object(map));
    }
}

fn set<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

fn assign_map(slot: &mut IndexMap<String, SchemaId>, value: Option<IndexMap<String, SchemaId>>) -> bool {
    match value {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}

fn assign_list(slot: &mut Vec<SchemaId>, value: Option<Vec<SchemaId>>) -> bool {
    match value {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}

fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn number_or_bool(value: &Value) -> Option<Value> {
    matches!(value, Value::Number(_) | Value::Bool(_)).then(|| value.clone())
}

fn parse_types(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) if items.iter().all(Value::is_string) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

fn put_str(out: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        out.insert(key.to_string(), Value::String(v.clone()));
    }
}

fn put_num(out: &mut Map<String, Value>, key: &str, value: &Option<serde_json::Number>) {
    if let Some(v) = value {
        out.insert(key.to_string(), Value::Number(v.clone()));
    }
}

fn put_u64(out: &mut Map<String, Value>, key: &str, value: Option<u64>) {
    if let Some(v) = value {
        out.insert(key.to_string(), Value::from(v));
    }
}

fn put_value(out: &mut Map<String, Value>, key: &str, value: &Option<Value>) {
    if let Some(v) = value {
        out.insert(key.to_string(), v.clone());
    }
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
