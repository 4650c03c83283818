#![deny(missing_docs)]

//! # Schema Graph
//!
//! Arena of schema nodes addressed by [`SchemaId`]. Children are stored as ids, and
//! `$ref` edges are plain strings resolved by lookup, so a reference cycle never
//! becomes an ownership cycle.
//!
//! The graph is built once (by the loader or through [`SchemaGraph::push`]) and only
//! read afterwards. Every resolver takes `&SchemaGraph`.

use indexmap::{IndexMap, IndexSet};
use serde_json::{Number, Value};
use std::collections::HashSet;

/// Stable handle of a node inside one [`SchemaGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(usize);

impl SchemaId {
    /// Position of the node in its arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Ordered set of JSON type names (`string`, `integer`, `null`, ...).
pub type TypeSet = IndexSet<String>;

/// A single JSON Schema (2020-12 plus the OpenAPI superset) node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaNode {
    /// `true` / `false` schema. When set, every other field is ignored.
    pub boolean_schema: Option<bool>,
    /// `$ref`.
    pub reference: Option<String>,
    /// `$dynamicRef`.
    pub dynamic_ref: Option<String>,
    /// `$id`, opening a new resolution resource.
    pub schema_id: Option<String>,
    /// `$anchor`.
    pub anchor: Option<String>,
    /// `$dynamicAnchor`.
    pub dynamic_anchor: Option<String>,
    /// `$schema`.
    pub dialect: Option<String>,
    /// `$comment`.
    pub comment: Option<String>,

    /// Declared (or inferred, see `types_inferred`) types.
    pub types: TypeSet,
    /// True when `types` was filled by inference rather than declared.
    pub types_inferred: bool,
    /// `format`.
    pub format: Option<String>,
    /// `enum`.
    pub enum_values: Option<Vec<Value>>,
    /// `const`. `Some(Value::Null)` is a `null` constant.
    pub const_value: Option<Value>,

    /// `minimum`.
    pub minimum: Option<Number>,
    /// `maximum`.
    pub maximum: Option<Number>,
    /// `exclusiveMinimum` (number, or boolean in OpenAPI 3.0 documents).
    pub exclusive_minimum: Option<Value>,
    /// `exclusiveMaximum` (number, or boolean in OpenAPI 3.0 documents).
    pub exclusive_maximum: Option<Value>,
    /// `multipleOf`.
    pub multiple_of: Option<Number>,

    /// `minLength`.
    pub min_length: Option<u64>,
    /// `maxLength`.
    pub max_length: Option<u64>,
    /// `pattern`.
    pub pattern: Option<String>,
    /// `contentEncoding`.
    pub content_encoding: Option<String>,
    /// `contentMediaType`.
    pub content_media_type: Option<String>,
    /// `contentSchema`.
    pub content_schema: Option<SchemaId>,

    /// `items`.
    pub items: Option<SchemaId>,
    /// `prefixItems`.
    pub prefix_items: Vec<SchemaId>,
    /// `contains`.
    pub contains: Option<SchemaId>,
    /// `minItems`.
    pub min_items: Option<u64>,
    /// `maxItems`.
    pub max_items: Option<u64>,
    /// `uniqueItems`.
    pub unique_items: Option<bool>,
    /// `minContains`.
    pub min_contains: Option<u64>,
    /// `maxContains`.
    pub max_contains: Option<u64>,
    /// `unevaluatedItems`.
    pub unevaluated_items: Option<SchemaId>,

    /// `properties`.
    pub properties: IndexMap<String, SchemaId>,
    /// `patternProperties`.
    pub pattern_properties: IndexMap<String, SchemaId>,
    /// `propertyNames`.
    pub property_names: Option<SchemaId>,
    /// `additionalProperties`.
    pub additional_properties: Option<SchemaId>,
    /// `dependentSchemas`.
    pub dependent_schemas: IndexMap<String, SchemaId>,
    /// `unevaluatedProperties`.
    pub unevaluated_properties: Option<SchemaId>,
    /// `required`.
    pub required: Vec<String>,
    /// `minProperties`.
    pub min_properties: Option<u64>,
    /// `maxProperties`.
    pub max_properties: Option<u64>,

    /// `oneOf`.
    pub one_of: Vec<SchemaId>,
    /// `anyOf`.
    pub any_of: Vec<SchemaId>,
    /// `allOf`.
    pub all_of: Vec<SchemaId>,
    /// `not`.
    pub not: Option<SchemaId>,
    /// `if`.
    pub if_schema: Option<SchemaId>,
    /// `then`.
    pub then_schema: Option<SchemaId>,
    /// `else`.
    pub else_schema: Option<SchemaId>,

    /// `$defs` (and legacy `definitions`).
    pub defs: IndexMap<String, SchemaId>,

    /// Meta-data vocabulary and OpenAPI annotations (`title`, `description`,
    /// `default`, `examples`, `discriminator`, ...), kept verbatim.
    pub annotations: IndexMap<String, Value>,
    /// `x-*` extensions, kept verbatim.
    pub extensions: IndexMap<String, Value>,
    /// Any other keyword, kept verbatim and never interpreted.
    pub custom_keywords: IndexMap<String, Value>,
}

/// The effective semantics of a node.
///
/// A boolean schema ignores everything else; a reference is followed before any
/// sibling keyword is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantics<'a> {
    /// `true` accepts everything, `false` nothing.
    Boolean(bool),
    /// Static `$ref`.
    Reference(&'a str),
    /// `$dynamicRef`.
    DynamicReference(&'a str),
    /// Constraint and composition keywords.
    Inline,
}

impl SchemaNode {
    /// Creates a boolean schema node.
    pub fn boolean(value: bool) -> Self {
        Self {
            boolean_schema: Some(value),
            ..Self::default()
        }
    }

    /// Creates a `$ref` node.
    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            reference: Some(target.into()),
            ..Self::default()
        }
    }

    /// Creates a node with a single declared type.
    pub fn typed(ty: &str) -> Self {
        let mut node = Self::default();
        node.types.insert(ty.to_string());
        node
    }

    /// Returns the tagged view of this node's effective semantics.
    pub fn semantics(&self) -> Semantics<'_> {
        if let Some(value) = self.boolean_schema {
            return Semantics::Boolean(value);
        }
        if let Some(reference) = self.reference.as_deref() {
            return Semantics::Reference(reference);
        }
        if let Some(reference) = self.dynamic_ref.as_deref() {
            return Semantics::DynamicReference(reference);
        }
        Semantics::Inline
    }

    /// The non-blank `$id` of this node, if it opens a resource.
    pub fn resource_id(&self) -> Option<&str> {
        non_blank(self.schema_id.as_deref())
    }

    /// The non-blank `$dynamicAnchor` of this node.
    pub fn dynamic_anchor_name(&self) -> Option<&str> {
        non_blank(self.dynamic_anchor.as_deref())
    }

    /// Calls `f` for each immediate subschema in the fixed traversal order:
    /// `$defs`, `items`, `prefixItems`, `contains`, `properties`,
    /// `patternProperties`, `propertyNames`, `additionalProperties`,
    /// `dependentSchemas`, `unevaluatedProperties`, `unevaluatedItems`,
    /// `contentSchema`, `oneOf`, `anyOf`, `allOf`, `not`, `if`, `then`, `else`.
    pub fn for_each_subschema(&self, mut f: impl FnMut(SchemaId)) {
        if self.boolean_schema.is_some() {
            return;
        }
        self.defs.values().copied().for_each(&mut f);
        self.items.into_iter().for_each(&mut f);
        self.prefix_items.iter().copied().for_each(&mut f);
        self.contains.into_iter().for_each(&mut f);
        self.properties.values().copied().for_each(&mut f);
        self.pattern_properties.values().copied().for_each(&mut f);
        self.property_names.into_iter().for_each(&mut f);
        self.additional_properties.into_iter().for_each(&mut f);
        self.dependent_schemas.values().copied().for_each(&mut f);
        self.unevaluated_properties.into_iter().for_each(&mut f);
        self.unevaluated_items.into_iter().for_each(&mut f);
        self.content_schema.into_iter().for_each(&mut f);
        self.one_of.iter().copied().for_each(&mut f);
        self.any_of.iter().copied().for_each(&mut f);
        self.all_of.iter().copied().for_each(&mut f);
        self.not.into_iter().for_each(&mut f);
        self.if_schema.into_iter().for_each(&mut f);
        self.then_schema.into_iter().for_each(&mut f);
        self.else_schema.into_iter().for_each(&mut f);
    }

    /// Immediate subschemas in traversal order.
    pub fn subschemas(&self) -> Vec<SchemaId> {
        let mut out = Vec::new();
        self.for_each_subschema(|id| out.push(id));
        out
    }
}

/// Controls descent in [`SchemaGraph::walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Visit the node's subschemas.
    Continue,
    /// Do not descend below this node.
    SkipChildren,
}

/// Arena holding every schema node of a document.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    nodes: Vec<SchemaNode>,
    parents: Vec<Option<SchemaId>>,
    roots: Vec<SchemaId>,
    named: IndexMap<String, SchemaId>,
}

impl SchemaGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph holds no node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends a node. Children already in the arena get this node as parent unless
    /// they have one.
    pub fn push(&mut self, node: SchemaNode) -> SchemaId {
        let id = SchemaId(self.nodes.len());
        node.for_each_subschema(|child| {
            if let Some(slot) = self.parents.get_mut(child.0) {
                if slot.is_none() && child != id {
                    *slot = Some(id);
                }
            }
        });
        self.nodes.push(node);
        self.parents.push(None);
        id
    }

    /// Mutable access for graph construction (e.g. wiring a structural cycle in a
    /// hand-built graph). Resolvers never mutate.
    pub fn node_mut(&mut self, id: SchemaId) -> &mut SchemaNode {
        &mut self.nodes[id.0]
    }

    /// Returns the node behind `id`.
    ///
    /// Ids are only minted by this graph; an id from another graph may panic.
    pub fn node(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// Returns the node behind `id`, if it exists.
    pub fn get(&self, id: SchemaId) -> Option<&SchemaNode> {
        self.nodes.get(id.0)
    }

    /// Lexical parent of a node.
    pub fn parent(&self, id: SchemaId) -> Option<SchemaId> {
        self.parents.get(id.0).copied().flatten()
    }

    /// Registers `id` as a top-level schema.
    pub fn add_root(&mut self, id: SchemaId) {
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
    }

    /// Registers `id` as a top-level schema reachable by component name.
    pub fn name_root(&mut self, name: impl Into<String>, id: SchemaId) {
        self.add_root(id);
        self.named.insert(name.into(), id);
    }

    /// Top-level schemas in insertion order.
    pub fn roots(&self) -> &[SchemaId] {
        &self.roots
    }

    /// The first top-level schema.
    pub fn root(&self) -> Option<SchemaId> {
        self.roots.first().copied()
    }

    /// Named top-level schemas (component schemas) in declaration order.
    pub fn named_roots(&self) -> impl Iterator<Item = (&str, SchemaId)> {
        self.named.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Looks up a named top-level schema.
    pub fn named(&self, name: &str) -> Option<SchemaId> {
        self.named.get(name).copied()
    }

    /// All node ids in arena order.
    pub fn ids(&self) -> impl Iterator<Item = SchemaId> {
        (0..self.nodes.len()).map(SchemaId)
    }

    /// Immediate subschemas of `id` in traversal order.
    pub fn subschemas(&self, id: SchemaId) -> Vec<SchemaId> {
        self.node(id).subschemas()
    }

    /// Closest ancestor-or-self that opens a resource (non-blank `$id`), or the
    /// topmost ancestor.
    pub fn resource_root(&self, id: SchemaId) -> SchemaId {
        let mut current = id;
        let mut seen = HashSet::new();
        loop {
            if self.node(current).resource_id().is_some() || !seen.insert(current) {
                return current;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Pre-order depth-first traversal from `root`, each node visited once.
    ///
    /// Revisits (through a structural cycle or shared child) are skipped silently.
    pub fn walk(&self, root: SchemaId, mut visit: impl FnMut(SchemaId, &SchemaNode) -> Walk) {
        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.get(id) else {
                continue;
            };
            if visit(id, node) == Walk::SkipChildren {
                continue;
            }
            let children = node.subschemas();
            stack.extend(children.into_iter().rev());
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
