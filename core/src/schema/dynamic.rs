#![deny(missing_docs)]

//! # Dynamic Anchor Scope
//!
//! Builds, for every node reachable from a root, the stack of `$dynamicAnchor`
//! tables of the resources enclosing it, and resolves `$dynamicRef` against that
//! stack innermost-first.
//!
//! Resource tables are keyed by node identity, never by structure: two identical
//! subschemas at different positions belong to different scopes.
//!
//! Anchor collisions inside one resource keep the last declaration met in the
//! subschema traversal order. This mirrors table construction order; it is not a
//! JSON Schema rule.

use crate::refs::{percent_decode_lossy, split_fragment};
use crate::schema::graph::{SchemaGraph, SchemaId, Walk};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The `$dynamicAnchor` table of one resolution resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicAnchorResource {
    owner: SchemaId,
    anchors: IndexMap<String, SchemaId>,
}

impl DynamicAnchorResource {
    /// The node that opened this resource.
    pub fn owner(&self) -> SchemaId {
        self.owner
    }

    /// The node declaring `name` in this resource.
    pub fn get(&self, name: &str) -> Option<SchemaId> {
        self.anchors.get(name).copied()
    }

    /// Declared anchors in table order.
    pub fn anchors(&self) -> impl Iterator<Item = (&str, SchemaId)> {
        self.anchors.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of anchors.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// True when the resource declares no dynamic anchor.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Per-node stacks (outermost to innermost) of enclosing resource tables.
#[derive(Debug, Clone, Default)]
pub struct DynamicAnchorScope {
    stacks: HashMap<SchemaId, Vec<Arc<DynamicAnchorResource>>>,
}

impl DynamicAnchorScope {
    /// Builds the scope of every node reachable from `root`.
    ///
    /// `root` always opens the outermost resource.
    pub fn build(graph: &SchemaGraph, root: SchemaId) -> Self {
        let mut scope = Self::default();
        let mut tables = HashMap::new();
        scope.extend_from(graph, root, &mut tables);
        scope
    }

    /// Builds one scope covering every root of the graph, each root opening its own
    /// outermost resource.
    pub fn build_all(graph: &SchemaGraph) -> Self {
        let mut scope = Self::default();
        let mut tables = HashMap::new();
        for root in graph.roots() {
            scope.extend_from(graph, *root, &mut tables);
        }
        scope
    }

    fn extend_from(
        &mut self,
        graph: &SchemaGraph,
        root: SchemaId,
        tables: &mut HashMap<SchemaId, Arc<DynamicAnchorResource>>,
    ) {
        let mut visited = HashSet::new();
        let mut pending: Vec<(SchemaId, Vec<Arc<DynamicAnchorResource>>)> =
            vec![(root, Vec::new())];

        while let Some((id, parent_stack)) = pending.pop() {
            if !visited.insert(id) || self.stacks.contains_key(&id) {
                continue;
            }
            let Some(node) = graph.get(id) else {
                continue;
            };

            let opens_resource = id == root || node.resource_id().is_some();
            let mut stack = parent_stack;
            if opens_resource && !stack.iter().any(|r| r.owner == id) {
                let table = tables
                    .entry(id)
                    .or_insert_with(|| Arc::new(collect_resource(graph, id)))
                    .clone();
                tracing::trace!(
                    resource = id.index(),
                    anchors = table.len(),
                    depth = stack.len() + 1,
                    "entering dynamic scope resource"
                );
                stack.push(table);
            }

            for child in node.subschemas().into_iter().rev() {
                pending.push((child, stack.clone()));
            }
            self.stacks.insert(id, stack);
        }
    }

    /// The resource stack (outermost first) enclosing `node`.
    pub fn stack(&self, node: SchemaId) -> &[Arc<DynamicAnchorResource>] {
        self.stacks.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when `node` was reached while building the scope.
    pub fn contains(&self, node: SchemaId) -> bool {
        self.stacks.contains_key(&node)
    }

    /// Resolves a `$dynamicRef` found on (or evaluated at) `node`.
    ///
    /// The anchor name is the whole fragment of `reference`, percent-decoded. The
    /// innermost resource declaring it wins.
    pub fn resolve_dynamic_ref(&self, node: SchemaId, reference: &str) -> Option<SchemaId> {
        let name = dynamic_anchor_name(reference)?;
        let found = self
            .stack(node)
            .iter()
            .rev()
            .find_map(|resource| resource.get(&name));
        if found.is_none() {
            tracing::debug!(
                node = node.index(),
                reference,
                "no enclosing resource declares the dynamic anchor"
            );
        }
        found
    }
}

/// Extracts the anchor name of a dynamic reference (`...#name`).
pub fn dynamic_anchor_name(reference: &str) -> Option<String> {
    let (_, fragment) = split_fragment(reference.trim());
    let name = percent_decode_lossy(fragment?);
    (!name.is_empty()).then_some(name)
}

/// Collects the dynamic anchors declared inside the resource opened by `owner`,
/// without descending into nested resources.
fn collect_resource(graph: &SchemaGraph, owner: SchemaId) -> DynamicAnchorResource {
    let mut anchors = IndexMap::new();
    graph.walk(owner, |id, node| {
        if id != owner && node.resource_id().is_some() {
            return Walk::SkipChildren;
        }
        if let Some(name) = node.dynamic_anchor_name() {
            anchors.insert(name.to_string(), id);
        }
        Walk::Continue
    });
    DynamicAnchorResource { owner, anchors }
}
