//! Node tree data model.
//!
//! A transform turns raw JSON into nested `VisualNode`s. `NodeTree` takes
//! ownership of them and stores the hierarchy in a petgraph graph where
//! edges are parent→child. The pre-order flattening of that graph is the
//! working set for layout and collision, and links are regenerated from it
//! wholesale whenever the tree changes.
//!
//! Positions are deliberately *not* stored here; see [`crate::positions`].

use crate::id::NodeId;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};

/// Hard cap on tree depth. Deeper input is cut off (the node is kept as a
/// leaf) so traversal always terminates.
pub const MAX_TREE_DEPTH: usize = 512;

// ─── Nodes ───────────────────────────────────────────────────────────────

/// What kind of JSON value a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Object,
    Array,
    Leaf,
}

/// A visual tree element produced by a data transformer.
///
/// Children are owned by their parent while the node is being built. Once
/// handed to [`NodeTree`], `children` is emptied and the hierarchy lives in
/// the graph; `child_count` keeps the number of direct children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualNode {
    pub id: NodeId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub kind: NodeKind,
    pub level: u32,
    /// The JSON value this node was built from.
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<VisualNode>,
    #[serde(default)]
    pub child_count: usize,
}

impl VisualNode {
    pub fn new(id: &str, name: impl Into<String>, kind: NodeKind, level: u32) -> Self {
        Self {
            id: NodeId::intern(id),
            name: name.into(),
            value: None,
            kind,
            level,
            data: serde_json::Value::Null,
            metadata: BTreeMap::new(),
            children: Vec::new(),
            child_count: 0,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<VisualNode>) -> Self {
        self.child_count = children.len();
        self.children = children;
        self
    }

    /// Attach a metadata entry.
    pub fn set_meta(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn is_leaf(&self) -> bool {
        self.child_count == 0 && self.children.is_empty()
    }
}

// ─── Links ───────────────────────────────────────────────────────────────

/// A directed parent→child edge. Never created independently of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
}

impl Link {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }

    /// Whether `id` is either end of this link.
    pub fn touches(&self, id: NodeId) -> bool {
        self.source == id || self.target == id
    }
}

// ─── Tree ────────────────────────────────────────────────────────────────

/// The node hierarchy for one render.
#[derive(Debug, Clone, Default)]
pub struct NodeTree {
    /// The underlying directed graph (parent → child edges).
    pub graph: StableDiGraph<VisualNode, ()>,

    /// Top-level nodes in transform order.
    pub roots: Vec<NodeIndex>,

    /// Index from NodeId → NodeIndex for fast lookup.
    pub id_index: HashMap<NodeId, NodeIndex>,
}

impl NodeTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from transformer output.
    ///
    /// Nodes are inserted in pre-order, so sorting a node's children by
    /// `NodeIndex` yields their original order. Repeated ids are made unique
    /// with a numeric suffix and nesting deeper than [`MAX_TREE_DEPTH`] is cut.
    pub fn from_roots(roots: Vec<VisualNode>) -> Self {
        let mut tree = Self::new();
        let mut stack: Vec<(Option<NodeIndex>, VisualNode, usize)> =
            roots.into_iter().rev().map(|n| (None, n, 0)).collect();

        while let Some((parent, mut node, depth)) = stack.pop() {
            let mut children = std::mem::take(&mut node.children);
            if depth >= MAX_TREE_DEPTH && !children.is_empty() {
                log::warn!(
                    "node {} exceeds max tree depth {MAX_TREE_DEPTH}; dropping {} children",
                    node.id,
                    children.len()
                );
                children.clear();
            }
            node.child_count = children.len();

            let idx = match parent {
                Some(p) => tree.add_child(p, node),
                None => tree.add_root(node),
            };
            stack.extend(children.into_iter().rev().map(|c| (Some(idx), c, depth + 1)));
        }

        tree
    }

    /// Add a top-level node.
    pub fn add_root(&mut self, node: VisualNode) -> NodeIndex {
        let idx = self.insert(node);
        self.roots.push(idx);
        idx
    }

    /// Add `node` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeIndex, node: VisualNode) -> NodeIndex {
        let idx = self.insert(node);
        self.graph.add_edge(parent, idx, ());
        let count = self.children(parent).len();
        self.graph[parent].child_count = count;
        idx
    }

    fn insert(&mut self, mut node: VisualNode) -> NodeIndex {
        if self.id_index.contains_key(&node.id) {
            let original = node.id;
            let mut n = 2;
            while self.id_index.contains_key(&original.with_suffix(n)) {
                n += 1;
            }
            node.id = original.with_suffix(n);
            log::debug!("duplicate node id {original}; renamed to {}", node.id);
        }
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        idx
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Look up a node by id.
    pub fn get(&self, id: NodeId) -> Option<&VisualNode> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    /// Get the index for a NodeId.
    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &VisualNode {
        &self.graph[idx]
    }

    /// Get children of a node in transform order.
    ///
    /// Sorts by `NodeIndex` so the result is deterministic regardless of
    /// how `petgraph` iterates its adjacency list.
    pub fn children(&self, idx: NodeIndex) -> SmallVec<[NodeIndex; 8]> {
        let mut children: SmallVec<[NodeIndex; 8]> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .collect();
        children.sort();
        children
    }

    /// Pre-order traversal of the whole forest ("all nodes").
    ///
    /// Uses an explicit stack and stops after visiting every node once, so
    /// it terminates even if the graph was corrupted into a cycle.
    pub fn flatten(&self) -> Vec<NodeIndex> {
        let limit = self.graph.node_count();
        let mut out = Vec::with_capacity(limit);
        let mut stack: Vec<NodeIndex> = self.roots.iter().rev().copied().collect();

        while let Some(idx) = stack.pop() {
            if out.len() >= limit {
                log::warn!("tree traversal visited more nodes than exist; stopping");
                break;
            }
            out.push(idx);
            stack.extend(self.children(idx).into_iter().rev());
        }
        out
    }

    /// Node ids in pre-order.
    pub fn flattened_ids(&self) -> Vec<NodeId> {
        self.flatten().into_iter().map(|i| self.graph[i].id).collect()
    }

    /// Exactly one link per parent→child edge, in pre-order of the parent.
    pub fn links(&self) -> Vec<Link> {
        let mut links = Vec::with_capacity(self.graph.edge_count());
        for idx in self.flatten() {
            let source = self.graph[idx].id;
            for child in self.children(idx) {
                links.push(Link::new(source, self.graph[child].id));
            }
        }
        links
    }
}
