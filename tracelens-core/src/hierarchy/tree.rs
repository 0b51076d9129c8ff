//! Rooted span tree reconstructed from parent references.

use std::collections::HashMap;

use crate::span::{Span, SpanId, SpanKind, SpanStatus};

/// Position of a node in the tree arena (equal to the span's arrival index).
pub type NodeIndex = usize;

/// A span placed in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanTreeNode {
    pub span: Span,

    /// Arrival position in the source trace; also this node's arena index.
    pub arrival: NodeIndex,

    /// Distance from the root (root = 0).
    pub depth: usize,

    pub parent: Option<NodeIndex>,

    /// Children in arrival order.
    pub children: Vec<NodeIndex>,
}

impl SpanTreeNode {
    pub fn id(&self) -> &SpanId {
        &self.span.id
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Tree of spans, owned by the hierarchy builder.
///
/// Nodes are stored in arrival order; structure lives in the parent and
/// children indices. Rebuilt from scratch whenever the trace changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanTree {
    pub(crate) nodes: Vec<SpanTreeNode>,
    pub(crate) index: HashMap<SpanId, NodeIndex>,
    pub(crate) root: Option<NodeIndex>,
}

impl SpanTree {
    /// A tree with no nodes.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Get the root node.
    pub fn root(&self) -> Option<&SpanTreeNode> {
        self.root.map(|idx| &self.nodes[idx])
    }

    /// Get a node by arena index.
    pub fn node(&self, idx: NodeIndex) -> Option<&SpanTreeNode> {
        self.nodes.get(idx)
    }

    /// Get a node by span id.
    pub fn get(&self, id: &SpanId) -> Option<&SpanTreeNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn contains(&self, id: &SpanId) -> bool {
        self.index.contains_key(id)
    }

    /// All nodes in arrival order.
    pub fn nodes(&self) -> &[SpanTreeNode] {
        &self.nodes
    }

    /// Children of a node, in arrival order.
    pub fn children<'a>(
        &'a self,
        node: &'a SpanTreeNode,
    ) -> impl Iterator<Item = &'a SpanTreeNode> {
        node.children.iter().map(move |&idx| &self.nodes[idx])
    }

    /// Parent of a node.
    pub fn parent(&self, node: &SpanTreeNode) -> Option<&SpanTreeNode> {
        node.parent.map(|idx| &self.nodes[idx])
    }

    /// Iterate over nodes in preorder (parent before children, siblings in arrival order).
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder::new(self)
    }

    /// Get all leaf nodes, in preorder.
    pub fn leaves(&self) -> Vec<&SpanTreeNode> {
        self.preorder().filter(|n| n.is_leaf()).collect()
    }

    /// Nodes grouped by depth, each level in preorder.
    pub fn levels(&self) -> Vec<Vec<&SpanTreeNode>> {
        let mut levels: Vec<Vec<&SpanTreeNode>> = Vec::new();
        for node in self.preorder() {
            if levels.len() <= node.depth {
                levels.resize_with(node.depth + 1, Vec::new);
            }
            levels[node.depth].push(node);
        }
        levels
    }

    /// Deepest depth in the tree (0 for a single root or an empty tree).
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Get the path from root to a specific node.
    pub fn path_to(&self, target: &SpanId) -> Vec<&SpanTreeNode> {
        let mut path = Vec::new();
        let mut current = self.get(target);
        while let Some(node) = current {
            path.push(node);
            current = self.parent(node);
        }
        path.reverse();
        path
    }

    /// Summary statistics.
    pub fn stats(&self) -> TreeStats {
        let mut kind_counts: HashMap<SpanKind, usize> = HashMap::new();
        let mut status_counts: HashMap<SpanStatus, usize> = HashMap::new();
        for node in &self.nodes {
            *kind_counts.entry(node.span.kind).or_default() += 1;
            *status_counts.entry(node.span.status).or_default() += 1;
        }

        TreeStats {
            total_nodes: self.nodes.len(),
            leaf_count: self.nodes.iter().filter(|n| n.is_leaf()).count(),
            max_depth: self.max_depth(),
            kind_counts,
            status_counts,
        }
    }
}

/// Preorder iterator over a span tree.
pub struct Preorder<'a> {
    tree: &'a SpanTree,
    stack: Vec<NodeIndex>,
}

impl<'a> Preorder<'a> {
    fn new(tree: &'a SpanTree) -> Self {
        Self {
            tree,
            stack: tree.root.into_iter().collect(),
        }
    }
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a SpanTreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.stack.pop()?;
        let node = &self.tree.nodes[idx];
        // Reverse so the first-arrived child is visited first
        self.stack.extend(node.children.iter().rev().copied());
        Some(node)
    }
}

/// Statistics about a span tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub leaf_count: usize,
    pub max_depth: usize,
    pub kind_counts: HashMap<SpanKind, usize>,
    pub status_counts: HashMap<SpanStatus, usize>,
}
