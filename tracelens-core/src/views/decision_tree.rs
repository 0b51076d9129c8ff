//! Decision-tree view: nodes and edges with tidy-tree coordinates.
//!
//! Leaves take consecutive vertical slots in preorder and every parent sits
//! at the midpoint of its first and last child, so sibling subtrees occupy
//! disjoint slot ranges and never overlap. `x` grows with depth.

use serde::{Deserialize, Serialize};

use crate::config::ViewConfig;
use crate::hierarchy::SpanTree;
use crate::path::SelectedPath;
use crate::span::{SpanId, SpanKind, SpanStatus};
use crate::views::{truncate_label, ConfidenceBand};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionTreeNode {
    pub id: SpanId,
    pub label: String,
    pub kind: SpanKind,
    pub status: SpanStatus,
    pub depth: usize,
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
    pub band: ConfidenceBand,
    /// On the selected path.
    pub is_selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionTreeEdge {
    pub from: SpanId,
    pub to: SpanId,
    pub is_selected: bool,
}

/// Layout-ready decision tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionTreeViewModel {
    /// Nodes in preorder.
    pub nodes: Vec<DecisionTreeNode>,
    /// One edge per non-root node, in preorder of the child.
    pub edges: Vec<DecisionTreeEdge>,
    /// Extent of node centres along x.
    pub width: f64,
    /// Extent of node centres along y.
    pub height: f64,
}

impl DecisionTreeViewModel {
    pub fn node(&self, id: &SpanId) -> Option<&DecisionTreeNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}

/// Lay out the tree and mark the selected path.
pub fn render(tree: &SpanTree, path: &SelectedPath, config: &ViewConfig) -> DecisionTreeViewModel {
    if tree.is_empty() {
        return DecisionTreeViewModel::default();
    }

    let order: Vec<_> = tree.preorder().collect();

    // Slots are indexed by arrival, which is also the arena index.
    let mut slots = vec![0.0f64; tree.len()];
    let mut next_leaf = 0usize;
    for node in &order {
        if node.is_leaf() {
            slots[node.arrival] = next_leaf as f64;
            next_leaf += 1;
        }
    }
    // Reverse preorder sees every child before its parent.
    for node in order.iter().rev() {
        if let (Some(&first), Some(&last)) = (node.children.first(), node.children.last()) {
            slots[node.arrival] = (slots[first] + slots[last]) / 2.0;
        }
    }

    let nodes: Vec<DecisionTreeNode> = order
        .iter()
        .map(|node| DecisionTreeNode {
            id: node.id().clone(),
            label: truncate_label(&node.span.name, config.label_max_chars),
            kind: node.span.kind,
            status: node.span.status,
            depth: node.depth,
            x: node.depth as f64 * config.level_spacing,
            y: slots[node.arrival] * config.min_vertical_gap,
            confidence: node.span.confidence,
            band: ConfidenceBand::from_confidence(node.span.confidence),
            is_selected: path.contains(node.id()),
        })
        .collect();

    let edges = order
        .iter()
        .filter_map(|node| {
            let parent = tree.parent(node)?;
            Some(DecisionTreeEdge {
                from: parent.id().clone(),
                to: node.id().clone(),
                is_selected: path.contains_edge(parent.id(), node.id()),
            })
        })
        .collect();

    DecisionTreeViewModel {
        nodes,
        edges,
        width: tree.max_depth() as f64 * config.level_spacing,
        height: next_leaf.saturating_sub(1) as f64 * config.min_vertical_gap,
    }
}
