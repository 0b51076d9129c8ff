//! Path selector: the reasoning route a trace actually followed.
//!
//! Starting at the root, the selector repeatedly steps to the best eligible
//! child until none is left. Every view reads the resulting [`SelectedPath`];
//! none of them recompute it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hierarchy::{SpanTree, SpanTreeNode};
use crate::span::{SpanId, SpanStatus};

/// Root-to-leaf chain of span ids, each consecutive pair a real tree edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedPath {
    pub ids: Vec<SpanId>,
}

impl SelectedPath {
    pub fn new(ids: Vec<SpanId>) -> Self {
        Self { ids }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the span lies on the path.
    pub fn contains(&self, id: &SpanId) -> bool {
        self.ids.contains(id)
    }

    /// Whether `from -> to` appear consecutively on the path.
    pub fn contains_edge(&self, from: &SpanId, to: &SpanId) -> bool {
        self.ids.windows(2).any(|w| &w[0] == from && &w[1] == to)
    }

    pub fn root(&self) -> Option<&SpanId> {
        self.ids.first()
    }

    /// Last span on the path.
    pub fn leaf(&self) -> Option<&SpanId> {
        self.ids.last()
    }

    /// Consecutive parent/child pairs along the path.
    pub fn edges(&self) -> impl Iterator<Item = (&SpanId, &SpanId)> {
        self.ids.windows(2).map(|w| (&w[0], &w[1]))
    }
}

/// Rule for walking from the root to the selected leaf.
pub trait SelectionPolicy {
    /// Whether a node may be on the path at all.
    fn is_eligible(&self, node: &SpanTreeNode) -> bool;

    /// Pick the next step among `children`, given in arrival order.
    fn choose<'a>(&self, children: &[&'a SpanTreeNode]) -> Option<&'a SpanTreeNode>;
}

/// Default policy: completed (or producer-flagged) child with the highest
/// confidence, flagged children first, ties to the earliest arrival.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestConfidence;

impl HighestConfidence {
    fn outranks(a: &SpanTreeNode, b: &SpanTreeNode) -> bool {
        match (a.span.is_selected, b.span.is_selected) {
            (true, false) => true,
            (false, true) => false,
            _ => a.span.confidence > b.span.confidence,
        }
    }
}

impl SelectionPolicy for HighestConfidence {
    fn is_eligible(&self, node: &SpanTreeNode) -> bool {
        node.span.is_selected || node.span.status == SpanStatus::Completed
    }

    fn choose<'a>(&self, children: &[&'a SpanTreeNode]) -> Option<&'a SpanTreeNode> {
        let mut best: Option<&'a SpanTreeNode> = None;
        for &child in children.iter().filter(|c| self.is_eligible(c)) {
            best = match best {
                // Strictly better only, so earlier arrivals keep ties
                Some(current) if !Self::outranks(child, current) => Some(current),
                _ => Some(child),
            };
        }
        best
    }
}

/// Select the path with the default policy.
pub fn select(tree: &SpanTree) -> SelectedPath {
    select_with(tree, &HighestConfidence)
}

/// Select the path with a custom policy.
pub fn select_with<P: SelectionPolicy + ?Sized>(tree: &SpanTree, policy: &P) -> SelectedPath {
    let Some(root) = tree.root() else {
        return SelectedPath::default();
    };
    if !policy.is_eligible(root) {
        debug!(root = %root.id(), "root not eligible, empty path");
        return SelectedPath::default();
    }

    let mut ids = vec![root.id().clone()];
    let mut current = root;
    loop {
        let children: Vec<&SpanTreeNode> = tree.children(current).collect();
        match policy.choose(&children) {
            Some(next) => {
                ids.push(next.id().clone());
                current = next;
            }
            None => break,
        }
    }

    debug!(len = ids.len(), leaf = %current.id(), "selected path");
    SelectedPath { ids }
}
