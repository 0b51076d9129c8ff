//! Reconstruction of a rooted tree from flat parent references.

use std::collections::HashMap;

use tracing::debug;

use crate::error::HierarchyError;
use crate::hierarchy::tree::{NodeIndex, SpanTree, SpanTreeNode};
use crate::span::{Span, Trace};

/// Build a [`SpanTree`] from spans in arrival order.
///
/// Fails when the spans do not have exactly one root, when a parent id is
/// unknown, or when some spans cannot be reached from the root. An empty
/// slice yields an empty tree.
pub fn build(spans: &[Span]) -> Result<SpanTree, HierarchyError> {
    if spans.is_empty() {
        return Ok(SpanTree::empty());
    }

    let mut index = HashMap::with_capacity(spans.len());
    for (i, span) in spans.iter().enumerate() {
        if index.insert(span.id.clone(), i).is_some() {
            return Err(HierarchyError::DuplicateSpan(span.id.clone()));
        }
    }

    let roots: Vec<NodeIndex> = spans
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_root())
        .map(|(i, _)| i)
        .collect();
    let root = match roots.as_slice() {
        [root] => *root,
        _ => return Err(HierarchyError::InvalidRootCount { found: roots.len() }),
    };

    let mut nodes: Vec<SpanTreeNode> = spans
        .iter()
        .enumerate()
        .map(|(i, span)| SpanTreeNode {
            span: span.clone(),
            arrival: i,
            depth: 0,
            parent: None,
            children: Vec::new(),
        })
        .collect();

    for (i, span) in spans.iter().enumerate() {
        let Some(parent_id) = &span.parent_id else {
            continue;
        };
        let parent = *index
            .get(parent_id)
            .ok_or_else(|| HierarchyError::DanglingParent(span.id.clone()))?;
        nodes[i].parent = Some(parent);
        nodes[parent].children.push(i);
    }

    // Depth-first from the root; anything left unvisited is cyclic or detached.
    let mut visited = vec![false; nodes.len()];
    let mut stack = vec![(root, 0usize)];
    let mut reached = 0;
    while let Some((idx, depth)) = stack.pop() {
        if visited[idx] {
            continue;
        }
        visited[idx] = true;
        reached += 1;
        nodes[idx].depth = depth;
        stack.extend(
            nodes[idx]
                .children
                .iter()
                .rev()
                .filter(|&&child| !visited[child])
                .map(|&child| (child, depth + 1)),
        );
    }

    if reached != nodes.len() {
        return Err(HierarchyError::Cycle {
            unreachable: nodes.len() - reached,
        });
    }

    let tree = SpanTree {
        nodes,
        index,
        root: Some(root),
    };
    debug!(nodes = tree.len(), max_depth = tree.max_depth(), "built span tree");
    Ok(tree)
}

impl SpanTree {
    /// Build the tree for a whole trace.
    pub fn from_trace(trace: &Trace) -> Result<Self, HierarchyError> {
        build(&trace.spans)
    }
}
