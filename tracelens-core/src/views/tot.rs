//! Tree-of-thought view: candidate thoughts grouped by depth.
//!
//! A lossy projection. With `show_only_selected` set, nodes off the selected
//! path are hidden, but their ids stay in their level's `hidden_node_ids` and
//! no level is ever removed, so level spacing is stable across toggles.

use serde::{Deserialize, Serialize};

use crate::config::ViewConfig;
use crate::hierarchy::SpanTree;
use crate::path::SelectedPath;
use crate::span::{SpanId, SpanKind, SpanStatus};
use crate::views::{truncate_label, ConfidenceBand};

const LEVEL_LABELS: [&str; 5] = ["problem", "strategy", "approach", "execution", "result"];

/// Display name for a depth level.
pub fn level_label(depth: usize) -> String {
    LEVEL_LABELS
        .get(depth)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("stage {}", depth))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Quadratic curve from parent to child.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoints {
    pub from: Point,
    pub control: Point,
    pub to: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToTLevel {
    pub depth: usize,
    pub label: String,
    /// Visible nodes, in preorder.
    pub node_ids: Vec<SpanId>,
    /// Nodes at this depth filtered out of the view.
    pub hidden_node_ids: Vec<SpanId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToTNode {
    pub id: SpanId,
    pub label: String,
    pub kind: SpanKind,
    pub status: SpanStatus,
    pub depth: usize,
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
    pub band: ConfidenceBand,
    pub is_selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToTEdge {
    pub from: SpanId,
    pub to: SpanId,
    pub is_selected: bool,
    pub curve: CurvePoints,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToTViewModel {
    /// One entry per depth, ascending.
    pub levels: Vec<ToTLevel>,
    /// Positioned visible nodes.
    pub nodes: Vec<ToTNode>,
    pub edges: Vec<ToTEdge>,
    pub selected_path: SelectedPath,
    pub show_only_selected: bool,
}

impl ToTViewModel {
    pub fn level(&self, depth: usize) -> Option<&ToTLevel> {
        self.levels.get(depth)
    }

    pub fn node(&self, id: &SpanId) -> Option<&ToTNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}

/// Group nodes by depth and lay them out on the configured canvas.
pub fn render(
    tree: &SpanTree,
    path: &SelectedPath,
    show_only_selected: bool,
    config: &ViewConfig,
) -> ToTViewModel {
    let grouped = tree.levels();
    let is_visible = |id: &SpanId| !show_only_selected || path.contains(id);

    let levels: Vec<ToTLevel> = grouped
        .iter()
        .enumerate()
        .map(|(depth, nodes)| {
            let (visible, hidden): (Vec<_>, Vec<_>) =
                nodes.iter().map(|n| n.id().clone()).partition(|id| is_visible(id));
            ToTLevel {
                depth,
                label: level_label(depth),
                node_ids: visible,
                hidden_node_ids: hidden,
            }
        })
        .collect();

    // Columns come from every level; rows only from what is shown.
    let level_width = config.tot_width / levels.len().max(1) as f64;
    let max_visible = levels.iter().map(|l| l.node_ids.len()).max().unwrap_or(0);
    let node_spacing = config.tot_height / (max_visible + 1) as f64;

    // Positions indexed by arena slot; None for hidden nodes.
    let mut positions: Vec<Option<Point>> = vec![None; tree.len()];
    let mut nodes = Vec::new();
    for (depth, level_nodes) in grouped.iter().enumerate() {
        let visible = level_nodes.iter().filter(|n| is_visible(n.id()));
        for (slot, node) in visible.enumerate() {
            let point = Point {
                x: depth as f64 * level_width,
                y: (slot + 1) as f64 * node_spacing,
            };
            positions[node.arrival] = Some(point);
            nodes.push(ToTNode {
                id: node.id().clone(),
                label: truncate_label(&node.span.name, config.label_max_chars),
                kind: node.span.kind,
                status: node.span.status,
                depth,
                x: point.x,
                y: point.y,
                confidence: node.span.confidence,
                band: ConfidenceBand::from_confidence(node.span.confidence),
                is_selected: path.contains(node.id()),
            });
        }
    }

    let edges = tree
        .preorder()
        .filter_map(|node| {
            let parent = tree.parent(node)?;
            let from = positions[parent.arrival]?;
            let to = positions[node.arrival]?;
            Some(ToTEdge {
                from: parent.id().clone(),
                to: node.id().clone(),
                is_selected: path.contains_edge(parent.id(), node.id()),
                curve: CurvePoints {
                    from,
                    control: Point {
                        x: (from.x + to.x) / 2.0,
                        y: from.y,
                    },
                    to,
                },
            })
        })
        .collect();

    ToTViewModel {
        levels,
        nodes,
        edges,
        selected_path: path.clone(),
        show_only_selected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::build;
    use crate::path::select;
    use crate::span::Span;
    use pretty_assertions::assert_eq;

    fn span(id: &str, parent: Option<&str>, status: SpanStatus, confidence: f64) -> Span {
        let s = Span::new(id, SpanKind::Thought, id)
            .with_status(status)
            .with_confidence(confidence);
        match parent {
            Some(p) => s.with_parent(p),
            None => s,
        }
    }

    fn sample() -> SpanTree {
        use SpanStatus::*;
        build(&[
            span("root", None, Completed, 1.0),
            span("a", Some("root"), Completed, 0.9),
            span("b", Some("root"), Completed, 0.4),
            span("a1", Some("a"), Running, 0.5),
            span("b1", Some("b"), Completed, 0.8),
        ])
        .unwrap()
    }

    fn ids(ids: &[SpanId]) -> Vec<&str> {
        ids.iter().map(|id| id.as_str()).collect()
    }

    #[test]
    fn test_levels_group_by_depth() {
        let tree = sample();
        let view = render(&tree, &select(&tree), false, &ViewConfig::default());

        assert_eq!(view.levels.len(), 3);
        assert_eq!(ids(&view.levels[1].node_ids), vec!["a", "b"]);
        assert_eq!(ids(&view.levels[2].node_ids), vec!["a1", "b1"]);
        assert_eq!(view.levels[0].label, "problem");
        assert_eq!(view.levels[2].label, "approach");
        assert!(view.levels.iter().all(|l| l.hidden_node_ids.is_empty()));
        assert_eq!(view.nodes.len(), 5);
        assert_eq!(view.edges.len(), 4);
    }

    #[test]
    fn test_filter_keeps_empty_levels() {
        let tree = sample();
        let path = select(&tree);
        // Path is root -> a; a1 is still running.
        assert_eq!(ids(&path.ids), vec!["root", "a"]);

        let view = render(&tree, &path, true, &ViewConfig::default());
        assert_eq!(view.levels.len(), 3);
        assert!(view.levels[2].node_ids.is_empty());
        assert_eq!(ids(&view.levels[2].hidden_node_ids), vec!["a1", "b1"]);
        assert_eq!(ids(&view.levels[1].hidden_node_ids), vec!["b"]);

        let edges: Vec<_> = view
            .edges
            .iter()
            .map(|e| (e.from.as_str(), e.to.as_str(), e.is_selected))
            .collect();
        assert_eq!(edges, vec![("root", "a", true)]);
    }

    #[test]
    fn test_layout_and_curves() {
        let tree = sample();
        let config = ViewConfig::default().tot_canvas(900.0, 300.0);
        let view = render(&tree, &select(&tree), false, &config);

        // 3 levels -> 300 wide columns; at most 2 per level -> 100 spacing
        let b1 = view.node(&SpanId::from("b1")).unwrap();
        assert_eq!((b1.x, b1.y), (600.0, 200.0));
        let root = view.node(&SpanId::from("root")).unwrap();
        assert_eq!((root.x, root.y), (0.0, 100.0));

        let edge = view
            .edges
            .iter()
            .find(|e| e.to == SpanId::from("b"))
            .unwrap();
        assert_eq!(edge.curve.from, Point { x: 0.0, y: 100.0 });
        assert_eq!(edge.curve.to, Point { x: 300.0, y: 200.0 });
        assert_eq!(edge.curve.control, Point { x: 150.0, y: 100.0 });
        assert!(!edge.is_selected);
    }

    #[test]
    fn test_deep_level_labels() {
        assert_eq!(level_label(4), "result");
        assert_eq!(level_label(5), "stage 5");
    }

    #[test]
    fn test_empty_tree() {
        let view = render(
            &SpanTree::empty(),
            &SelectedPath::default(),
            true,
            &ViewConfig::default(),
        );
        assert!(view.levels.is_empty());
        assert!(view.nodes.is_empty());
        assert!(view.show_only_selected);
    }
}
