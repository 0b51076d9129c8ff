//! Trace → tree → path → views.
//!
//! [`derive`] is a pure function of the trace and layout config. The trace
//! session is its only stateful caller and caches the result.

use tracing::{debug, warn};

use crate::config::ViewConfig;
use crate::error::HierarchyError;
use crate::hierarchy::{self, SpanTree};
use crate::path::{self, SelectedPath};
use crate::span::Trace;
use crate::views::{decision_tree, reasoning_chain, tot, waterfall, ViewModelSet};

/// Everything derived from one trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Derived {
    pub tree: SpanTree,
    pub path: SelectedPath,
    pub views: ViewModelSet,
    /// Set when the trace could not be turned into a tree; `views` is then empty.
    pub error: Option<HierarchyError>,
}

impl Derived {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Render all four views from an already-built tree and path.
pub fn render_views(
    trace: &Trace,
    tree: &SpanTree,
    path: &SelectedPath,
    show_only_selected: bool,
    config: &ViewConfig,
) -> ViewModelSet {
    ViewModelSet {
        trace_id: Some(trace.id.clone()),
        selected_path: path.clone(),
        decision_tree: decision_tree::render(tree, path, config),
        waterfall: waterfall::render(tree, trace.duration_ms, config),
        reasoning_chain: reasoning_chain::render(tree),
        tree_of_thought: tot::render(tree, path, show_only_selected, config),
    }
}

/// Build the tree, select the path and render every view.
///
/// Hierarchy errors are recovered here: the result carries the empty view
/// set and the error instead of failing.
pub fn derive(trace: &Trace, show_only_selected: bool, config: &ViewConfig) -> Derived {
    let tree = match hierarchy::build(&trace.spans) {
        Ok(tree) => tree,
        Err(err) => {
            warn!(trace_id = %trace.id, error = %err, "malformed trace, rendering empty views");
            return Derived {
                tree: SpanTree::empty(),
                path: SelectedPath::default(),
                views: ViewModelSet::empty_for(trace.id.clone()),
                error: Some(err),
            };
        }
    };

    let path = path::select(&tree);
    let views = render_views(trace, &tree, &path, show_only_selected, config);
    debug!(
        trace_id = %trace.id,
        spans = tree.len(),
        path_len = path.len(),
        "derived view models"
    );

    Derived {
        tree,
        path,
        views,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{Span, SpanId, SpanKind, SpanStatus, TraceStatus};

    fn trace() -> Trace {
        Trace::new("tr-1", "agent")
            .with_duration(1000)
            .with_status(TraceStatus::Completed)
            .with_span(
                Span::new("root", SpanKind::Thought, "root")
                    .with_timing(0, 1000)
                    .with_status(SpanStatus::Completed)
                    .with_confidence(0.9),
            )
            .with_span(
                Span::new("a", SpanKind::Tool, "a")
                    .with_parent("root")
                    .with_timing(100, 300)
                    .with_status(SpanStatus::Completed)
                    .with_confidence(0.7),
            )
    }

    #[test]
    fn test_derive_renders_all_views() {
        let derived = derive(&trace(), false, &ViewConfig::default());
        assert!(!derived.is_degraded());
        assert_eq!(derived.tree.len(), 2);
        assert_eq!(derived.path.len(), 2);

        let views = &derived.views;
        assert_eq!(views.trace_id, Some("tr-1".into()));
        assert_eq!(views.decision_tree.nodes.len(), 2);
        assert_eq!(views.waterfall.rows.len(), 2);
        assert_eq!(views.waterfall.total_duration_ms, 1000);
        assert_eq!(views.reasoning_chain.steps.len(), 2);
        assert_eq!(views.tree_of_thought.levels.len(), 2);
        assert_eq!(views.selected_path, derived.path);
    }

    #[test]
    fn test_dangling_parent_degrades() {
        let trace =
            trace().with_span(Span::new("lost", SpanKind::Memory, "lost").with_parent("ghost"));
        let derived = derive(&trace, false, &ViewConfig::default());

        assert_eq!(
            derived.error,
            Some(HierarchyError::DanglingParent(SpanId::from("lost")))
        );
        assert!(derived.views.is_empty());
        assert_eq!(derived.views.trace_id, Some("tr-1".into()));
        assert!(derived.tree.is_empty());
    }

    #[test]
    fn test_derive_is_deterministic() {
        let config = ViewConfig::default();
        assert_eq!(derive(&trace(), true, &config), derive(&trace(), true, &config));
    }
}
