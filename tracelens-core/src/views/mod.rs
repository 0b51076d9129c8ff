//! View adapters: four projections of one span tree.
//!
//! Each adapter is a pure function of the tree (and, where relevant, the
//! selected path and layout config). None of them selects a path on its
//! own, so highlighting agrees across every view.
//!
//! - [`decision_tree`]: node/edge lists with tidy-tree coordinates
//! - [`waterfall`]: structural rows positioned on the time axis
//! - [`reasoning_chain`]: numbered transcript in preorder
//! - [`tot`]: depth-grouped levels with curved connectors

pub mod decision_tree;
pub mod reasoning_chain;
pub mod tot;
pub mod waterfall;

use serde::{Deserialize, Serialize};

use crate::path::SelectedPath;
use crate::span::TraceId;

pub use decision_tree::{DecisionTreeEdge, DecisionTreeNode, DecisionTreeViewModel};
pub use reasoning_chain::{ReasoningChainViewModel, ReasoningStep};
pub use tot::{CurvePoints, Point, ToTEdge, ToTLevel, ToTNode, ToTViewModel};
pub use waterfall::{WaterfallRow, WaterfallTick, WaterfallViewModel};

/// Coarse confidence bucket used for node colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            Self::High
        } else if confidence >= 0.6 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Cut `label` to `max_chars` characters, appending `...` when cut.
pub fn truncate_label(label: &str, max_chars: usize) -> String {
    match label.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &label[..byte_idx]),
        None => label.to_string(),
    }
}

/// All four view models for one trace, swapped as a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModelSet {
    pub trace_id: Option<TraceId>,
    pub selected_path: SelectedPath,
    pub decision_tree: DecisionTreeViewModel,
    pub waterfall: WaterfallViewModel,
    pub reasoning_chain: ReasoningChainViewModel,
    pub tree_of_thought: ToTViewModel,
}

impl ViewModelSet {
    /// The degenerate set rendered for "no data".
    pub fn empty() -> Self {
        Self::default()
    }

    /// Empty set tagged with the trace it stands in for.
    pub fn empty_for(trace_id: TraceId) -> Self {
        Self {
            trace_id: Some(trace_id),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.decision_tree.nodes.is_empty()
    }
}
