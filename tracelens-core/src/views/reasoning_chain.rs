//! Reasoning-chain view: the trace read as a numbered transcript.

use serde::{Deserialize, Serialize};

use crate::hierarchy::SpanTree;
use crate::span::{SpanId, SpanKind, SpanStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningStep {
    /// 1-based position in preorder.
    pub order: usize,
    pub span_id: SpanId,
    pub name: String,
    pub kind: SpanKind,
    pub status: SpanStatus,
    pub started_at_ms: u64,
    pub duration_ms: u64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningChainViewModel {
    pub steps: Vec<ReasoningStep>,
    /// Sum of step durations.
    pub total_duration_ms: u64,
}

/// One step per span in preorder; depth and selection do not affect order.
pub fn render(tree: &SpanTree) -> ReasoningChainViewModel {
    let steps: Vec<ReasoningStep> = tree
        .preorder()
        .enumerate()
        .map(|(i, node)| ReasoningStep {
            order: i + 1,
            span_id: node.span.id.clone(),
            name: node.span.name.clone(),
            kind: node.span.kind,
            status: node.span.status,
            started_at_ms: node.span.start_offset_ms,
            duration_ms: node.span.duration_ms,
            confidence: node.span.confidence,
        })
        .collect();

    let total_duration_ms = steps
        .iter()
        .fold(0u64, |acc, s| acc.saturating_add(s.duration_ms));

    ReasoningChainViewModel {
        steps,
        total_duration_ms,
    }
}
