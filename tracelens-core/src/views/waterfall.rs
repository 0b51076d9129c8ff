//! Waterfall view: one bar per span on a shared time axis.
//!
//! Rows keep preorder (structural) order so indentation reads as the
//! hierarchy; only the bar position depends on time.

use serde::{Deserialize, Serialize};

use crate::config::ViewConfig;
use crate::hierarchy::SpanTree;
use crate::span::{SpanId, SpanKind, SpanStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallRow {
    pub span_id: SpanId,
    pub name: String,
    pub depth: usize,
    pub left_pct: f64,
    pub width_pct: f64,
    pub kind: SpanKind,
    pub status: SpanStatus,
    pub start_offset_ms: u64,
    pub duration_ms: u64,
    /// Bar is wide enough to carry its own label.
    pub label_visible: bool,
}

/// Ruler mark on the time axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallTick {
    pub pct: f64,
    pub offset_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallViewModel {
    pub total_duration_ms: u64,
    pub rows: Vec<WaterfallRow>,
    pub ticks: Vec<WaterfallTick>,
}

/// Flatten the tree into time-normalized rows.
///
/// A zero `total_duration_ms` puts every bar at 0% with the minimum width.
pub fn render(tree: &SpanTree, total_duration_ms: u64, config: &ViewConfig) -> WaterfallViewModel {
    let min_width = config.min_visible_width_pct;
    let total = total_duration_ms as f64;

    let rows = tree
        .preorder()
        .map(|node| {
            let span = &node.span;
            let (left_pct, width_pct) = if total_duration_ms == 0 {
                (0.0, min_width)
            } else {
                (
                    span.start_offset_ms as f64 / total * 100.0,
                    (span.duration_ms as f64 / total * 100.0).max(min_width),
                )
            };
            WaterfallRow {
                span_id: span.id.clone(),
                name: span.name.clone(),
                depth: node.depth,
                left_pct,
                width_pct,
                kind: span.kind,
                status: span.status,
                start_offset_ms: span.start_offset_ms,
                duration_ms: span.duration_ms,
                label_visible: width_pct > config.waterfall_label_min_pct,
            }
        })
        .collect();

    WaterfallViewModel {
        total_duration_ms,
        rows,
        ticks: ticks(total_duration_ms, config.waterfall_tick_count),
    }
}

fn ticks(total_duration_ms: u64, count: usize) -> Vec<WaterfallTick> {
    if count == 0 {
        return Vec::new();
    }
    (0..=count)
        .map(|i| {
            let fraction = i as f64 / count as f64;
            WaterfallTick {
                pct: fraction * 100.0,
                offset_ms: (total_duration_ms as f64 * fraction).round() as u64,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::build;
    use crate::span::Span;
    use pretty_assertions::assert_eq;

    fn timed(id: &str, parent: Option<&str>, start: u64, duration: u64) -> Span {
        let s = Span::new(id, SpanKind::Action, id).with_timing(start, duration);
        match parent {
            Some(p) => s.with_parent(p),
            None => s,
        }
    }

    #[test]
    fn test_single_root_spans_full_width() {
        let tree = build(&[timed("root", None, 0, 2000)]).unwrap();
        let view = render(&tree, 2000, &ViewConfig::default());

        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].left_pct, 0.0);
        assert_eq!(view.rows[0].width_pct, 100.0);
        assert!(view.rows[0].label_visible);
    }

    #[test]
    fn test_rows_keep_structural_order() {
        // b starts before a but arrives after it
        let tree = build(&[
            timed("root", None, 0, 1000),
            timed("a", Some("root"), 600, 200),
            timed("b", Some("root"), 100, 300),
            timed("a1", Some("a"), 650, 50),
        ])
        .unwrap();
        let view = render(&tree, 1000, &ViewConfig::default());

        let order: Vec<_> = view
            .rows
            .iter()
            .map(|r| (r.span_id.as_str(), r.depth))
            .collect();
        assert_eq!(order, vec![("root", 0), ("a", 1), ("a1", 2), ("b", 1)]);
        assert_eq!(view.rows[1].left_pct, 60.0);
        assert_eq!(view.rows[1].width_pct, 20.0);
        assert_eq!(view.rows[2].width_pct, 5.0);
        assert!(!view.rows[2].label_visible);
    }

    #[test]
    fn test_zero_duration_span_stays_visible() {
        let tree = build(&[
            timed("root", None, 0, 1000),
            timed("instant", Some("root"), 500, 0),
        ])
        .unwrap();
        let view = render(&tree, 1000, &ViewConfig::default());
        assert_eq!(view.rows[1].width_pct, 0.5);
        assert_eq!(view.rows[1].left_pct, 50.0);
    }

    #[test]
    fn test_zero_total_duration() {
        let tree = build(&[
            timed("root", None, 0, 0),
            timed("child", Some("root"), 0, 0),
        ])
        .unwrap();
        let view = render(&tree, 0, &ViewConfig::default());

        for row in &view.rows {
            assert_eq!(row.left_pct, 0.0);
            assert_eq!(row.width_pct, 0.5);
        }
        assert!(view.ticks.iter().all(|t| t.offset_ms == 0));
    }

    #[test]
    fn test_ruler_ticks() {
        let view = render(&SpanTree::empty(), 1234, &ViewConfig::default());
        assert!(view.rows.is_empty());
        assert_eq!(view.ticks.len(), 11);
        assert_eq!(view.ticks[0], WaterfallTick { pct: 0.0, offset_ms: 0 });
        assert_eq!(view.ticks[1].offset_ms, 123);
        assert_eq!(view.ticks[5].offset_ms, 617);
        assert_eq!(view.ticks[10], WaterfallTick { pct: 100.0, offset_ms: 1234 });
    }
}
