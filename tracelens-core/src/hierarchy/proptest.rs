//! Property-based tests for tree reconstruction and the derived views.
//!
//! Random well-formed traces are generated as random parent assignments
//! (each span's parent arrived earlier in id order) delivered in a shuffled
//! arrival order. The properties checked:
//!
//! - depth(child) = depth(parent) + 1 and depth(root) = 0
//! - no span is lost or duplicated
//! - the selected path is a root-anchored chain of real edges
//! - every view covers the same span ids
//! - rendering is idempotent

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest::sample::Index;
    use std::collections::BTreeSet;

    use crate::config::ViewConfig;
    use crate::error::HierarchyError;
    use crate::hierarchy::build;
    use crate::path::select;
    use crate::span::{Span, SpanId, SpanKind, SpanStatus};
    use crate::views::{decision_tree, reasoning_chain, tot, waterfall};

    fn arb_status() -> impl Strategy<Value = SpanStatus> {
        prop_oneof![
            Just(SpanStatus::Pending),
            Just(SpanStatus::Running),
            Just(SpanStatus::Completed),
            Just(SpanStatus::Completed),
            Just(SpanStatus::Failed),
            Just(SpanStatus::Skipped),
        ]
    }

    // Well-formed span lists: span 0 is the root, span i > 0 has a parent < i.
    fn arb_spans() -> impl Strategy<Value = Vec<Span>> {
        (1usize..40)
            .prop_flat_map(|n| {
                (
                    prop::collection::vec(any::<Index>(), n),
                    prop::collection::vec(0.0f64..=1.0, n),
                    prop::collection::vec(arb_status(), n),
                    prop::collection::vec(0u64..500, n),
                    prop::collection::vec(0u64..500, n),
                    any::<bool>(),
                    Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
                )
            })
            .prop_map(|(parents, confidence, status, start, duration, flag_last, order)| {
                let n = order.len();
                order
                    .into_iter()
                    .map(|i| {
                        let name = format!("step {}", i);
                        let mut span = Span::new(format!("s{}", i), SpanKind::Thought, name)
                            .with_timing(start[i], duration[i])
                            .with_confidence(confidence[i])
                            .with_status(status[i]);
                        if i > 0 {
                            span = span.with_parent(format!("s{}", parents[i].index(i)));
                        }
                        if flag_last && i == n - 1 {
                            span = span.selected();
                        }
                        span
                    })
                    .collect()
            })
    }

    fn id_set<'a>(ids: impl Iterator<Item = &'a SpanId>) -> BTreeSet<String> {
        ids.map(|id| id.as_str().to_string()).collect()
    }

    proptest! {
        /// Every child sits exactly one level below its parent.
        #[test]
        fn depth_invariant(spans in arb_spans()) {
            let tree = build(&spans).unwrap();
            for node in tree.nodes() {
                match tree.parent(node) {
                    Some(parent) => prop_assert_eq!(node.depth, parent.depth + 1),
                    None => {
                        prop_assert_eq!(node.depth, 0);
                        prop_assert!(node.span.is_root());
                    }
                }
            }
        }

        /// The tree holds each input span exactly once.
        #[test]
        fn tree_is_complete(spans in arb_spans()) {
            let tree = build(&spans).unwrap();
            prop_assert_eq!(tree.len(), spans.len());
            prop_assert_eq!(tree.preorder().count(), spans.len());
            prop_assert_eq!(
                id_set(tree.preorder().map(|n| n.id())),
                id_set(spans.iter().map(|s| &s.id))
            );
        }

        /// Siblings keep their arrival order.
        #[test]
        fn children_keep_arrival_order(spans in arb_spans()) {
            let tree = build(&spans).unwrap();
            for node in tree.nodes() {
                let arrivals: Vec<_> = tree.children(node).map(|c| c.arrival).collect();
                let mut sorted = arrivals.clone();
                sorted.sort_unstable();
                prop_assert_eq!(arrivals, sorted);
            }
        }

        /// The selected path starts at the root and follows real edges.
        #[test]
        fn path_is_connected(spans in arb_spans()) {
            let tree = build(&spans).unwrap();
            let path = select(&tree);
            if let Some(first) = path.root() {
                prop_assert_eq!(Some(first), tree.root().map(|r| r.id()));
            }
            for (from, to) in path.edges() {
                let child = tree.get(to).unwrap();
                let parent = tree.parent(child).unwrap();
                prop_assert_eq!(parent.id(), from);
            }
            for id in &path.ids {
                let span = &tree.get(id).unwrap().span;
                prop_assert!(span.status == SpanStatus::Completed || span.is_selected);
            }
        }

        /// All four views are total over the same set of spans.
        #[test]
        fn views_cover_same_spans(spans in arb_spans(), filter in any::<bool>()) {
            let tree = build(&spans).unwrap();
            let path = select(&tree);
            let config = ViewConfig::default();

            let dt = decision_tree::render(&tree, &path, &config);
            let wf = waterfall::render(&tree, 1000, &config);
            let rc = reasoning_chain::render(&tree);
            let tt = tot::render(&tree, &path, filter, &config);

            let expected = id_set(spans.iter().map(|s| &s.id));
            prop_assert_eq!(&id_set(dt.nodes.iter().map(|n| &n.id)), &expected);
            prop_assert_eq!(&id_set(wf.rows.iter().map(|r| &r.span_id)), &expected);
            prop_assert_eq!(&id_set(rc.steps.iter().map(|s| &s.span_id)), &expected);
            let tot_ids = id_set(
                tt.levels
                    .iter()
                    .flat_map(|l| l.node_ids.iter().chain(l.hidden_node_ids.iter())),
            );
            prop_assert_eq!(&tot_ids, &expected);
            prop_assert_eq!(tt.levels.len(), tree.max_depth() + 1);
        }

        /// Rendering twice yields identical output.
        #[test]
        fn rendering_is_idempotent(spans in arb_spans(), filter in any::<bool>()) {
            let tree = build(&spans).unwrap();
            let path = select(&tree);
            prop_assert_eq!(&path, &select(&tree));

            let config = ViewConfig::default();
            prop_assert_eq!(
                decision_tree::render(&tree, &path, &config),
                decision_tree::render(&tree, &path, &config)
            );
            prop_assert_eq!(
                waterfall::render(&tree, 750, &config),
                waterfall::render(&tree, 750, &config)
            );
            prop_assert_eq!(reasoning_chain::render(&tree), reasoning_chain::render(&tree));
            prop_assert_eq!(
                tot::render(&tree, &path, filter, &config),
                tot::render(&tree, &path, filter, &config)
            );
        }

        /// Waterfall bars never fall below the minimum width.
        #[test]
        fn waterfall_widths_are_visible(spans in arb_spans(), total in 0u64..2000) {
            let tree = build(&spans).unwrap();
            let config = ViewConfig::default();
            let view = waterfall::render(&tree, total, &config);
            for row in &view.rows {
                prop_assert!(row.width_pct >= config.min_visible_width_pct);
                prop_assert!(row.left_pct >= 0.0);
            }
        }

        /// Pointing any non-root span at a missing parent is reported, never panics.
        #[test]
        fn dangling_parent_is_reported(spans in arb_spans(), pick in any::<Index>()) {
            prop_assume!(spans.len() > 1);
            let mut spans = spans;
            let non_root: Vec<usize> = (0..spans.len()).filter(|&i| !spans[i].is_root()).collect();
            let victim = non_root[pick.index(non_root.len())];
            spans[victim].parent_id = Some(SpanId::from("missing"));

            prop_assert_eq!(
                build(&spans).unwrap_err(),
                HierarchyError::DanglingParent(spans[victim].id.clone())
            );
        }
    }
}
