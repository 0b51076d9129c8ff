//! Hierarchy builder: rooted span trees from flat parent references.
//!
//! Traces arrive as a flat list of spans where each span names its parent.
//! [`build`] turns that list into a [`SpanTree`] with depths assigned and
//! children kept in arrival order, or reports why it cannot:
//!
//! - **InvalidRootCount**: zero or several spans without a parent
//! - **DanglingParent**: a parent id that is not in the trace
//! - **Cycle**: spans that cannot be reached from the root
//!
//! ## Example
//!
//! ```rust,ignore
//! use tracelens_core::hierarchy::build;
//!
//! let tree = build(&trace.spans)?;
//! for node in tree.preorder() {
//!     println!("{}{}", "  ".repeat(node.depth), node.span.name);
//! }
//! ```

mod builder;
mod proptest;
mod tree;

pub use builder::build;
pub use tree::{NodeIndex, Preorder, SpanTree, SpanTreeNode, TreeStats};
