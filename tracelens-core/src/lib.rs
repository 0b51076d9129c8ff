//! # tracelens-core
//!
//! View-model derivation for agent execution traces. A trace is a flat list
//! of spans (thoughts, decisions, tool calls, ...) that point at their
//! parents; this crate rebuilds the hierarchy, resolves the path the agent
//! actually took, and projects the result into four mutually consistent
//! views ready for rendering.
//!
//! ## Core Components
//!
//! - **Span**: strict wire schema and validated `Span`/`Trace` types
//! - **Hierarchy**: rooted `SpanTree` from parent references, with error reporting
//! - **Path**: the single selected path every view highlights
//! - **Views**: decision tree, waterfall, reasoning chain, tree of thought
//! - **Session**: fetch, derive and cache for one selected trace, last request wins
//!
//! ## Example
//!
//! ```rust,ignore
//! use tracelens_core::{pipeline, Trace, ViewConfig};
//!
//! let trace = Trace::from_json(payload)?;
//! let derived = pipeline::derive(&trace, false, &ViewConfig::default());
//! if let Some(err) = &derived.error {
//!     eprintln!("malformed trace: {}", err);
//! }
//! for step in &derived.views.reasoning_chain.steps {
//!     println!("{}. {} ({})", step.order, step.name, step.kind);
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod hierarchy;
pub mod path;
pub mod pipeline;
pub mod session;
pub mod span;
pub mod views;

// Re-exports for convenience
pub use config::{SessionConfig, ViewConfig};
pub use error::{Error, FetchError, HierarchyError, IngestError, Result};
pub use export::{export_views, suggested_output_path, ExportFormat, ExportOptions, ExportResult};
pub use hierarchy::{build, SpanTree, SpanTreeNode, TreeStats};
pub use path::{select, select_with, HighestConfidence, SelectedPath, SelectionPolicy};
pub use pipeline::{derive, Derived};
#[cfg(feature = "http")]
pub use session::{HttpSourceConfig, HttpTraceSource};
pub use session::{
    InMemoryTraceSource, LoadOutcome, SessionError, SessionEvent, SessionState, SessionStatus,
    Snapshot, TraceQuery, TraceSession, TraceSource,
};
pub use span::{
    Span, SpanId, SpanKind, SpanStatus, SpanStore, Trace, TraceId, TraceStatus, TraceSummary,
};
pub use views::{
    ConfidenceBand, DecisionTreeViewModel, ReasoningChainViewModel, ToTViewModel, ViewModelSet,
    WaterfallViewModel,
};
