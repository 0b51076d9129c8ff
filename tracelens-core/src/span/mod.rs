//! Span store: canonical representation of raw agent traces.
//!
//! A trace is a flat list of spans in arrival order, each pointing at its
//! parent by id. This module owns the strict wire schema and the validated
//! in-memory types; it knows nothing about trees or views.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tracelens_core::span::{Span, SpanKind, SpanStatus, Trace};
//!
//! let trace = Trace::from_json(payload)?;
//! println!("{} spans, root: {}", trace.spans.len(), trace.summary().root_name);
//! ```

mod store;
mod types;

pub use store::{normalize_trace, RawSpan, RawTrace, SpanStore, Upsert};
pub use types::{
    Span, SpanId, SpanKind, SpanStatus, Trace, TraceId, TraceStatus, TraceSummary,
};
