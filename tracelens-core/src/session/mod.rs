//! Trace session: fetch, derive and cache views for one selected trace.
//!
//! The session is a small state machine (`Empty` → `Loading` → `Ready`)
//! around the pure [`pipeline`](crate::pipeline). It owns its cached views
//! exclusively and hands them out read-only, as one [`Snapshot`] or per view.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tracelens_core::session::{InMemoryTraceSource, TraceSession};
//!
//! let source = Arc::new(InMemoryTraceSource::new());
//! source.insert(trace).await;
//!
//! let session = Arc::new(TraceSession::with_defaults(source.clone()));
//! session.select_trace("tr-1").await?;
//! let tree = session.decision_tree_view();
//!
//! // Keep the views current while the agent is still running.
//! let follower = session.clone();
//! tokio::spawn(async move {
//!     follower.follow_live_updates(source.subscribe_live_updates()).await
//! });
//! ```

#[allow(clippy::module_inception)]
mod session;
mod source;
mod state;

pub use session::{Snapshot, TraceSession};
#[cfg(feature = "http")]
pub use source::{HttpSourceConfig, HttpTraceSource};
pub use source::{InMemoryTraceSource, TraceQuery, TraceSource};
pub use state::{LoadOutcome, SessionError, SessionEvent, SessionState, SessionStatus};
