//! Session state machine, events and load outcomes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{FetchError, HierarchyError};
use crate::span::{SpanId, TraceId};

/// Lifecycle of the session's cached view models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No trace loaded.
    Empty,
    /// A fetch is in flight.
    Loading,
    /// Tree and all four view models are cached.
    Ready,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// Last non-fatal error seen by the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Trace loaded but could not be turned into a tree.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// Trace could not be fetched; the previous views stay visible.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Notifications published to renderers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    /// A new view-model set was swapped in.
    ViewsUpdated {
        trace_id: Option<TraceId>,
        degraded: bool,
    },
    ActiveNodeChanged(Option<SpanId>),
    Error(SessionError),
}

impl SessionEvent {
    /// Get the event type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::StateChanged(_) => "state_changed",
            Self::ViewsUpdated { .. } => "views_updated",
            Self::ActiveNodeChanged(_) => "active_node_changed",
            Self::Error(_) => "error",
        }
    }
}

/// How a `select_trace`/`refresh_trace` call ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Views rebuilt from the fetched trace.
    Ready,
    /// Trace fetched but malformed; empty views are shown with this error.
    Degraded(HierarchyError),
    /// A newer load started first; nothing was committed.
    Superseded,
    /// `refresh_trace` with no current trace.
    NoTraceSelected,
}

impl LoadOutcome {
    /// Whether this call committed a new view-model set.
    pub fn committed(&self) -> bool {
        matches!(self, Self::Ready | Self::Degraded(_))
    }
}

/// Point-in-time view of the session's bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub current_trace_id: Option<TraceId>,
    pub active_node_id: Option<SpanId>,
    pub last_error: Option<SessionError>,
}
