//! Canonical span and trace types.
//!
//! These are the validated, in-memory forms produced by the [`SpanStore`].
//! Wire records are parsed separately and only become `Span`/`Trace` values
//! after passing ingestion checks.
//!
//! [`SpanStore`]: super::SpanStore

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Identifier of a span, unique within its trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpanId(pub String);

impl SpanId {
    /// Create from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random span id.
    pub fn generate() -> Self {
        Self(format!("sp-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SpanId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SpanId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SpanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(pub String);

impl TraceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random trace id.
    pub fn generate() -> Self {
        Self(format!("tr-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TraceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TraceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of agent work a span records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    /// Internal reasoning step.
    Thought,
    /// Branching point between candidate continuations.
    Decision,
    /// Concrete step taken in the environment.
    Action,
    /// External tool invocation.
    Tool,
    /// Memory read or write.
    Memory,
    /// Combining earlier results into an answer.
    Synthesize,
    /// Information observed from the environment.
    Observation,
}

impl SpanKind {
    /// All kinds, in declaration order.
    pub const ALL: [SpanKind; 7] = [
        Self::Thought,
        Self::Decision,
        Self::Action,
        Self::Tool,
        Self::Memory,
        Self::Synthesize,
        Self::Observation,
    ];

    /// Get a human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Thought => "Reasoning step",
            Self::Decision => "Decision point",
            Self::Action => "Action taken",
            Self::Tool => "Tool call",
            Self::Memory => "Memory access",
            Self::Synthesize => "Synthesis",
            Self::Observation => "Observed fact",
        }
    }
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thought => write!(f, "thought"),
            Self::Decision => write!(f, "decision"),
            Self::Action => write!(f, "action"),
            Self::Tool => write!(f, "tool"),
            Self::Memory => write!(f, "memory"),
            Self::Synthesize => write!(f, "synthesize"),
            Self::Observation => write!(f, "observation"),
        }
    }
}

/// Lifecycle status of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// The agent decided not to run this step.
    Skipped,
}

impl SpanStatus {
    /// Whether the span will not change any more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

impl std::fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Overall status of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One recorded unit of agent work.
///
/// Deserializing goes through the strict wire schema in [`RawSpan`].
///
/// [`RawSpan`]: crate::span::RawSpan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "crate::span::RawSpan")]
pub struct Span {
    /// Unique identifier within the trace.
    pub id: SpanId,

    /// Parent span; `None` only for the root.
    pub parent_id: Option<SpanId>,

    /// Human-readable name.
    pub name: String,

    pub kind: SpanKind,

    /// Start, relative to trace start.
    pub start_offset_ms: u64,

    pub duration_ms: u64,

    /// Confidence score (0.0 - 1.0).
    pub confidence: f64,

    pub status: SpanStatus,

    /// Explicitly marked as part of the resolved path by the producer.
    pub is_selected: bool,

    /// Producer-specific extras (prompts, tool arguments, token counts).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl Span {
    /// Create a pending root-less span with zero timing.
    pub fn new(id: impl Into<SpanId>, kind: SpanKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            name: name.into(),
            kind,
            start_offset_ms: 0,
            duration_ms: 0,
            confidence: 0.0,
            status: SpanStatus::Pending,
            is_selected: false,
            metadata: None,
        }
    }

    /// Set the parent span.
    pub fn with_parent(mut self, parent: impl Into<SpanId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    /// Set start offset and duration.
    pub fn with_timing(mut self, start_offset_ms: u64, duration_ms: u64) -> Self {
        self.start_offset_ms = start_offset_ms;
        self.duration_ms = duration_ms;
        self
    }

    /// Set the confidence score, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_status(mut self, status: SpanStatus) -> Self {
        self.status = status;
        self
    }

    /// Mark as explicitly selected by the producer.
    pub fn selected(mut self) -> Self {
        self.is_selected = true;
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get a metadata value.
    pub fn get_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref()?.get(key)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// End offset relative to trace start.
    pub fn end_offset_ms(&self) -> u64 {
        self.start_offset_ms.saturating_add(self.duration_ms)
    }
}

/// The full set of spans produced by one agent run.
///
/// Deserializing validates like [`Trace::from_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "crate::span::RawTrace")]
pub struct Trace {
    pub id: TraceId,

    pub agent_id: String,

    pub started_at: DateTime<Utc>,

    pub duration_ms: u64,

    pub status: TraceStatus,

    /// Spans in arrival order (not hierarchical order).
    pub spans: Vec<Span>,
}

impl Trace {
    /// Create an empty running trace starting now.
    pub fn new(id: impl Into<TraceId>, agent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            started_at: Utc::now(),
            duration_ms: 0,
            status: TraceStatus::Running,
            spans: Vec::new(),
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_status(mut self, status: TraceStatus) -> Self {
        self.status = status;
        self
    }

    /// Append a span in arrival order.
    pub fn with_span(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }

    /// Get a span by id.
    pub fn get_span(&self, id: &SpanId) -> Option<&Span> {
        self.spans.iter().find(|s| &s.id == id)
    }

    /// The first span without a parent, if any.
    pub fn root(&self) -> Option<&Span> {
        self.spans.iter().find(|s| s.is_root())
    }

    /// Summary row for trace listings.
    pub fn summary(&self) -> TraceSummary {
        TraceSummary {
            trace_id: self.id.clone(),
            agent_id: self.agent_id.clone(),
            span_count: self.spans.len(),
            root_name: self
                .root()
                .map(|s| s.name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            total_duration_ms: self.duration_ms,
            status: self.status,
        }
    }
}

/// Compact description of a trace for list views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSummary {
    pub trace_id: TraceId,
    pub agent_id: String,
    pub span_count: usize,
    pub root_name: String,
    pub total_duration_ms: u64,
    pub status: TraceStatus,
}
