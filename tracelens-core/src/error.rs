//! Error types for tracelens-core.

use thiserror::Error;

use crate::span::{SpanId, TraceId};

/// Result type alias using tracelens-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere in the trace pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// The span graph could not be turned into a tree
    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    /// A raw trace payload failed schema validation
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// The trace source could not deliver a trace
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing an export artifact failed
    #[error("Export error: {0}")]
    Export(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an export error.
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error came from the trace source.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

/// Malformed span graphs detected while reconstructing the tree.
///
/// These are data errors, not crashes: the session recovers from them by
/// publishing an empty view-model set with the error attached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// Zero or several spans claim to be the root.
    #[error("expected exactly one root span, found {found}")]
    InvalidRootCount { found: usize },

    /// A span points at a parent id that is not in the trace.
    #[error("span '{0}' references a parent that does not exist")]
    DanglingParent(SpanId),

    /// Some spans cannot be reached from the root.
    #[error("{unreachable} span(s) unreachable from the root (cycle or detached fragment)")]
    Cycle { unreachable: usize },

    /// The same span id appears more than once.
    #[error("span id '{0}' appears more than once")]
    DuplicateSpan(SpanId),
}

/// Strict-schema failures while normalizing raw span records.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    /// Payload is not valid JSON for the trace schema (includes unknown and missing fields).
    #[error("malformed trace payload: {0}")]
    Malformed(String),

    /// A span or trace id was empty.
    #[error("empty {field} id")]
    EmptyId { field: &'static str },

    /// Confidence was non-finite or outside [0, 1].
    #[error("span '{span}' has confidence {value} outside [0, 1]")]
    ConfidenceOutOfRange { span: SpanId, value: f64 },

    /// Span ends after the trace ends.
    #[error("span '{span}' ends at {end_ms}ms, after trace end {trace_ms}ms")]
    SpanExceedsTrace {
        span: SpanId,
        end_ms: u64,
        trace_ms: u64,
    },

    /// A span id was delivered twice in one payload.
    #[error("duplicate span id '{0}'")]
    DuplicateSpan(SpanId),
}

/// Failures from the external trace source. Opaque to the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The source does not know this trace.
    #[error("trace '{0}' not found")]
    NotFound(TraceId),

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The source answered with a non-success status.
    #[error("trace source returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// The payload could not be decoded into a trace.
    #[error("could not parse trace payload: {0}")]
    Parse(String),
}

impl From<IngestError> for FetchError {
    fn from(err: IngestError) -> Self {
        Self::Parse(err.to_string())
    }
}
