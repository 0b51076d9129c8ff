//! Ingestion of raw span records into canonical form.
//!
//! The wire schema is strict: unknown fields, missing required fields and
//! out-of-range values are rejected here instead of leaking into the views.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::error::IngestError;
use crate::span::types::*;

/// A span as delivered by the trace producer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawSpan {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub name: String,
    pub kind: SpanKind,
    pub start_offset_ms: u64,
    pub duration_ms: u64,
    pub confidence: f64,
    pub status: SpanStatus,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(default)]
    pub metadata: Option<HashMap<String, Value>>,
}

impl RawSpan {
    fn into_span(self) -> Span {
        Span {
            id: SpanId(self.id),
            parent_id: self.parent_id.map(SpanId),
            name: self.name,
            kind: self.kind,
            start_offset_ms: self.start_offset_ms,
            duration_ms: self.duration_ms,
            confidence: self.confidence,
            status: self.status,
            is_selected: self.is_selected,
            metadata: self.metadata,
        }
    }
}

/// A trace as delivered by the trace producer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawTrace {
    pub id: String,
    pub agent_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: TraceStatus,
    pub spans: Vec<RawSpan>,
}

/// Outcome of [`SpanStore::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// New span appended in arrival order.
    Inserted,
    /// Existing span replaced in its original arrival slot.
    Replaced,
}

/// Validated spans of one trace, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct SpanStore {
    /// Upper bound for span end offsets, when the trace duration is final.
    trace_duration_ms: Option<u64>,
    spans: Vec<Span>,
    index: HashMap<SpanId, usize>,
}

impl SpanStore {
    /// Create an empty store with no duration bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject spans that end after `duration_ms`.
    pub fn with_trace_duration(mut self, duration_ms: u64) -> Self {
        self.trace_duration_ms = Some(duration_ms);
        self
    }

    /// Normalize and append a raw span. Duplicate ids are rejected.
    pub fn ingest(&mut self, raw: RawSpan) -> Result<&Span, IngestError> {
        self.insert(raw.into_span())
    }

    /// Append an already-typed span. Duplicate ids are rejected.
    pub fn insert(&mut self, span: Span) -> Result<&Span, IngestError> {
        self.validate(&span)?;
        if self.index.contains_key(&span.id) {
            return Err(IngestError::DuplicateSpan(span.id));
        }
        let slot = self.spans.len();
        self.index.insert(span.id.clone(), slot);
        self.spans.push(span);
        Ok(&self.spans[slot])
    }

    /// Insert a span, or replace the earlier record with the same id.
    ///
    /// A replaced span keeps its original arrival slot so sibling order is
    /// stable while a live trace is being updated.
    pub fn upsert(&mut self, span: Span) -> Result<Upsert, IngestError> {
        self.validate(&span)?;
        match self.index.get(&span.id) {
            Some(&slot) => {
                debug!(span_id = %span.id, status = %span.status, "replacing span");
                self.spans[slot] = span;
                Ok(Upsert::Replaced)
            }
            None => {
                let slot = self.spans.len();
                self.index.insert(span.id.clone(), slot);
                self.spans.push(span);
                Ok(Upsert::Inserted)
            }
        }
    }

    /// Get a span by id.
    pub fn get(&self, id: &SpanId) -> Option<&Span> {
        self.index.get(id).map(|&slot| &self.spans[slot])
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn into_spans(self) -> Vec<Span> {
        self.spans
    }

    fn validate(&self, span: &Span) -> Result<(), IngestError> {
        if span.id.as_str().is_empty() {
            return Err(IngestError::EmptyId { field: "span" });
        }
        if matches!(&span.parent_id, Some(p) if p.as_str().is_empty()) {
            return Err(IngestError::EmptyId { field: "parent" });
        }
        if !span.confidence.is_finite() || !(0.0..=1.0).contains(&span.confidence) {
            return Err(IngestError::ConfidenceOutOfRange {
                span: span.id.clone(),
                value: span.confidence,
            });
        }
        if let Some(trace_ms) = self.trace_duration_ms {
            let end_ms = span.end_offset_ms();
            if end_ms > trace_ms {
                return Err(IngestError::SpanExceedsTrace {
                    span: span.id.clone(),
                    end_ms,
                    trace_ms,
                });
            }
        }
        Ok(())
    }
}

/// Normalize a raw trace into a validated [`Trace`].
///
/// Span end offsets are only checked against the trace duration once the
/// trace is no longer running; a live trace's duration is still growing.
pub fn normalize_trace(raw: RawTrace) -> Result<Trace, IngestError> {
    if raw.id.is_empty() {
        return Err(IngestError::EmptyId { field: "trace" });
    }

    let mut store = SpanStore::new();
    if raw.status != TraceStatus::Running {
        store = store.with_trace_duration(raw.duration_ms);
    }
    for span in raw.spans {
        store.ingest(span)?;
    }
    debug!(trace_id = %raw.id, spans = store.len(), "normalized trace");

    Ok(Trace {
        id: TraceId(raw.id),
        agent_id: raw.agent_id,
        started_at: raw.started_at,
        duration_ms: raw.duration_ms,
        status: raw.status,
        spans: store.into_spans(),
    })
}

impl TryFrom<RawSpan> for Span {
    type Error = IngestError;

    /// Per-span checks only; duplicate ids and the duration bound need the
    /// enclosing trace.
    fn try_from(raw: RawSpan) -> Result<Self, Self::Error> {
        let span = raw.into_span();
        SpanStore::new().validate(&span)?;
        Ok(span)
    }
}

impl TryFrom<RawTrace> for Trace {
    type Error = IngestError;

    fn try_from(raw: RawTrace) -> Result<Self, Self::Error> {
        normalize_trace(raw)
    }
}

impl Trace {
    /// Parse and validate a trace from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, IngestError> {
        let raw: RawTrace =
            serde_json::from_str(json).map_err(|e| IngestError::Malformed(e.to_string()))?;
        normalize_trace(raw)
    }

    /// Parse and validate a trace from an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, IngestError> {
        let raw: RawTrace =
            serde_json::from_value(value).map_err(|e| IngestError::Malformed(e.to_string()))?;
        normalize_trace(raw)
    }

    /// Export as pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_trace(spans: Value) -> Value {
        json!({
            "id": "tr-1",
            "agentId": "agent-1",
            "startedAt": "2026-01-05T10:00:00Z",
            "durationMs": 1000,
            "status": "completed",
            "spans": spans,
        })
    }

    fn raw_span(id: &str, parent: Option<&str>) -> Value {
        json!({
            "id": id,
            "parentId": parent,
            "name": format!("step {}", id),
            "kind": "thought",
            "startOffsetMs": 0,
            "durationMs": 100,
            "confidence": 0.5,
            "status": "completed",
        })
    }

    #[test]
    fn test_from_json_keeps_arrival_order() {
        let payload = raw_trace(json!([
            raw_span("b", Some("a")),
            raw_span("a", None),
            raw_span("c", Some("a")),
        ]));

        let trace = Trace::from_value(payload).unwrap();
        let ids: Vec<_> = trace.spans.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(trace.status, TraceStatus::Completed);
        assert!(!trace.spans[0].is_selected);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let mut span = raw_span("a", None);
        span["surprise"] = json!(true);
        let err = Trace::from_value(raw_trace(json!([span]))).unwrap_err();
        assert!(matches!(err, IngestError::Malformed(_)));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let mut span = raw_span("a", None);
        span.as_object_mut().unwrap().remove("confidence");
        let err = Trace::from_value(raw_trace(json!([span]))).unwrap_err();
        assert!(matches!(err, IngestError::Malformed(msg) if msg.contains("confidence")));
    }

    #[test]
    fn test_confidence_out_of_range() {
        let mut span = raw_span("a", None);
        span["confidence"] = json!(1.5);
        let err = Trace::from_value(raw_trace(json!([span]))).unwrap_err();
        assert_eq!(
            err,
            IngestError::ConfidenceOutOfRange {
                span: SpanId::from("a"),
                value: 1.5
            }
        );
    }

    #[test]
    fn test_span_exceeding_finished_trace() {
        let mut span = raw_span("a", None);
        span["startOffsetMs"] = json!(950);
        let err = Trace::from_value(raw_trace(json!([span]))).unwrap_err();
        assert!(matches!(
            err,
            IngestError::SpanExceedsTrace { end_ms: 1050, trace_ms: 1000, .. }
        ));
    }

    #[test]
    fn test_running_trace_skips_duration_bound() {
        let mut span = raw_span("a", None);
        span["startOffsetMs"] = json!(950);
        let mut payload = raw_trace(json!([span]));
        payload["status"] = json!("running");
        assert!(Trace::from_value(payload).is_ok());
    }

    #[test]
    fn test_duplicate_span_rejected() {
        let payload = raw_trace(json!([raw_span("a", None), raw_span("a", None)]));
        let err = Trace::from_value(payload).unwrap_err();
        assert_eq!(err, IngestError::DuplicateSpan(SpanId::from("a")));
    }

    #[test]
    fn test_empty_ids_rejected() {
        let err = Trace::from_value(raw_trace(json!([raw_span("", None)]))).unwrap_err();
        assert_eq!(err, IngestError::EmptyId { field: "span" });

        let mut payload = raw_trace(json!([]));
        payload["id"] = json!("");
        let err = Trace::from_value(payload).unwrap_err();
        assert_eq!(err, IngestError::EmptyId { field: "trace" });
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut store = SpanStore::new();
        store
            .insert(Span::new("root", SpanKind::Thought, "root"))
            .unwrap();
        store
            .insert(Span::new("x", SpanKind::Tool, "x").with_parent("root"))
            .unwrap();

        let updated = Span::new("root", SpanKind::Thought, "root")
            .with_status(SpanStatus::Completed)
            .with_confidence(0.9);
        assert_eq!(store.upsert(updated).unwrap(), Upsert::Replaced);
        assert_eq!(store.spans()[0].status, SpanStatus::Completed);

        let added = Span::new("y", SpanKind::Tool, "y").with_parent("root");
        assert_eq!(store.upsert(added).unwrap(), Upsert::Inserted);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(&SpanId::from("y")).unwrap().name, "y");
    }

    #[test]
    fn test_serde_deserialize_applies_wire_checks() {
        let mut extra = raw_trace(json!([raw_span("a", None)]));
        extra["surprise"] = json!(1);
        assert!(serde_json::from_value::<Trace>(extra).is_err());

        let mut late = raw_span("a", None);
        late["startOffsetMs"] = json!(950);
        let err = serde_json::from_value::<Trace>(raw_trace(json!([late]))).unwrap_err();
        assert!(err.to_string().contains("after trace end"), "{}", err);

        let mut span = raw_span("s", None);
        span["confidence"] = json!(-0.2);
        assert!(serde_json::from_value::<Span>(span).is_err());

        let span: Span = serde_json::from_value(raw_span("s", Some("p"))).unwrap();
        assert_eq!(span.parent_id, Some(SpanId::from("p")));
    }

    #[test]
    fn test_trace_json_roundtrip_through_validation() {
        let trace = Trace::new("tr-9", "agent")
            .with_duration(500)
            .with_status(TraceStatus::Completed)
            .with_span(
                Span::new("r", SpanKind::Decision, "root")
                    .with_timing(0, 500)
                    .with_status(SpanStatus::Completed)
                    .selected(),
            );

        let json = trace.to_json().unwrap();
        let parsed = Trace::from_json(&json).unwrap();
        assert_eq!(parsed, trace);
    }
}
