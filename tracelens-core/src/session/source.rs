//! Trace sources: where the session gets raw traces from.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::error::FetchError;
use crate::span::{Span, SpanStore, Trace, TraceId, TraceStatus, TraceSummary, Upsert};

/// Filter for [`TraceSource::list_traces`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceQuery {
    /// Maximum number of summaries, at most [`TraceQuery::MAX_LIMIT`].
    pub limit: usize,
    /// Only traces in this state.
    pub status: Option<TraceStatus>,
}

impl Default for TraceQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            status: None,
        }
    }
}

impl TraceQuery {
    pub const MAX_LIMIT: usize = 100;

    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limit, clamped to `1..=MAX_LIMIT`.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, Self::MAX_LIMIT);
        self
    }

    pub fn status(mut self, status: TraceStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn matches(&self, summary: &TraceSummary) -> bool {
        self.status.map_or(true, |status| summary.status == status)
    }
}

/// Supplier of traces. Failures are opaque to the pipeline.
#[async_trait]
pub trait TraceSource: Send + Sync {
    /// Fetch a complete trace by id.
    async fn fetch_trace(&self, id: &TraceId) -> Result<Trace, FetchError>;

    /// List the traces this source knows about, filtered by `query`.
    async fn list_traces(&self, query: &TraceQuery) -> Result<Vec<TraceSummary>, FetchError>;
}

/// Trace source backed by an in-process map.
///
/// Every change is announced on a payload-less live-update channel, which
/// a session can follow to refresh its current trace.
pub struct InMemoryTraceSource {
    traces: RwLock<HashMap<TraceId, Trace>>,
    live: broadcast::Sender<()>,
}

impl Default for InMemoryTraceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTraceSource {
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(16);
        Self {
            traces: RwLock::new(HashMap::new()),
            live,
        }
    }

    /// Create a source preloaded with traces.
    pub fn with_traces(traces: impl IntoIterator<Item = Trace>) -> Self {
        let (live, _) = broadcast::channel(16);
        Self {
            traces: RwLock::new(traces.into_iter().map(|t| (t.id.clone(), t)).collect()),
            live,
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe_live_updates(&self) -> broadcast::Receiver<()> {
        self.live.subscribe()
    }

    /// Insert or replace a whole trace.
    pub async fn insert(&self, trace: Trace) {
        debug!(trace_id = %trace.id, spans = trace.spans.len(), "storing trace");
        self.traces.write().await.insert(trace.id.clone(), trace);
        self.notify();
    }

    /// Add or replace one span of a stored trace.
    ///
    /// The trace duration grows to cover the span while the trace is running.
    pub async fn push_span(&self, trace_id: &TraceId, span: Span) -> Result<Upsert, FetchError> {
        let outcome = {
            let mut traces = self.traces.write().await;
            let trace = traces
                .get_mut(trace_id)
                .ok_or_else(|| FetchError::NotFound(trace_id.clone()))?;

            let mut store = SpanStore::new();
            for existing in &trace.spans {
                store.insert(existing.clone()).map_err(FetchError::from)?;
            }
            let end_ms = span.end_offset_ms();
            let outcome = store.upsert(span).map_err(FetchError::from)?;

            trace.spans = store.into_spans();
            trace.duration_ms = trace.duration_ms.max(end_ms);
            outcome
        };
        self.notify();
        Ok(outcome)
    }

    /// Remove a trace.
    pub async fn remove(&self, id: &TraceId) -> Option<Trace> {
        let removed = self.traces.write().await.remove(id);
        if removed.is_some() {
            self.notify();
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.traces.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.traces.read().await.is_empty()
    }

    fn notify(&self) {
        // No subscribers is fine.
        let _ = self.live.send(());
    }
}

#[async_trait]
impl TraceSource for InMemoryTraceSource {
    async fn fetch_trace(&self, id: &TraceId) -> Result<Trace, FetchError> {
        self.traces
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(id.clone()))
    }

    async fn list_traces(&self, query: &TraceQuery) -> Result<Vec<TraceSummary>, FetchError> {
        let traces = self.traces.read().await;
        let mut summaries: Vec<TraceSummary> = traces
            .values()
            .map(Trace::summary)
            .filter(|s| query.matches(s))
            .collect();
        summaries.sort_by(|a, b| a.trace_id.cmp(&b.trace_id));
        summaries.truncate(query.limit);
        Ok(summaries)
    }
}

#[cfg(feature = "http")]
pub use http::{HttpSourceConfig, HttpTraceSource};

#[cfg(feature = "http")]
mod http {
    use super::*;
    use reqwest::{Client, StatusCode};
    use serde::Deserialize;
    use std::time::Duration;

    /// Configuration for [`HttpTraceSource`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct HttpSourceConfig {
        /// Base URL of the trace API (without `/api/v1`).
        pub base_url: String,
        /// Request timeout in seconds.
        pub timeout_secs: u64,
    }

    impl Default for HttpSourceConfig {
        fn default() -> Self {
            Self {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 30,
            }
        }
    }

    impl HttpSourceConfig {
        pub fn new(base_url: impl Into<String>) -> Self {
            Self {
                base_url: base_url.into(),
                ..Self::default()
            }
        }

        /// Create config from environment variables.
        pub fn from_env() -> Self {
            let defaults = Self::default();
            Self {
                base_url: std::env::var("TRACELENS_API_URL").unwrap_or(defaults.base_url),
                timeout_secs: std::env::var("TRACELENS_API_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.timeout_secs),
            }
        }

        pub fn with_timeout_secs(mut self, secs: u64) -> Self {
            self.timeout_secs = secs;
            self
        }
    }

    #[derive(Debug, Deserialize)]
    struct TraceListResponse {
        traces: Vec<TraceSummary>,
    }

    /// Trace source talking to the trace REST API.
    pub struct HttpTraceSource {
        config: HttpSourceConfig,
        http: Client,
    }

    impl HttpTraceSource {
        pub fn new(config: HttpSourceConfig) -> Result<Self, FetchError> {
            let http = Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {}", e)))?;
            Ok(Self { config, http })
        }

        pub fn from_env() -> Result<Self, FetchError> {
            Self::new(HttpSourceConfig::from_env())
        }

        fn url(&self, path: &str) -> String {
            format!("{}/api/v1{}", self.config.base_url.trim_end_matches('/'), path)
        }

        async fn get(&self, url: &str) -> Result<(StatusCode, String), FetchError> {
            let response = self
                .http
                .get(url)
                .header("accept", "application/json")
                .send()
                .await
                .map_err(|e| FetchError::Network(format!("request to {} failed: {}", url, e)))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| FetchError::Network(format!("failed to read response: {}", e)))?;
            Ok((status, body))
        }
    }

    #[async_trait]
    impl TraceSource for HttpTraceSource {
        async fn fetch_trace(&self, id: &TraceId) -> Result<Trace, FetchError> {
            let url = self.url(&format!("/traces/{}", id));
            let (status, body) = self.get(&url).await?;

            if status == StatusCode::NOT_FOUND {
                return Err(FetchError::NotFound(id.clone()));
            }
            if !status.is_success() {
                return Err(FetchError::Status {
                    code: status.as_u16(),
                    message: body,
                });
            }

            let trace = Trace::from_json(&body)?;
            debug!(trace_id = %trace.id, spans = trace.spans.len(), "fetched trace");
            Ok(trace)
        }

        async fn list_traces(&self, query: &TraceQuery) -> Result<Vec<TraceSummary>, FetchError> {
            let mut path = format!("/traces?limit={}", query.limit);
            if let Some(status) = query.status {
                path.push_str(&format!("&status={}", status));
            }
            let url = self.url(&path);
            let (status, body) = self.get(&url).await?;

            if !status.is_success() {
                return Err(FetchError::Status {
                    code: status.as_u16(),
                    message: body,
                });
            }

            let list: TraceListResponse = serde_json::from_str(&body)
                .map_err(|e| FetchError::Parse(format!("invalid trace list: {}", e)))?;
            // The server may ignore the status filter.
            Ok(list
                .traces
                .into_iter()
                .filter(|s| query.matches(s))
                .take(query.limit)
                .collect())
        }
    }
}
