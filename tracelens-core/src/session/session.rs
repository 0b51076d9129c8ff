//! The trace session: one selected trace, four cached views.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

use crate::config::SessionConfig;
use crate::error::{Error, HierarchyError, Result};
use crate::hierarchy::SpanTree;
use crate::path::SelectedPath;
use crate::pipeline;
use crate::session::source::TraceSource;
use crate::session::state::{LoadOutcome, SessionError, SessionEvent, SessionState, SessionStatus};
use crate::span::{SpanId, Trace, TraceId};
use crate::views::{
    tot, DecisionTreeViewModel, ReasoningChainViewModel, ToTViewModel, ViewModelSet,
    WaterfallViewModel,
};

/// Everything derived from the currently displayed trace.
///
/// Replaced as a whole on every recomputation, so readers holding one never
/// see views from two different traces.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub trace: Option<Trace>,
    pub tree: SpanTree,
    pub path: SelectedPath,
    pub views: ViewModelSet,
    pub error: Option<HierarchyError>,
}

impl Snapshot {
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace.as_ref().map(|t| &t.id)
    }
}

struct Inner {
    state: SessionState,
    current_trace_id: Option<TraceId>,
    snapshot: Arc<Snapshot>,
    active_node_id: Option<SpanId>,
    last_error: Option<SessionError>,
    show_only_selected: bool,
}

impl Inner {
    /// Point back at whatever the snapshot shows.
    fn settle_on_snapshot(&mut self) -> SessionState {
        self.current_trace_id = self.snapshot.trace_id().cloned();
        self.state = if self.snapshot.trace.is_some() {
            SessionState::Ready
        } else {
            SessionState::Empty
        };
        self.state
    }
}

/// Orchestrates fetch, derivation and caching for one selected trace.
///
/// Trace-level operations are last-request-wins: starting a load bumps a
/// generation counter, and any in-flight load that observes a newer
/// generation drops its result without committing.
pub struct TraceSession {
    source: Arc<dyn TraceSource>,
    config: SessionConfig,
    inner: RwLock<Inner>,
    generation: watch::Sender<u64>,
    events: broadcast::Sender<SessionEvent>,
}

impl TraceSession {
    /// Create a session. Fails if `config` does not validate.
    pub fn new(source: Arc<dyn TraceSource>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(source, config))
    }

    /// Create a session with default configuration.
    pub fn with_defaults(source: Arc<dyn TraceSource>) -> Self {
        Self::from_parts(source, SessionConfig::default())
    }

    fn from_parts(source: Arc<dyn TraceSource>, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        let (generation, _) = watch::channel(0);
        let inner = Inner {
            state: SessionState::Empty,
            current_trace_id: None,
            snapshot: Arc::new(Snapshot::default()),
            active_node_id: None,
            last_error: None,
            show_only_selected: config.show_only_selected,
        };
        Self {
            source,
            config,
            inner: RwLock::new(inner),
            generation,
            events,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ---------------------------------------------------------------------
    // Trace-level operations
    // ---------------------------------------------------------------------

    /// Load a trace and make it current.
    ///
    /// Fetch failures are returned, stored as the last error, and leave the
    /// previously displayed trace in place.
    pub async fn select_trace(&self, id: impl Into<TraceId>) -> Result<LoadOutcome> {
        self.load(id.into()).await
    }

    /// Re-fetch the current trace in place.
    pub async fn refresh_trace(&self) -> Result<LoadOutcome> {
        let current = self.read().current_trace_id.clone();
        match current {
            Some(id) => self.load(id).await,
            None => Ok(LoadOutcome::NoTraceSelected),
        }
    }

    /// Refresh the current trace for every live-update notification.
    ///
    /// Runs until the notification channel closes. Bursts are coalesced
    /// into a single refresh.
    pub async fn follow_live_updates(&self, mut updates: broadcast::Receiver<()>) {
        loop {
            match updates.recv().await {
                Ok(()) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "live updates lagged, coalescing");
                }
                Err(RecvError::Closed) => break,
            }
            loop {
                match updates.try_recv() {
                    Ok(()) | Err(TryRecvError::Lagged(_)) => continue,
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }

            // Errors are already recorded as last_error and published.
            if let Err(err) = self.refresh_trace().await {
                debug!(error = %err, "live refresh failed");
            }
        }
        debug!("live update channel closed");
    }

    #[instrument(skip(self, id), fields(trace_id = %id))]
    async fn load(&self, id: TraceId) -> Result<LoadOutcome> {
        let generation = self.begin_load();
        let show_only_selected = {
            let mut inner = self.write();
            inner.current_trace_id = Some(id.clone());
            inner.state = SessionState::Loading;
            inner.show_only_selected
        };
        self.emit(SessionEvent::StateChanged(SessionState::Loading));
        let pending = PendingLoad::new(self, generation);

        let mut changes = self.generation.subscribe();
        let fetched = tokio::select! {
            result = self.source.fetch_trace(&id) => Some(result),
            _ = superseded(&mut changes, generation) => None,
        };
        pending.disarm();
        let Some(fetched) = fetched else {
            debug!("load superseded during fetch");
            return Ok(LoadOutcome::Superseded);
        };

        match fetched {
            Ok(trace) => {
                let derived = pipeline::derive(&trace, show_only_selected, &self.config.views);
                self.commit(generation, trace, derived)
            }
            Err(err) => self.restore(generation, err),
        }
    }

    fn commit(
        &self,
        generation: u64,
        trace: Trace,
        mut derived: pipeline::Derived,
    ) -> Result<LoadOutcome> {
        let mut events = Vec::new();
        let outcome = {
            let mut inner = self.write();
            if self.current_generation() != generation {
                debug!("load superseded before commit");
                return Ok(LoadOutcome::Superseded);
            }

            // The filter may have been toggled while the fetch was in flight.
            if inner.show_only_selected != derived.views.tree_of_thought.show_only_selected {
                derived.views.tree_of_thought = tot::render(
                    &derived.tree,
                    &derived.path,
                    inner.show_only_selected,
                    &self.config.views,
                );
            }

            let switched = inner.snapshot.trace_id() != Some(&trace.id);
            if switched && inner.active_node_id.take().is_some() {
                events.push(SessionEvent::ActiveNodeChanged(None));
            }

            let outcome = match &derived.error {
                Some(err) => LoadOutcome::Degraded(err.clone()),
                None => LoadOutcome::Ready,
            };
            inner.last_error = derived.error.clone().map(SessionError::Hierarchy);
            inner.current_trace_id = Some(trace.id.clone());
            inner.state = SessionState::Ready;

            events.push(SessionEvent::StateChanged(SessionState::Ready));
            events.push(SessionEvent::ViewsUpdated {
                trace_id: Some(trace.id.clone()),
                degraded: derived.error.is_some(),
            });
            if let Some(err) = &derived.error {
                events.push(SessionEvent::Error(SessionError::Hierarchy(err.clone())));
            }

            info!(spans = trace.spans.len(), degraded = derived.error.is_some(), "trace ready");
            inner.snapshot = Arc::new(Snapshot {
                trace: Some(trace),
                tree: derived.tree,
                path: derived.path,
                views: derived.views,
                error: derived.error,
            });
            outcome
        };

        for event in events {
            self.emit(event);
        }
        Ok(outcome)
    }

    fn restore(&self, generation: u64, err: crate::error::FetchError) -> Result<LoadOutcome> {
        let state = {
            let mut inner = self.write();
            if self.current_generation() != generation {
                debug!(error = %err, "superseded load failed, ignoring");
                return Ok(LoadOutcome::Superseded);
            }
            inner.last_error = Some(SessionError::Fetch(err.clone()));
            inner.settle_on_snapshot()
        };

        warn!(error = %err, restored = %state, "trace fetch failed");
        self.emit(SessionEvent::StateChanged(state));
        self.emit(SessionEvent::Error(SessionError::Fetch(err.clone())));
        Err(Error::Fetch(err))
    }

    /// A load future was dropped before it could commit or restore.
    fn abandon(&self, generation: u64) {
        let state = {
            let mut inner = self.write();
            if self.current_generation() != generation || inner.state != SessionState::Loading {
                return;
            }
            inner.settle_on_snapshot()
        };

        debug!(generation, restored = %state, "load dropped before completion");
        self.emit(SessionEvent::StateChanged(state));
    }

    // ---------------------------------------------------------------------
    // Cheap UI-driven updates
    // ---------------------------------------------------------------------

    /// Highlight a node. Does not touch the tree or the selected path.
    pub fn select_node(&self, id: impl Into<SpanId>) {
        let id = id.into();
        self.write().active_node_id = Some(id.clone());
        self.emit(SessionEvent::ActiveNodeChanged(Some(id)));
    }

    pub fn clear_active_node(&self) {
        let had = self.write().active_node_id.take().is_some();
        if had {
            self.emit(SessionEvent::ActiveNodeChanged(None));
        }
    }

    /// Toggle the tree-of-thought filter, re-rendering only that view.
    pub fn set_show_only_selected(&self, enabled: bool) {
        let trace_id = {
            let mut inner = self.write();
            if inner.show_only_selected == enabled {
                return;
            }
            inner.show_only_selected = enabled;

            let current = &inner.snapshot;
            if current.trace.is_none() || current.error.is_some() {
                return;
            }
            let mut next = Snapshot::clone(current);
            next.views.tree_of_thought =
                tot::render(&next.tree, &next.path, enabled, &self.config.views);
            let trace_id = next.trace_id().cloned();
            inner.snapshot = Arc::new(next);
            trace_id
        };

        debug!(enabled, "tree-of-thought filter changed");
        self.emit(SessionEvent::ViewsUpdated {
            trace_id,
            degraded: false,
        });
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// The whole cached set, consistent across views.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.read().snapshot)
    }

    pub fn decision_tree_view(&self) -> DecisionTreeViewModel {
        self.snapshot().views.decision_tree.clone()
    }

    pub fn waterfall_view(&self) -> WaterfallViewModel {
        self.snapshot().views.waterfall.clone()
    }

    pub fn reasoning_chain_view(&self) -> ReasoningChainViewModel {
        self.snapshot().views.reasoning_chain.clone()
    }

    pub fn tot_view(&self) -> ToTViewModel {
        self.snapshot().views.tree_of_thought.clone()
    }

    pub fn selected_path(&self) -> SelectedPath {
        self.snapshot().path.clone()
    }

    pub fn state(&self) -> SessionState {
        self.read().state
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.read().last_error.clone()
    }

    pub fn current_trace_id(&self) -> Option<TraceId> {
        self.read().current_trace_id.clone()
    }

    pub fn active_node_id(&self) -> Option<SpanId> {
        self.read().active_node_id.clone()
    }

    pub fn show_only_selected(&self) -> bool {
        self.read().show_only_selected
    }

    /// State plus the last error, for status displays.
    pub fn session_state(&self) -> SessionStatus {
        let inner = self.read();
        SessionStatus {
            state: inner.state,
            current_trace_id: inner.current_trace_id.clone(),
            active_node_id: inner.active_node_id.clone(),
            last_error: inner.last_error.clone(),
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn begin_load(&self) -> u64 {
        let mut next = 0;
        self.generation.send_modify(|g| {
            *g += 1;
            next = *g;
        });
        next
    }

    fn current_generation(&self) -> u64 {
        *self.generation.borrow()
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Settles the session if a load is dropped mid-fetch.
struct PendingLoad<'a> {
    session: &'a TraceSession,
    generation: u64,
    armed: bool,
}

impl<'a> PendingLoad<'a> {
    fn new(session: &'a TraceSession, generation: u64) -> Self {
        Self {
            session,
            generation,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.abandon(self.generation);
        }
    }
}

/// Resolves once a load newer than `generation` has started.
async fn superseded(changes: &mut watch::Receiver<u64>, generation: u64) {
    let closed = changes.wait_for(|g| *g != generation).await.is_err();
    if closed {
        // Sender lives as long as the session; never resolve.
        std::future::pending::<()>().await;
    }
}
