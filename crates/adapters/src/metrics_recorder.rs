//! Live metrics recorder.
//!
//! All document state sits behind one recorder-wide mutex. Handles keep a
//! `Weak` pointer to the recorder core plus a `(document, index)` slot and
//! re-validate that slot on every call, so a dropped recorder or an evicted
//! document turns every further handle call into a `false` no-op.
//!
//! Reports leave the recorder only from `flush`, which holds the lock for the
//! whole pass. Handle fast paths never touch the sink.

use apl_client_domain::{DocumentId, DocumentIdAllocator, Segment};
use apl_client_ports::{
    MetricCounter, MetricMetadata, MetricTimer, MetricsRecorderPort, MetricsSinkPort,
    NullMetricCounter, NullMetricTimer,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

const FAILURE_SUFFIX: &str = ".fail";

#[derive(Debug)]
struct TimerRecord {
    name: Box<str>,
    has_value: bool,
    failures: u64,
    started: Option<Instant>,
    elapsed: Duration,
    report_zero_failures: bool,
}

#[derive(Debug)]
struct CounterRecord {
    name: Box<str>,
    has_value: bool,
    value: u64,
}

#[derive(Debug)]
enum MetricRecord {
    Timer(TimerRecord),
    Counter(CounterRecord),
}

#[derive(Debug, Default)]
struct DocumentRecord {
    metadata: MetricMetadata,
    metrics: Vec<MetricRecord>,
}

#[derive(Debug, Default)]
struct RecorderState {
    documents: BTreeMap<DocumentId, DocumentRecord>,
    allocator: DocumentIdAllocator,
    current_displayed: Option<DocumentId>,
    latest: Option<DocumentId>,
}

impl RecorderState {
    fn resolve(&self, document: DocumentId) -> DocumentId {
        match document {
            DocumentId::CURRENT => self
                .current_displayed
                .or(self.latest)
                .unwrap_or(DocumentId::UNKNOWN),
            DocumentId::LATEST => self.latest.unwrap_or(DocumentId::UNKNOWN),
            other => other,
        }
    }

    fn is_active(&self, document: DocumentId) -> bool {
        if self.current_displayed == Some(document) {
            return true;
        }
        let start = self.latest.unwrap_or(DocumentId::UNKNOWN);
        document.is_within(start, self.allocator.next_unallocated())
    }

    fn metric_mut(&mut self, document: DocumentId, index: usize) -> Option<&mut MetricRecord> {
        self.documents
            .get_mut(&document)
            .and_then(|record| record.metrics.get_mut(index))
    }

    fn push_metric(
        &mut self,
        document: DocumentId,
        metric: MetricRecord,
    ) -> Option<(DocumentId, usize)> {
        let document = self.resolve(document);
        let record = self.documents.get_mut(&document)?;
        let index = record.metrics.len();
        record.metrics.push(metric);
        Some((document, index))
    }
}

/// Shared recorder state referenced weakly by handles.
struct RecorderCore {
    sink: Arc<dyn MetricsSinkPort>,
    state: Mutex<RecorderState>,
}

impl RecorderCore {
    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_timer(
        &self,
        document: DocumentId,
        index: usize,
        update: impl FnOnce(&mut TimerRecord) -> bool,
    ) -> bool {
        let mut state = self.lock();
        match state.metric_mut(document, index) {
            Some(MetricRecord::Timer(timer)) => update(timer),
            _ => {
                tracing::trace!(%document, index, "timer slot no longer exists");
                false
            },
        }
    }

    fn update_counter(
        &self,
        document: DocumentId,
        index: usize,
        update: impl FnOnce(&mut CounterRecord) -> bool,
    ) -> bool {
        let mut state = self.lock();
        match state.metric_mut(document, index) {
            Some(MetricRecord::Counter(counter)) => update(counter),
            _ => {
                tracing::trace!(%document, index, "counter slot no longer exists");
                false
            },
        }
    }

    fn register_document(&self) -> DocumentId {
        let mut state = self.lock();
        let mut document = state.allocator.allocate();
        // After wraparound a long-lived document may still hold the next id.
        while state.documents.contains_key(&document) {
            document = state.allocator.allocate();
        }
        state.documents.insert(document, DocumentRecord::default());
        document
    }

    fn add_metadata(&self, document: DocumentId, key: &str, value: &str) -> bool {
        let mut state = self.lock();
        let document = state.resolve(document);
        state.documents.get_mut(&document).is_some_and(|record| {
            record.metadata.insert(key.into(), value.into());
            true
        })
    }

    fn invalidate_document(&self, document: DocumentId) {
        let mut state = self.lock();
        let document = state.resolve(document);
        if state.current_displayed == Some(document) {
            state.current_displayed = None;
        }
        if state.latest == Some(document) {
            state.latest = None;
        }
        if state.documents.remove(&document).is_some() {
            tracing::debug!(%document, "document invalidated");
        }
    }

    fn flush(&self) {
        let mut state = self.lock();
        self.flush_locked(&mut state);
    }

    fn flush_locked(&self, state: &mut RecorderState) {
        for record in state.documents.values_mut() {
            let metadata = &record.metadata;
            for metric in &mut record.metrics {
                match metric {
                    MetricRecord::Timer(timer) => flush_timer(self.sink.as_ref(), metadata, timer),
                    MetricRecord::Counter(counter) => {
                        if counter.has_value {
                            self.sink
                                .report_counter(metadata, &counter.name, counter.value);
                            counter.value = 0;
                            counter.has_value = false;
                        }
                    },
                }
            }
        }
    }

    fn on_rendering_started(&self, document: DocumentId) {
        self.lock().latest = Some(document);
    }

    fn on_rendering_ended(&self, document: DocumentId) {
        let mut state = self.lock();
        state.current_displayed = Some(document);
        // Superseded documents are dropped before the flush: their pending
        // metrics never reach the sink.
        evict_inactive(&mut state);
        self.flush_locked(&mut state);
    }

    fn invalidate_inactive_documents(&self) {
        evict_inactive(&mut self.lock());
    }
}

fn evict_inactive(state: &mut RecorderState) {
    let stale: Vec<DocumentId> = state
        .documents
        .keys()
        .copied()
        .filter(|document| !state.is_active(*document))
        .collect();
    for document in stale {
        tracing::debug!(%document, "evicting inactive document");
        state.documents.remove(&document);
    }
}

fn flush_timer(sink: &dyn MetricsSinkPort, metadata: &MetricMetadata, timer: &mut TimerRecord) {
    if timer.started.is_some() {
        return;
    }
    let had_value = timer.has_value;
    if had_value {
        sink.report_timer(metadata, &timer.name, timer.elapsed);
        timer.elapsed = Duration::ZERO;
        timer.has_value = false;
    }
    if timer.failures > 0 || (had_value && timer.report_zero_failures) {
        let name = format!("{}{FAILURE_SUFFIX}", timer.name);
        sink.report_counter(metadata, &name, timer.failures);
        timer.failures = 0;
    }
}

/// Recorder that aggregates per-document telemetry and reports it to a sink.
#[derive(Clone)]
pub struct AplMetricsRecorder {
    core: Arc<RecorderCore>,
}

impl AplMetricsRecorder {
    /// Create a recorder reporting to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn MetricsSinkPort>) -> Self {
        Self::with_allocator(sink, DocumentIdAllocator::default())
    }

    /// Create a recorder with a pre-positioned id allocator.
    #[must_use]
    pub fn with_allocator(sink: Arc<dyn MetricsSinkPort>, allocator: DocumentIdAllocator) -> Self {
        Self {
            core: Arc::new(RecorderCore {
                sink,
                state: Mutex::new(RecorderState {
                    allocator,
                    ..RecorderState::default()
                }),
            }),
        }
    }

    /// Number of documents currently tracked.
    #[must_use]
    pub fn active_document_count(&self) -> usize {
        self.core.lock().documents.len()
    }

    fn bind_timer(
        &self,
        document: DocumentId,
        name: &str,
        report_zero_failures: bool,
        tracks_rendering: bool,
    ) -> Box<dyn MetricTimer> {
        let record = MetricRecord::Timer(TimerRecord {
            name: name.into(),
            has_value: false,
            failures: 0,
            started: None,
            elapsed: Duration::ZERO,
            report_zero_failures,
        });
        let Some((document, index)) = self.core.lock().push_metric(document, record) else {
            tracing::trace!(%document, metric = name, "timer requested for unregistered document");
            return Box::new(NullMetricTimer);
        };
        Box::new(TimerHandle {
            core: Arc::downgrade(&self.core),
            document,
            index,
            tracks_rendering,
        })
    }
}

impl std::fmt::Debug for AplMetricsRecorder {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AplMetricsRecorder")
            .field("documents", &self.active_document_count())
            .finish_non_exhaustive()
    }
}

impl MetricsRecorderPort for AplMetricsRecorder {
    fn register_document(&self) -> DocumentId {
        self.core.register_document()
    }

    fn add_metadata(&self, document: DocumentId, key: &str, value: &str) -> bool {
        self.core.add_metadata(document, key, value)
    }

    fn invalidate_document(&self, document: DocumentId) {
        self.core.invalidate_document(document);
    }

    fn current_displayed_document(&self) -> DocumentId {
        self.core
            .lock()
            .current_displayed
            .unwrap_or(DocumentId::UNKNOWN)
    }

    fn latest_document(&self) -> DocumentId {
        self.core.lock().latest.unwrap_or(DocumentId::UNKNOWN)
    }

    fn resolve_document(&self, document: DocumentId) -> DocumentId {
        self.core.lock().resolve(document)
    }

    fn create_timer(
        &self,
        document: DocumentId,
        name: &str,
        report_zero_failures: bool,
    ) -> Box<dyn MetricTimer> {
        self.bind_timer(document, name, report_zero_failures, false)
    }

    fn create_segment_timer(
        &self,
        document: DocumentId,
        segment: Segment,
        report_zero_failures: bool,
    ) -> Box<dyn MetricTimer> {
        let tracks_rendering = segment == Segment::RenderDocument;
        self.bind_timer(
            document,
            segment.metric_name(),
            report_zero_failures,
            tracks_rendering,
        )
    }

    fn create_counter(
        &self,
        document: DocumentId,
        name: &str,
        report_zero_values: bool,
    ) -> Box<dyn MetricCounter> {
        let record = MetricRecord::Counter(CounterRecord {
            name: name.into(),
            has_value: report_zero_values,
            value: 0,
        });
        let Some((document, index)) = self.core.lock().push_metric(document, record) else {
            tracing::trace!(
                %document,
                metric = name,
                "counter requested for unregistered document"
            );
            return Box::new(NullMetricCounter);
        };
        Box::new(CounterHandle {
            core: Arc::downgrade(&self.core),
            document,
            index,
        })
    }

    fn flush(&self) {
        self.core.flush();
    }

    fn on_rendering_started(&self, document: DocumentId) {
        self.core.on_rendering_started(document);
    }

    fn on_rendering_ended(&self, document: DocumentId) {
        self.core.on_rendering_ended(document);
    }

    fn invalidate_inactive_documents(&self) {
        self.core.invalidate_inactive_documents();
    }
}

struct TimerHandle {
    core: Weak<RecorderCore>,
    document: DocumentId,
    index: usize,
    tracks_rendering: bool,
}

impl TimerHandle {
    fn update(&self, update: impl FnOnce(&mut TimerRecord) -> bool) -> Option<Arc<RecorderCore>> {
        let core = self.core.upgrade()?;
        core.update_timer(self.document, self.index, update)
            .then_some(core)
    }
}

impl MetricTimer for TimerHandle {
    fn started_at(&self, at: Instant) -> bool {
        let updated = self.update(|timer| {
            if timer.started.is_some() {
                return false;
            }
            timer.started = Some(at);
            true
        });
        match updated {
            Some(core) => {
                if self.tracks_rendering {
                    core.on_rendering_started(self.document);
                }
                true
            },
            None => false,
        }
    }

    fn stopped_at(&self, at: Instant) -> bool {
        let updated = self.update(|timer| {
            let Some(start) = timer.started.take() else {
                return false;
            };
            timer.elapsed = timer.elapsed.saturating_add(at.saturating_duration_since(start));
            timer.has_value = true;
            true
        });
        match updated {
            Some(core) => {
                if self.tracks_rendering {
                    core.on_rendering_ended(self.document);
                }
                true
            },
            None => false,
        }
    }

    fn elapsed(&self, duration: Duration) -> bool {
        self.update(|timer| {
            timer.elapsed = timer.elapsed.saturating_add(duration);
            timer.has_value = true;
            true
        })
        .is_some()
    }

    fn fail(&self) -> bool {
        self.update(|timer| {
            timer.failures = timer.failures.saturating_add(1);
            timer.started = None;
            true
        })
        .is_some()
    }
}

struct CounterHandle {
    core: Weak<RecorderCore>,
    document: DocumentId,
    index: usize,
}

impl MetricCounter for CounterHandle {
    fn increment_by(&self, value: u64) -> bool {
        let Some(core) = self.core.upgrade() else {
            return false;
        };
        core.update_counter(self.document, self.index, |counter| {
            counter.value = counter.value.saturating_add(value);
            counter.has_value = true;
            true
        })
    }
}
