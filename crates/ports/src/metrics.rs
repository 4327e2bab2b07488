//! Metrics boundary contracts: the host sink, the recorder and its handles.

use apl_client_domain::{DocumentId, Segment};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Per-document metadata attached to every report. Keys are unique.
pub type MetricMetadata = BTreeMap<Box<str>, Box<str>>;

/// Consumer of finalized telemetry, owned by the hosting application.
///
/// Calls may arrive while the recorder lock is held, so implementations must
/// not block and must not call back into the recorder.
pub trait MetricsSinkPort: Send + Sync {
    /// Report an accumulated duration.
    fn report_timer(&self, metadata: &MetricMetadata, name: &str, value: Duration);

    /// Report an accumulated count.
    fn report_counter(&self, metadata: &MetricMetadata, name: &str, value: u64);
}

/// Caller-owned handle to one timer slot.
///
/// Every operation returns `false` once the slot is gone (document evicted,
/// recorder dropped) or when the operation is invalid for the slot's state.
pub trait MetricTimer: Send + Sync {
    /// Start the timer at `at`. Fails if it is already running.
    fn started_at(&self, at: Instant) -> bool;

    /// Stop the timer at `at`, accumulating the interval. Fails if not running.
    fn stopped_at(&self, at: Instant) -> bool;

    /// Accumulate an externally measured duration.
    fn elapsed(&self, duration: Duration) -> bool;

    /// Record a failure and abandon any in-flight interval.
    fn fail(&self) -> bool;

    /// Start now.
    fn start(&self) -> bool {
        self.started_at(Instant::now())
    }

    /// Stop now.
    fn stop(&self) -> bool {
        self.stopped_at(Instant::now())
    }
}

/// Caller-owned handle to one counter slot.
pub trait MetricCounter: Send + Sync {
    /// Add `value` to the counter.
    fn increment_by(&self, value: u64) -> bool;

    /// Add one.
    fn increment(&self) -> bool {
        self.increment_by(1)
    }
}

/// Inert timer returned when no slot could be bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetricTimer;

impl MetricTimer for NullMetricTimer {
    fn started_at(&self, _at: Instant) -> bool {
        false
    }

    fn stopped_at(&self, _at: Instant) -> bool {
        false
    }

    fn elapsed(&self, _duration: Duration) -> bool {
        false
    }

    fn fail(&self) -> bool {
        false
    }
}

/// Inert counter returned when no slot could be bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetricCounter;

impl MetricCounter for NullMetricCounter {
    fn increment_by(&self, _value: u64) -> bool {
        false
    }
}

/// Document-scoped telemetry aggregation.
///
/// `CURRENT` and `LATEST` are accepted wherever a [`DocumentId`] is taken and
/// resolved against recorder state at call time.
pub trait MetricsRecorderPort: Send + Sync {
    /// Allocate an identity for a new document lifetime.
    fn register_document(&self) -> DocumentId;

    /// Upsert one metadata entry. Fails if the document is not registered.
    fn add_metadata(&self, document: DocumentId, key: &str, value: &str) -> bool;

    /// Drop a document and every pending metric it holds. Idempotent.
    fn invalidate_document(&self, document: DocumentId);

    /// Last document that finished rendering, or `UNKNOWN`.
    fn current_displayed_document(&self) -> DocumentId;

    /// Last document that started rendering, or `UNKNOWN`.
    fn latest_document(&self) -> DocumentId;

    /// Resolve `CURRENT`/`LATEST` to a concrete id. Other ids pass through.
    fn resolve_document(&self, document: DocumentId) -> DocumentId;

    /// Bind a new named timer slot.
    fn create_timer(
        &self,
        document: DocumentId,
        name: &str,
        report_zero_failures: bool,
    ) -> Box<dyn MetricTimer>;

    /// Bind a timer for a well-known rendering segment.
    fn create_segment_timer(
        &self,
        document: DocumentId,
        segment: Segment,
        report_zero_failures: bool,
    ) -> Box<dyn MetricTimer>;

    /// Bind a segment timer by its wire key. Unknown keys get an inert handle.
    fn create_segment_timer_by_key(
        &self,
        document: DocumentId,
        key: &str,
        report_zero_failures: bool,
    ) -> Box<dyn MetricTimer> {
        match Segment::from_key(key) {
            Some(segment) => self.create_segment_timer(document, segment, report_zero_failures),
            None => Box::new(NullMetricTimer),
        }
    }

    /// Bind a new named counter slot.
    fn create_counter(
        &self,
        document: DocumentId,
        name: &str,
        report_zero_values: bool,
    ) -> Box<dyn MetricCounter>;

    /// Report every pending value to the sink.
    fn flush(&self);

    /// Mark `document` as the latest one to start rendering.
    fn on_rendering_started(&self, document: DocumentId);

    /// Mark `document` as displayed, evict superseded documents, then flush.
    fn on_rendering_ended(&self, document: DocumentId);

    /// Evict every document outside the active window.
    fn invalidate_inactive_documents(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handles_reject_everything() {
        let timer = NullMetricTimer;
        assert!(!timer.start());
        assert!(!timer.stop());
        assert!(!timer.elapsed(Duration::from_millis(5)));
        assert!(!timer.fail());

        let counter = NullMetricCounter;
        assert!(!counter.increment());
        assert!(!counter.increment_by(10));
    }
}
