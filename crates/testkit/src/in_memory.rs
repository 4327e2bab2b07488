//! In-memory logger and metrics sink doubles.
//!
//! Both record everything they receive behind a mutex so tests can assert on
//! the exact sequence after the code under test returns.

use apl_client_ports::{LogEvent, LogFields, LogLevel, LoggerPort, MetricMetadata, MetricsSinkPort};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }
}

/// Logger that keeps every event. Children share the parent's buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
    base_fields: LogFields,
}

impl MemoryLogger {
    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Event names logged at `level`.
    pub fn event_names(&self, level: LogLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event.level == level)
            .map(|event| event.event.into_string())
            .collect()
    }

    /// Whether an event with this name was logged.
    pub fn contains(&self, name: &str) -> bool {
        self.events().iter().any(|event| &*event.event == name)
    }
}

impl LoggerPort for MemoryLogger {
    fn log(&self, mut event: LogEvent) {
        if !self.base_fields.is_empty() {
            let mut fields = self.base_fields.clone();
            fields.extend(event.fields.take().unwrap_or_default());
            event.fields = Some(fields);
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut base_fields = self.base_fields.clone();
        base_fields.extend(fields);
        Box::new(Self {
            events: Arc::clone(&self.events),
            base_fields,
        })
    }
}

/// One report received by [`RecordingMetricsSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkReport {
    /// `report_timer` call.
    Timer {
        /// Document metadata at flush time.
        metadata: MetricMetadata,
        /// Metric name.
        name: String,
        /// Reported duration.
        value: Duration,
    },
    /// `report_counter` call.
    Counter {
        /// Document metadata at flush time.
        metadata: MetricMetadata,
        /// Metric name.
        name: String,
        /// Reported value.
        value: u64,
    },
}

impl SinkReport {
    /// Metric name of the report.
    pub fn name(&self) -> &str {
        match self {
            Self::Timer { name, .. } | Self::Counter { name, .. } => name,
        }
    }

    /// Metadata attached to the report.
    pub fn metadata(&self) -> &MetricMetadata {
        match self {
            Self::Timer { metadata, .. } | Self::Counter { metadata, .. } => metadata,
        }
    }

    /// Metadata value for `key`, if present.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.metadata().get(key).map(AsRef::as_ref)
    }
}

/// Metrics sink that records every report in order.
#[derive(Debug, Default)]
pub struct RecordingMetricsSink {
    reports: Mutex<Vec<SinkReport>>,
}

impl RecordingMetricsSink {
    /// Shared sink, ready to hand to a recorder.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of all reports so far.
    pub fn reports(&self) -> Vec<SinkReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain and return all reports so far.
    pub fn take(&self) -> Vec<SinkReport> {
        std::mem::take(&mut *self.reports.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Reports whose name equals `name`.
    pub fn named(&self, name: &str) -> Vec<SinkReport> {
        self.reports()
            .into_iter()
            .filter(|report| report.name() == name)
            .collect()
    }

    fn push(&self, report: SinkReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
    }
}

impl MetricsSinkPort for RecordingMetricsSink {
    fn report_timer(&self, metadata: &MetricMetadata, name: &str, value: Duration) {
        self.push(SinkReport::Timer {
            metadata: metadata.clone(),
            name: name.to_string(),
            value,
        });
    }

    fn report_counter(&self, metadata: &MetricMetadata, name: &str, value: u64) {
        self.push(SinkReport::Counter {
            metadata: metadata.clone(),
            name: name.to_string(),
            value,
        });
    }
}
