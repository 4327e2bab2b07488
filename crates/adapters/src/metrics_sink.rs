//! Metrics sink that renders reports as JSON lines.
//!
//! For hosts without a metrics backend. Each report becomes
//! `{"type":"metric","metricType":"timer"|"counter","name":..,"value":..,"tags":{..}}`
//! with document metadata as tags. Secret-looking tags (the render token) are
//! redacted.

use crate::log_sink::{LogSink, json_line, now_epoch_ms};
use apl_client_ports::{MetricMetadata, MetricsSinkPort};
use apl_client_shared::redact_if_secret;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const SERIALIZE_FAILED_LINE: &str = concat!(
    "{\"type\":\"metric\",\"metricType\":\"error\",",
    "\"name\":\"metrics.serializeFailed\",\"value\":1}"
);

/// [`MetricsSinkPort`] writing one JSON line per report.
#[derive(Clone)]
pub struct JsonMetricsSink {
    sink: Arc<dyn LogSink>,
    base_tags: MetricMetadata,
}

impl JsonMetricsSink {
    /// Sink writing to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            base_tags: MetricMetadata::new(),
        }
    }

    /// Tags added to every report. Document metadata wins on conflicts.
    #[must_use]
    pub fn with_base_tags(mut self, tags: MetricMetadata) -> Self {
        self.base_tags = tags;
        self
    }

    fn emit(
        &self,
        metric_type: &str,
        name: &str,
        value: u64,
        unit: Option<&str>,
        metadata: &MetricMetadata,
    ) {
        let mut payload = serde_json::Map::new();
        payload.insert("type".into(), Value::from("metric"));
        payload.insert("timestampMs".into(), Value::from(now_epoch_ms()));
        payload.insert("metricType".into(), Value::from(metric_type));
        payload.insert("name".into(), Value::from(name));
        payload.insert("value".into(), Value::from(value));
        if let Some(unit) = unit {
            payload.insert("unit".into(), Value::from(unit));
        }
        let tags: serde_json::Map<String, Value> = self
            .base_tags
            .iter()
            .chain(metadata.iter())
            .map(|(key, value)| (key.to_string(), Value::from(redact_if_secret(key, value))))
            .collect();
        if !tags.is_empty() {
            payload.insert("tags".into(), Value::Object(tags));
        }
        self.sink.write_line(&json_line(payload, SERIALIZE_FAILED_LINE));
    }
}

impl std::fmt::Debug for JsonMetricsSink {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("JsonMetricsSink")
            .field("base_tags", &self.base_tags)
            .finish_non_exhaustive()
    }
}

impl MetricsSinkPort for JsonMetricsSink {
    fn report_timer(&self, metadata: &MetricMetadata, name: &str, value: Duration) {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        self.emit("timer", name, millis, Some("ms"), metadata);
    }

    fn report_counter(&self, metadata: &MetricMetadata, name: &str, value: u64) {
        self.emit("counter", name, value, None, metadata);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Mutex, PoisonError};

    #[derive(Debug, Default)]
    struct MemorySink {
        lines: Mutex<Vec<String>>,
    }

    impl LogSink for MemorySink {
        fn write_line(&self, line: &str) {
            self.lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(line.to_string());
        }
    }

    fn metadata(pairs: &[(&str, &str)]) -> MetricMetadata {
        pairs
            .iter()
            .map(|(key, value)| (Box::from(*key), Box::from(*value)))
            .collect()
    }

    #[test]
    fn reports_timers_and_counters_with_tags() -> Result<(), Box<dyn std::error::Error>> {
        let memory = Arc::new(MemorySink::default());
        let sink = JsonMetricsSink::new(memory.clone())
            .with_base_tags(metadata(&[("host", "tv"), ("clientId", "base")]));
        let document = metadata(&[
            ("clientId", "client123"),
            ("skillId", "skillABC"),
            ("token", "amzn1.ns.2.client123#TID#skillABC:tok:1"),
        ]);

        sink.report_timer(
            &document,
            "SmartScreenSDK.renderDocument",
            Duration::from_millis(42),
        );
        sink.report_counter(&document, "SmartScreenSDK.renderDocument.fail", 0);

        let lines = std::mem::take(
            &mut *memory.lines.lock().unwrap_or_else(PoisonError::into_inner),
        );
        assert_eq!(lines.len(), 2);
        let timer: Value = serde_json::from_str(lines[0].trim())?;
        assert_eq!(timer["metricType"], json!("timer"));
        assert_eq!(timer["value"], json!(42));
        assert_eq!(timer["unit"], json!("ms"));
        assert_eq!(timer["tags"]["clientId"], json!("client123"));
        assert_eq!(timer["tags"]["host"], json!("tv"));
        assert_eq!(timer["tags"]["token"], json!(apl_client_shared::REDACTED));

        let counter: Value = serde_json::from_str(lines[1].trim())?;
        assert_eq!(counter["metricType"], json!("counter"));
        assert_eq!(counter["value"], json!(0));
        Ok(())
    }
}
