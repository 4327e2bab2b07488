//! Structured JSON logger adapter.

use crate::log_sink::{LogSink, json_line, now_epoch_ms};
use apl_client_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use apl_client_shared::{REDACTED, is_secret_key};
use serde_json::Value;
use std::sync::Arc;

const SERIALIZE_FAILED_LINE: &str = concat!(
    "{\"timestampMs\":0,\"level\":\"error\",\"event\":\"logger.serializeFailed\",",
    "\"message\":\"log serialization failed\"}"
);

/// Logger emitting one JSON object per event.
#[derive(Clone)]
pub struct JsonLogger {
    sink: Arc<dyn LogSink>,
    base_fields: LogFields,
    min_level: LogLevel,
}

impl JsonLogger {
    /// Logger writing to `sink` at `info` and above.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            base_fields: LogFields::new(),
            min_level: LogLevel::Info,
        }
    }

    /// Fields added to every event.
    #[must_use]
    pub fn with_base_fields(mut self, fields: LogFields) -> Self {
        self.base_fields = fields;
        self
    }

    /// Drop events below `level`.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    fn render(&self, event: LogEvent) -> String {
        let mut fields = self.base_fields.clone();
        fields.extend(event.fields.unwrap_or_default());

        let mut payload = serde_json::Map::new();
        payload.insert("timestampMs".into(), Value::from(now_epoch_ms()));
        payload.insert("level".into(), Value::from(event.level.as_str()));
        payload.insert("event".into(), Value::from(&*event.event));
        payload.insert("message".into(), Value::from(&*event.message));
        if !fields.is_empty() {
            let mut fields: serde_json::Map<String, Value> = fields
                .into_iter()
                .map(|(key, value)| (key.into_string(), value))
                .collect();
            redact_object(&mut fields);
            payload.insert("fields".into(), Value::Object(fields));
        }
        if let Some(mut error) = event.error {
            redact_value(&mut error);
            payload.insert("error".into(), error);
        }
        json_line(payload, SERIALIZE_FAILED_LINE)
    }
}

impl std::fmt::Debug for JsonLogger {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("JsonLogger")
            .field("min_level", &self.min_level)
            .finish_non_exhaustive()
    }
}

impl LoggerPort for JsonLogger {
    fn log(&self, event: LogEvent) {
        if event.level < self.min_level {
            return;
        }
        let line = self.render(event);
        self.sink.write_line(&line);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            sink: Arc::clone(&self.sink),
            base_fields: merged,
            min_level: self.min_level,
        })
    }
}

fn redact_object(map: &mut serde_json::Map<String, Value>) {
    for (key, value) in map.iter_mut() {
        if is_secret_key(key) {
            *value = Value::from(REDACTED);
        } else {
            redact_value(value);
        }
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => redact_object(map),
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {},
    }
}
