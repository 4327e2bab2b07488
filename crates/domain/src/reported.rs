//! Metrics pushed by the viewhost runtime.
//!
//! A batch is `{"payload": [{"kind": "timer"|"counter", "name": .., "value": ..}]}`.
//! Parsing is the validation pass of validate-then-apply: either every entry
//! is well formed and a typed list comes back, or nothing does.

use apl_client_shared::{ErrorCode, ErrorEnvelope};
use serde_json::Value;

/// Counter name the session keeps for itself instead of forwarding.
pub const COMPONENT_COMPLEXITY_METRIC: &str = "componentComplexity";

/// Kind of a reported metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportedMetricKind {
    /// Elapsed milliseconds added to a timer.
    Timer,
    /// Increment added to a counter.
    Counter,
}

impl ReportedMetricKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "timer" => Some(Self::Timer),
            "counter" => Some(Self::Counter),
            _ => None,
        }
    }
}

/// One validated metric entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedMetric {
    /// Timer or counter.
    pub kind: ReportedMetricKind,
    /// Metric name as sent by the viewhost.
    pub name: Box<str>,
    /// Milliseconds for timers, increment for counters.
    pub value: u64,
}

/// Reasons a metrics batch is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricsPayloadError {
    #[error("metrics payload is not valid JSON: {message}")]
    InvalidJson { message: String },

    #[error("metrics payload has no `payload` array")]
    MissingPayload,

    #[error("metric entry {index} is not an object")]
    EntryNotObject { index: usize },

    #[error("metric entry {index} has missing or unknown kind")]
    InvalidKind { index: usize },

    #[error("metric entry {index} has no name")]
    MissingName { index: usize },

    #[error("metric entry {index} has a missing or non-numeric value")]
    InvalidValue { index: usize },
}

impl MetricsPayloadError {
    /// Index of the offending entry, when the failure is entry-specific.
    #[must_use]
    pub const fn entry_index(&self) -> Option<usize> {
        match self {
            Self::InvalidJson { .. } | Self::MissingPayload => None,
            Self::EntryNotObject { index }
            | Self::InvalidKind { index }
            | Self::MissingName { index }
            | Self::InvalidValue { index } => Some(*index),
        }
    }
}

impl From<MetricsPayloadError> for ErrorEnvelope {
    fn from(error: MetricsPayloadError) -> Self {
        let index = error.entry_index();
        let envelope = Self::expected(ErrorCode::invalid_metrics_payload(), error.to_string());
        match index {
            Some(index) => envelope.with_metadata("entryIndex", index.to_string()),
            None => envelope,
        }
    }
}

/// Validate a whole batch into typed entries.
pub fn parse_reported_metrics(json: &str) -> Result<Vec<ReportedMetric>, MetricsPayloadError> {
    let document: Value =
        serde_json::from_str(json).map_err(|error| MetricsPayloadError::InvalidJson {
            message: error.to_string(),
        })?;

    let entries = document
        .get("payload")
        .and_then(Value::as_array)
        .ok_or(MetricsPayloadError::MissingPayload)?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_entry(index, entry))
        .collect()
}

fn parse_entry(index: usize, entry: &Value) -> Result<ReportedMetric, MetricsPayloadError> {
    let entry = entry
        .as_object()
        .ok_or(MetricsPayloadError::EntryNotObject { index })?;

    let kind = entry
        .get("kind")
        .and_then(Value::as_str)
        .and_then(ReportedMetricKind::parse)
        .ok_or(MetricsPayloadError::InvalidKind { index })?;

    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or(MetricsPayloadError::MissingName { index })?;

    let value = entry
        .get("value")
        .and_then(coerce_value)
        .ok_or(MetricsPayloadError::InvalidValue { index })?;

    Ok(ReportedMetric {
        kind,
        name: name.into(),
        value,
    })
}

/// 2^64, the first float that no longer fits a `u64`.
const U64_EXCLUSIVE_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Accept unsigned integers as-is and non-negative finite floats truncated.
fn coerce_value(value: &Value) -> Option<u64> {
    if let Some(unsigned) = value.as_u64() {
        return Some(unsigned);
    }
    let float = value.as_f64()?;
    if !float.is_finite() || float < 0.0 || float >= U64_EXCLUSIVE_LIMIT {
        return None;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "range checked above; fractional part is dropped on purpose"
    )]
    let truncated = float.trunc() as u64;
    Some(truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_integer_and_float_values() -> Result<(), MetricsPayloadError> {
        let metrics = parse_reported_metrics(
            r#"{"payload":[
                {"kind":"timer","name":"APL-Web.Content.create","value":12.7},
                {"kind":"counter","name":"componentComplexity","value":42}
            ]}"#,
        )?;

        assert_eq!(
            metrics,
            vec![
                ReportedMetric {
                    kind: ReportedMetricKind::Timer,
                    name: "APL-Web.Content.create".into(),
                    value: 12,
                },
                ReportedMetric {
                    kind: ReportedMetricKind::Counter,
                    name: COMPONENT_COMPLEXITY_METRIC.into(),
                    value: 42,
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn rejects_whole_batch_on_one_bad_entry() {
        let result = parse_reported_metrics(
            r#"{"payload":[
                {"kind":"timer","name":"a","value":1},
                {"kind":"gauge","name":"b","value":2},
                {"kind":"counter","name":"c","value":3}
            ]}"#,
        );
        assert_eq!(result, Err(MetricsPayloadError::InvalidKind { index: 1 }));
    }

    #[test]
    fn rejects_structural_violations() {
        assert!(matches!(
            parse_reported_metrics("not json"),
            Err(MetricsPayloadError::InvalidJson { .. })
        ));
        assert_eq!(
            parse_reported_metrics(r#"{"metrics":[]}"#),
            Err(MetricsPayloadError::MissingPayload)
        );
        assert_eq!(
            parse_reported_metrics(r#"{"payload":[7]}"#),
            Err(MetricsPayloadError::EntryNotObject { index: 0 })
        );
        assert_eq!(
            parse_reported_metrics(r#"{"payload":[{"kind":"timer","value":1}]}"#),
            Err(MetricsPayloadError::MissingName { index: 0 })
        );
        assert_eq!(
            parse_reported_metrics(r#"{"payload":[{"kind":"timer","name":"a","value":"1"}]}"#),
            Err(MetricsPayloadError::InvalidValue { index: 0 })
        );
        assert_eq!(
            parse_reported_metrics(r#"{"payload":[{"kind":"counter","name":"a","value":-1}]}"#),
            Err(MetricsPayloadError::InvalidValue { index: 0 })
        );
    }

    #[test]
    fn empty_batch_is_valid() -> Result<(), MetricsPayloadError> {
        assert!(parse_reported_metrics(r#"{"payload":[]}"#)?.is_empty());
        Ok(())
    }

    #[test]
    fn errors_map_into_envelopes() {
        let envelope: ErrorEnvelope = MetricsPayloadError::InvalidValue { index: 2 }.into();
        assert_eq!(envelope.code, ErrorCode::invalid_metrics_payload());
        assert_eq!(
            envelope.metadata.get("entryIndex").map(String::as_str),
            Some("2")
        );
    }
}
