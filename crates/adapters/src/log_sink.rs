//! Line sinks shared by the JSON logger and the JSON metrics sink.

use std::io::Write;

/// Receives pre-formatted, newline-terminated lines.
pub trait LogSink: Send + Sync {
    /// Write one line.
    fn write_line(&self, line: &str);
}

/// Writes lines to stderr. Write failures are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrLogSink;

impl LogSink for StderrLogSink {
    fn write_line(&self, line: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
    }
}

/// Formats a JSON object as one newline-terminated line, or `fallback` when
/// serialization fails.
pub(crate) fn json_line(
    payload: serde_json::Map<String, serde_json::Value>,
    fallback: &str,
) -> String {
    serde_json::to_string(&serde_json::Value::Object(payload)).map_or_else(
        |_| format!("{fallback}\n"),
        |mut encoded| {
            encoded.push('\n');
            encoded
        },
    )
}

/// Milliseconds since the Unix epoch, or zero if the clock is before it.
pub(crate) fn now_epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .ok()
        .and_then(|duration| u64::try_from(duration.as_millis()).ok())
        .unwrap_or_default()
}
