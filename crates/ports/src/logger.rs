//! Structured logging boundary.

use apl_client_shared::ErrorEnvelope;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Diagnostics.
    Debug,
    /// Normal operation.
    Info,
    /// Recoverable anomaly.
    Warn,
    /// Operation abandoned.
    Error,
}

impl LogLevel {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(()),
        }
    }
}

/// Extra event fields.
pub type LogFields = BTreeMap<Box<str>, serde_json::Value>;

/// One structured log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Stable dotted event name, e.g. `session.metrics.rejected`.
    pub event: Box<str>,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message. Must not carry secrets.
    pub message: Box<str>,
    /// Optional structured fields.
    pub fields: Option<LogFields>,
    /// Optional serialized error.
    pub error: Option<serde_json::Value>,
}

impl LogEvent {
    /// Event without an error payload.
    #[must_use]
    pub fn new(level: LogLevel, event: &str, message: &str, fields: Option<LogFields>) -> Self {
        Self {
            event: event.into(),
            level,
            message: message.into(),
            fields,
            error: None,
        }
    }
}

/// Boundary contract for structured logging.
pub trait LoggerPort: Send + Sync {
    /// Emit one event.
    fn log(&self, event: LogEvent);

    /// Logger that adds `fields` to every event.
    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort>;

    /// Debug event.
    fn debug(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(LogEvent::new(LogLevel::Debug, event, message, fields));
    }

    /// Info event.
    fn info(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(LogEvent::new(LogLevel::Info, event, message, fields));
    }

    /// Warn event.
    fn warn(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(LogEvent::new(LogLevel::Warn, event, message, fields));
    }

    /// Error event.
    fn error(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(LogEvent::new(LogLevel::Error, event, message, fields));
    }

    /// Error event carrying an [`ErrorEnvelope`] as its error payload.
    fn error_envelope(&self, event: &str, error: &ErrorEnvelope, fields: Option<LogFields>) {
        let mut log_event = LogEvent::new(LogLevel::Error, event, &error.message, fields);
        log_event.error = Some(serde_json::json!({
            "code": error.code.to_string(),
            "metadata": error.metadata,
        }));
        self.log(log_event);
    }
}

/// Build a [`LogFields`] map from string pairs.
#[must_use]
pub fn log_fields<'a>(pairs: impl IntoIterator<Item = (&'a str, serde_json::Value)>) -> LogFields {
    pairs
        .into_iter()
        .map(|(key, value)| (Box::<str>::from(key), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_and_order() {
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("verbose".parse::<LogLevel>().is_err());
        assert!(LogLevel::Debug < LogLevel::Error);
        assert_eq!(LogLevel::Info.as_str(), "info");
    }

    #[test]
    fn fields_helper_builds_map() {
        let fields = log_fields([("windowId", serde_json::json!("main"))]);
        assert_eq!(fields.get("windowId"), Some(&serde_json::json!("main")));
    }
}
