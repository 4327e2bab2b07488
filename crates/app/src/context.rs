//! Client-wide shared state: validated config, logger, and the recorder slot.
//!
//! Sessions never cache the recorder. They ask the context on every use, so a
//! sink swap takes effect for all of them at once.

use apl_client_adapters::{AplMetricsRecorder, JsonLogger, LogSink, NullMetricsRecorder};
use apl_client_config::{LogLevelSetting, ValidatedClientConfig};
use apl_client_ports::{LogLevel, LoggerPort, MetricsRecorderPort, MetricsSinkPort, log_fields};
use serde_json::json;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared state owned by the binding and borrowed by every session.
pub struct ClientContext {
    config: ValidatedClientConfig,
    logger: Arc<dyn LoggerPort>,
    recorder: RwLock<Arc<dyn MetricsRecorderPort>>,
}

impl ClientContext {
    /// Context with a null recorder until a sink is installed.
    #[must_use]
    pub fn new(config: ValidatedClientConfig, logger: Arc<dyn LoggerPort>) -> Self {
        Self {
            config,
            logger,
            recorder: RwLock::new(Arc::new(NullMetricsRecorder)),
        }
    }

    /// Validated client configuration.
    #[must_use]
    pub const fn config(&self) -> &ValidatedClientConfig {
        &self.config
    }

    /// Root logger.
    #[must_use]
    pub fn logger(&self) -> &Arc<dyn LoggerPort> {
        &self.logger
    }

    /// The recorder currently in effect.
    #[must_use]
    pub fn recorder(&self) -> Arc<dyn MetricsRecorderPort> {
        self.recorder
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the recorder: a sink yields a live recorder, `None` (or
    /// disabled telemetry) the null recorder.
    ///
    /// Documents tracked by the previous recorder are dropped with it, and
    /// handles into it become inert.
    pub fn on_telemetry_sink_updated(&self, sink: Option<Arc<dyn MetricsSinkPort>>) {
        let enabled = self.config.telemetry.enabled;
        let recorder: Arc<dyn MetricsRecorderPort> = match sink {
            Some(sink) if enabled => Arc::new(AplMetricsRecorder::new(sink)),
            _ => Arc::new(NullMetricsRecorder),
        };
        *self.recorder.write().unwrap_or_else(PoisonError::into_inner) = recorder;
        self.logger.info(
            "client.telemetry.sinkUpdated",
            "metrics recorder replaced",
            Some(log_fields([("telemetryEnabled", json!(enabled))])),
        );
    }
}

/// Logger level for a configured `logging.level`.
#[must_use]
pub const fn log_level(setting: LogLevelSetting) -> LogLevel {
    match setting {
        LogLevelSetting::Debug => LogLevel::Debug,
        LogLevelSetting::Info => LogLevel::Info,
        LogLevelSetting::Warn => LogLevel::Warn,
        LogLevelSetting::Error => LogLevel::Error,
    }
}

/// JSON logger writing to `sink` at the configured level.
pub fn json_logger(config: &ValidatedClientConfig, sink: Arc<dyn LogSink>) -> Arc<dyn LoggerPort> {
    Arc::new(JsonLogger::new(sink).with_min_level(log_level(config.logging.level)))
}

impl std::fmt::Debug for ClientContext {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ClientContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apl_client_config::ClientConfig;
    use apl_client_domain::DocumentId;
    use apl_client_testkit::{NoopLogger, RecordingMetricsSink};

    fn context(enabled: bool) -> Result<ClientContext, Box<dyn std::error::Error>> {
        let mut config = ClientConfig::default();
        config.telemetry.enabled = enabled;
        Ok(ClientContext::new(config.validate()?, Arc::new(NoopLogger)))
    }

    #[test]
    fn starts_with_null_recorder() -> Result<(), Box<dyn std::error::Error>> {
        let context = context(true)?;
        assert_eq!(context.recorder().register_document(), DocumentId::UNKNOWN);
        Ok(())
    }

    #[test]
    fn sink_installs_live_recorder_and_none_removes_it() -> Result<(), Box<dyn std::error::Error>>
    {
        let context = context(true)?;
        context.on_telemetry_sink_updated(Some(RecordingMetricsSink::shared()));
        assert_eq!(
            context.recorder().register_document(),
            DocumentId::FIRST_ALLOCATED
        );

        context.on_telemetry_sink_updated(None);
        assert_eq!(context.recorder().register_document(), DocumentId::UNKNOWN);
        Ok(())
    }

    #[test]
    fn configured_level_filters_json_logger() -> Result<(), Box<dyn std::error::Error>> {
        #[derive(Default)]
        struct Lines(std::sync::Mutex<Vec<String>>);

        impl LogSink for Lines {
            fn write_line(&self, line: &str) {
                self.0
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(line.to_owned());
            }
        }

        let mut config = ClientConfig::default();
        config.logging.level = LogLevelSetting::Warn;
        let lines = Arc::new(Lines::default());
        let logger = json_logger(&config.validate()?, lines.clone());

        logger.info("session.render.start", "dropped", None);
        logger.warn("session.render.aborted", "kept", None);

        let lines = lines.0.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(lines.len(), 1);
        assert!(lines.iter().all(|line| line.contains("session.render.aborted")));
        Ok(())
    }

    #[test]
    fn levels_map_one_to_one() {
        assert_eq!(log_level(LogLevelSetting::Debug), LogLevel::Debug);
        assert_eq!(log_level(LogLevelSetting::default()), LogLevel::Info);
        assert_eq!(log_level(LogLevelSetting::Error), LogLevel::Error);
    }

    #[test]
    fn disabled_telemetry_ignores_sinks() -> Result<(), Box<dyn std::error::Error>> {
        let context = context(false)?;
        context.on_telemetry_sink_updated(Some(RecordingMetricsSink::shared()));
        assert_eq!(context.recorder().register_document(), DocumentId::UNKNOWN);
        Ok(())
    }
}
