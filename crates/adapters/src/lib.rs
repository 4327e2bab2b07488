//! # apl-client-adapters
//!
//! Adapter implementations for ports: the live and null metrics recorders,
//! the JSON metrics sink, and the structured JSON logger.
//! This crate depends on `ports`, `domain` and `shared`.

pub mod log_sink;
pub mod logger;
pub mod metrics_recorder;
pub mod metrics_sink;
pub mod null_recorder;

pub use log_sink::{LogSink, StderrLogSink};
pub use logger::JsonLogger;
pub use metrics_recorder::AplMetricsRecorder;
pub use metrics_sink::JsonMetricsSink;
pub use null_recorder::NullMetricsRecorder;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use apl_client_ports::ports_crate_version;
    use apl_client_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]";
                continue;
            }
            if in_deps && line.starts_with("apl-client-") {
                let key = line.split('=').next().unwrap_or("").trim();
                deps.push(key.split('.').next().unwrap_or("").trim().to_string());
            }
        }

        deps
    }

    #[test]
    fn adapters_do_not_depend_on_app_or_config() {
        let deps = workspace_deps();
        let forbidden = ["apl-client-app", "apl-client-config", "apl-client-testkit"];

        for dep in &deps {
            assert!(
                !forbidden.contains(&dep.as_str()),
                "forbidden dependency found: {dep}"
            );
        }
    }

    #[test]
    fn adapters_can_use_ports_and_shared() {
        assert!(!adapters_crate_version().is_empty());
        assert!(!ports_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
