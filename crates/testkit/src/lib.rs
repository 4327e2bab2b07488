//! # apl-client-testkit
//!
//! Test doubles and fixtures.
//! This crate depends on `ports` and `shared`.

pub mod errors;
pub mod fakes;
pub mod in_memory;

pub use fakes::{
    ConnectionCall, FakeBackendFactory, FakeConnectionManager, FakeGuiRenderer, ObserverEvent,
    RecordingObserver, RecordingViewhost, RendererCall, StaticExtension,
};
pub use in_memory::{MemoryLogger, NoopLogger, RecordingMetricsSink, SinkReport};

/// Returns the testkit crate version.
#[must_use]
pub const fn testkit_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Absolute path of a file under the testkit `fixtures/` directory.
#[must_use]
pub fn fixture_path(relative: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apl_client_ports::{
        BackendOptions, ConnectionManagerPort, GuiRendererPort, LoggerPort, MetricsSinkPort,
        RenderRequest, SessionBackendFactory, log_fields, ports_crate_version,
    };
    use apl_client_shared::shared_crate_version;
    use serde_json::json;

    #[test]
    fn testkit_can_use_ports_and_shared() {
        assert!(!testkit_crate_version().is_empty());
        assert!(!ports_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }

    #[test]
    fn fixtures_directory_exists() {
        assert!(fixture_path("config/client-config.valid.json").is_file());
    }

    #[test]
    fn memory_logger_children_share_the_buffer() {
        let logger = MemoryLogger::default();
        let child = logger.child(log_fields([("windowId", json!("main"))]));
        child.warn("session.message.malformed", "bad json", None);

        let events = logger.events();
        assert_eq!(events.len(), 1);
        let fields = events[0].fields.clone().unwrap_or_default();
        assert_eq!(fields.get("windowId"), Some(&json!("main")));
        assert!(logger.contains("session.message.malformed"));
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingMetricsSink::default();
        let metadata = apl_client_ports::MetricMetadata::new();
        sink.report_counter(&metadata, "a", 1);
        sink.report_timer(&metadata, "b", std::time::Duration::from_millis(3));

        let names: Vec<String> = sink.take().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(sink.reports().is_empty());
    }

    #[test]
    fn factory_remembers_backends_per_window() {
        let factory = FakeBackendFactory::default();
        let options = BackendOptions {
            max_concurrent_downloads: 3,
        };
        let backend = factory.create_backend("main", &options);
        backend.connection.on_update_tick();
        let request = RenderRequest {
            document: json!({}),
            data: json!({}),
            viewports: json!([]),
            token: "t".into(),
        };

        factory
            .renderer("main")
            .expect("renderer")
            .fail_next_render(errors::render_failed_error("boom"));
        assert!(backend.renderer.render_document(&request).is_err());
        assert!(backend.renderer.render_document(&request).is_ok());

        let connection = factory.connection("main").expect("connection");
        assert_eq!(connection.calls(), [ConnectionCall::UpdateTick]);
        assert!(factory.connection("other").is_none());
        assert_eq!(factory.options("main"), Some(options));
    }
}
