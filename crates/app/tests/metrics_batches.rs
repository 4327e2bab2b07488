//! Viewhost metric batches are applied all-or-nothing.

use apl_client_app::{BindingDeps, RendererBinding, RendererSession};
use apl_client_config::ValidatedClientConfig;
use apl_client_domain::RenderingEvent;
use apl_client_testkit::{
    FakeBackendFactory, NoopLogger, RecordingMetricsSink, RecordingObserver, RecordingViewhost,
};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;

fn displayed_session() -> (RendererBinding, Arc<RendererSession>, Arc<RecordingMetricsSink>) {
    let binding = RendererBinding::new(BindingDeps {
        config: ValidatedClientConfig::default(),
        logger: Arc::new(NoopLogger),
        backends: FakeBackendFactory::shared(),
        viewhost: Arc::new(RecordingViewhost::default()),
        observer: Arc::new(RecordingObserver::default()),
    });
    let sink = RecordingMetricsSink::shared();
    binding.on_telemetry_sink_updated(Some(sink.clone()));
    let session = binding.create_renderer("main");
    session.on_render_directive_received(Instant::now());
    session.on_rendering_event(RenderingEvent::DocumentRendered);
    sink.take();
    (binding, session, sink)
}

fn entry() -> impl Strategy<Value = Value> {
    (
        prop::sample::select(vec!["timer", "counter"]),
        prop::sample::select(vec!["APL.layout", "APL-Web.fetch", "customTaps"]),
        0_u64..10_000,
    )
        .prop_map(|(kind, name, value)| json!({ "kind": kind, "name": name, "value": value }))
}

fn corrupt(entry: &mut Value, how: u8) {
    match how {
        0 => entry["kind"] = json!("gauge"),
        1 => entry["name"] = json!(""),
        2 => entry["value"] = json!(-1),
        3 => entry["value"] = json!("ten"),
        _ => *entry = json!(["not", "an", "object"]),
    }
}

proptest! {
    #[test]
    fn one_bad_entry_leaves_the_recorder_untouched(
        mut entries in prop::collection::vec(entry(), 1..8),
        position in any::<prop::sample::Index>(),
        how in 0_u8..5,
    ) {
        let (_binding, session, sink) = displayed_session();
        let bad = position.index(entries.len());
        if let Some(entry) = entries.get_mut(bad) {
            corrupt(entry, how);
        }

        session.on_metrics_reported(&json!({ "payload": entries }).to_string());
        prop_assert!(sink.reports().is_empty());

        session.on_metrics_reported(r#"{"payload":[]}"#);
        prop_assert!(sink.reports().is_empty());
    }

    #[test]
    fn valid_batches_report_every_entry(entries in prop::collection::vec(entry(), 1..8)) {
        let (_binding, session, sink) = displayed_session();

        session.on_metrics_reported(&json!({ "payload": entries }).to_string());

        let mut expected: Vec<&str> = entries
            .iter()
            .filter_map(|entry| entry["name"].as_str())
            .collect();
        expected.sort_unstable();
        expected.dedup();
        let mut reported: Vec<String> = sink
            .reports()
            .iter()
            .map(|report| report.name().to_string())
            .filter(|name| !name.ends_with(".fail"))
            .collect();
        reported.sort_unstable();
        reported.dedup();
        prop_assert_eq!(reported, expected);
    }
}
