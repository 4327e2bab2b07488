//! Blocking request/response exchanges and the dual-thread message handoff.

use apl_client_app::{BindingDeps, RendererBinding, RendererSession, SEQNO_FIELD};
use apl_client_config::{ClientConfig, ValidatedClientConfig};
use apl_client_shared::ErrorCode;
use apl_client_testkit::{
    ConnectionCall, FakeBackendFactory, NoopLogger, RecordingObserver, RecordingViewhost,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

fn binding(
    config: ValidatedClientConfig,
) -> (RendererBinding, Arc<FakeBackendFactory>, RecordingViewhost) {
    let factory = FakeBackendFactory::shared();
    let viewhost = RecordingViewhost::default();
    let binding = RendererBinding::new(BindingDeps {
        config,
        logger: Arc::new(NoopLogger),
        backends: factory.clone(),
        viewhost: Arc::new(viewhost.clone()),
        observer: Arc::new(RecordingObserver::default()),
    });
    (binding, factory, viewhost)
}

async fn outbound_seqno(viewhost: &RecordingViewhost) -> u64 {
    loop {
        if let Some((_, message)) = viewhost.messages().last() {
            if let Some(seqno) = message.get(SEQNO_FIELD).and_then(Value::as_u64) {
                return seqno;
            }
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test]
async fn reply_is_matched_on_the_io_thread() -> Result<(), Box<dyn std::error::Error>> {
    let (binding, factory, viewhost) = binding(ValidatedClientConfig::default());
    let session = binding.create_renderer("main");

    let io_session = Arc::clone(&session);
    let io_viewhost = viewhost.clone();
    let io = tokio::spawn(async move {
        let seqno = outbound_seqno(&io_viewhost).await;
        let reply = json!({ "type": "measure", SEQNO_FIELD: seqno, "width": 640 }).to_string();
        io_session.should_handle_message(&reply)
    });

    let reply = session
        .send_and_wait(json!({ "type": "measure" }), Some(Duration::from_secs(5)))
        .await?;

    assert!(!io.await?);
    assert_eq!(reply["width"], json!(640));
    let sent = viewhost.messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "main");
    assert_eq!(sent[0].1["type"], json!("measure"));

    let connection = factory.connection("main").ok_or("connection")?;
    assert!(
        !connection
            .calls()
            .iter()
            .any(|call| matches!(call, ConnectionCall::ShouldHandle(_)))
    );
    Ok(())
}

#[tokio::test]
async fn unanswered_exchange_times_out_without_retry() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ClientConfig::default();
    config.session.reply_timeout_ms = 20;
    let (binding, factory, viewhost) = binding(config.validate()?);
    let session = binding.create_renderer("main");

    let Err(error) = session.send_and_wait(json!({ "type": "measure" }), None).await else {
        return Err("expected timeout".into());
    };
    assert_eq!(error.code, ErrorCode::timeout());
    assert!(error.metadata.contains_key("seqno"));
    assert_eq!(viewhost.messages().len(), 1);

    let seqno = viewhost.messages()[0].1[SEQNO_FIELD].as_u64().ok_or("seqno")?;
    let late = json!({ SEQNO_FIELD: seqno }).to_string();
    assert!(session.should_handle_message(&late));
    let connection = factory.connection("main").ok_or("connection")?;
    assert_eq!(connection.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn dropped_exchange_releases_its_seqno() -> Result<(), Box<dyn std::error::Error>> {
    let (binding, factory, viewhost) = binding(ValidatedClientConfig::default());
    let session = binding.create_renderer("main");

    let exchange =
        session.send_and_wait(json!({ "type": "measure" }), Some(Duration::from_secs(60)));
    tokio::select! {
        _ = exchange => return Err("exchange finished without a reply".into()),
        () = tokio::time::sleep(Duration::from_millis(10)) => {},
    }

    let seqno = outbound_seqno(&viewhost).await;
    let late = json!({ SEQNO_FIELD: seqno }).to_string();
    assert!(session.should_handle_message(&late));
    let connection = factory.connection("main").ok_or("connection")?;
    assert_eq!(connection.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn non_object_requests_are_rejected() {
    let (binding, _factory, viewhost) = binding(ValidatedClientConfig::default());
    let session = binding.create_renderer("main");

    let result = session.send_and_wait(json!([1, 2]), None).await;
    assert!(matches!(result, Err(error) if error.code == ErrorCode::invalid_input()));
    assert!(viewhost.messages().is_empty());
}

#[test]
fn prefilter_and_handler_run_on_different_threads() -> Result<(), Box<dyn std::error::Error>> {
    let (binding, factory, _viewhost) = binding(ValidatedClientConfig::default());
    let session: Arc<RendererSession> = binding.create_renderer("main");
    let (sender, receiver) = std::sync::mpsc::channel::<String>();

    let io_session = Arc::clone(&session);
    let io = std::thread::spawn(move || {
        for index in 0..50 {
            let raw = json!({ "type": "event", "index": index }).to_string();
            if io_session.should_handle_message(&raw) && sender.send(raw).is_err() {
                break;
            }
        }
    });

    let render_thread = std::thread::spawn(move || {
        let mut handled = 0;
        for raw in receiver {
            session.handle_message(&raw);
            session.on_update_tick();
            handled += 1;
        }
        handled
    });

    io.join().map_err(|_| "io thread panicked")?;
    let handled = render_thread.join().map_err(|_| "render thread panicked")?;
    assert_eq!(handled, 50);

    let connection = factory.connection("main").ok_or("connection")?;
    let indices: Vec<u64> = connection
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            ConnectionCall::Handle(message) => message["index"].as_u64(),
            _ => None,
        })
        .collect();
    assert_eq!(indices, (0..50).collect::<Vec<u64>>());
    Ok(())
}
