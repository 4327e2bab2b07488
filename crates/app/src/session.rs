//! One rendering session for one viewhost window.
//!
//! Messages arrive on two threads. `should_handle_message` runs on the IO
//! thread and may complete a blocking exchange; everything else runs on the
//! render/update thread. Render attempts move through [`SessionState`], and the
//! observer hears about an attempt only when the state machine accepts its
//! terminal transition.

use crate::context::ClientContext;
use crate::replies::{PendingReplies, SEQNO_FIELD, seqno_of};
use apl_client_domain::{
    COMPONENT_COMPLEXITY_METRIC, DocumentId, RenderOutcome, RenderingEvent, ReportedMetricKind,
    Segment, SessionState, TokenAttribution, parse_reported_metrics,
};
use apl_client_ports::{
    ConnectionManagerPort, GuiRendererPort, LogFields, LoggerPort, MetricTimer, MetricsSinkPort,
    RenderObserverPort, RenderRequest, SessionBackend, SharedExtension, ViewhostPort, log_fields,
};
use apl_client_shared::{
    ErrorClass, ErrorCode, ErrorEnvelope, Result, ResultExt, await_with_timeout,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Counter bumped for every render directive the session receives.
pub const DIRECTIVE_RECEIVED_METRIC: &str = "SmartScreenSDK.renderDocument.directiveReceived";

/// Document metadata key for the client id parsed from the render token.
pub const CLIENT_ID_METADATA: &str = "clientId";
/// Document metadata key for the skill id parsed from the render token.
pub const SKILL_ID_METADATA: &str = "skillId";
/// Document metadata key for the raw render token.
pub const TOKEN_METADATA: &str = "token";

/// Viewhost-facing collaborators shared by every session of a binding.
#[derive(Clone)]
pub struct SessionDeps {
    /// Client-wide config, logger and recorder slot.
    pub context: Arc<ClientContext>,
    /// Outbound channel to the viewhost.
    pub viewhost: Arc<dyn ViewhostPort>,
    /// Receiver of render results.
    pub observer: Arc<dyn RenderObserverPort>,
}

#[derive(Default)]
struct SessionInner {
    state: SessionState,
    token: Option<Box<str>>,
    complexity: u64,
    render_timer: Option<Box<dyn MetricTimer>>,
}

struct CompletedAttempt {
    token: Box<str>,
    started_at: Instant,
    outcome: RenderOutcome,
    timer: Option<Box<dyn MetricTimer>>,
}

/// Session bridging one viewhost window to its engine collaborators.
pub struct RendererSession {
    window_id: Box<str>,
    context: Arc<ClientContext>,
    viewhost: Arc<dyn ViewhostPort>,
    observer: Arc<dyn RenderObserverPort>,
    connection: Box<dyn ConnectionManagerPort>,
    renderer: Box<dyn GuiRendererPort>,
    logger: Box<dyn LoggerPort>,
    inner: Mutex<SessionInner>,
    extensions: RwLock<BTreeMap<Box<str>, SharedExtension>>,
    replies: PendingReplies,
}

impl RendererSession {
    /// Session for `window_id` driving `backend`.
    #[must_use]
    pub fn new(window_id: &str, deps: SessionDeps, backend: SessionBackend) -> Self {
        let logger = deps
            .context
            .logger()
            .child(log_fields([("windowId", json!(window_id))]));
        Self {
            window_id: window_id.into(),
            context: deps.context,
            viewhost: deps.viewhost,
            observer: deps.observer,
            connection: backend.connection,
            renderer: backend.renderer,
            logger,
            inner: Mutex::new(SessionInner::default()),
            extensions: RwLock::new(BTreeMap::new()),
            replies: PendingReplies::default(),
        }
    }

    /// Window this session renders into.
    #[must_use]
    pub fn window_id(&self) -> &str {
        &self.window_id
    }

    /// Snapshot of the lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// Token of the document being rendered or displayed.
    #[must_use]
    pub fn current_token(&self) -> Option<Box<str>> {
        self.lock().token.clone()
    }

    /// IO-thread pre-filter for raw viewhost messages.
    ///
    /// Replies to pending blocking exchanges are consumed here and answer
    /// `false`. Malformed JSON is logged as `session:malformed_message` and
    /// rejected.
    pub fn should_handle_message(&self, raw: &str) -> bool {
        let Some(message) = self.parse_message(raw) else {
            return false;
        };
        if let Some(seqno) = seqno_of(&message) {
            if self.replies.complete(seqno, message.clone()) {
                tracing::trace!(window_id = %self.window_id, seqno, "reply delivered to waiter");
                return false;
            }
        }
        self.connection.should_handle_message(&message)
    }

    /// Render-thread half of the message handoff.
    pub fn handle_message(&self, raw: &str) {
        if let Some(message) = self.parse_message(raw) {
            self.connection.handle_message(&message);
        }
    }

    /// A render directive reached the client at `received_at`.
    ///
    /// Registers a fresh document and starts its render timer from the
    /// receipt time. An attempt still in flight is reported as failed.
    pub fn on_render_directive_received(&self, received_at: Instant) {
        self.abort_in_flight("superseded by a newer render directive");

        let recorder = self.context.recorder();
        let document = recorder.register_document();
        let timer = recorder.create_segment_timer(
            document,
            Segment::RenderDocument,
            self.context.config().telemetry.report_zero_render_failures,
        );
        timer.started_at(received_at);
        recorder
            .create_counter(document, DIRECTIVE_RECEIVED_METRIC, false)
            .increment();

        let mut inner = self.lock();
        inner.state = SessionState::begin_render(received_at);
        inner.render_timer = Some(timer);
        inner.complexity = 0;
    }

    /// Hand a document to the GUI renderer.
    ///
    /// Token attribution is attached to the latest document first, so a
    /// failed render still carries it.
    pub fn render_document(&self, document: Value, data: Value, viewports: Value, token: &str) {
        let attribution = TokenAttribution::parse(token);
        let recorder = self.context.recorder();
        recorder.add_metadata(DocumentId::LATEST, CLIENT_ID_METADATA, &attribution.client_id);
        recorder.add_metadata(DocumentId::LATEST, SKILL_ID_METADATA, &attribution.skill_id);
        recorder.add_metadata(DocumentId::LATEST, TOKEN_METADATA, token);

        {
            let mut inner = self.lock();
            inner.token = Some(token.into());
            if !inner.state.is_rendering() {
                inner.state = SessionState::begin_render(Instant::now());
            }
        }

        self.logger.info(
            "session.render.start",
            "rendering document",
            Some(render_fields(token, &attribution)),
        );

        let request = RenderRequest {
            document,
            data,
            viewports,
            token: token.into(),
        };
        if let Err(error) = self.renderer.render_document(&request) {
            self.logger.error_envelope(
                "session.render.failed",
                &error,
                Some(render_fields(token, &attribution)),
            );
            self.abort_render(&error.message);
        }
    }

    /// Engine lifecycle notification for the current document.
    ///
    /// Only terminal events touch the session; the rest are logged.
    pub fn on_rendering_event(&self, event: RenderingEvent) {
        if !event.is_terminal() {
            self.logger.debug(
                "session.render.event",
                "rendering event ignored",
                Some(log_fields([("event", json!(event))])),
            );
            return;
        }
        if event == RenderingEvent::DocumentRendered {
            self.on_document_rendered();
        } else {
            self.abort_render("rendering aborted by the engine");
        }
    }

    /// Apply a viewhost-pushed metrics batch, all or nothing.
    pub fn on_metrics_reported(&self, payload: &str) {
        let metrics = match parse_reported_metrics(payload) {
            Ok(metrics) => metrics,
            Err(error) => {
                self.logger
                    .error_envelope("session.metrics.rejected", &ErrorEnvelope::from(error), None);
                return;
            },
        };

        let recorder = self.context.recorder();
        for metric in &metrics {
            match metric.kind {
                ReportedMetricKind::Timer => {
                    // Segment keys report under their canonical name. The
                    // render-document segment belongs to the directive timer.
                    let timer = match Segment::from_key(&metric.name) {
                        Some(Segment::RenderDocument) | None => {
                            recorder.create_timer(DocumentId::CURRENT, &metric.name, false)
                        },
                        Some(segment) => {
                            recorder.create_segment_timer(DocumentId::CURRENT, segment, false)
                        },
                    };
                    timer.elapsed(Duration::from_millis(metric.value));
                },
                ReportedMetricKind::Counter if &*metric.name == COMPONENT_COMPLEXITY_METRIC => {
                    self.lock().complexity = metric.value;
                },
                ReportedMetricKind::Counter => {
                    recorder
                        .create_counter(DocumentId::CURRENT, &metric.name, false)
                        .increment_by(metric.value);
                },
            }
        }
        recorder.flush();
    }

    /// Install a new metrics sink, or remove it with `None`.
    ///
    /// The recorder lives in the shared context, so every session of the
    /// binding switches together.
    pub fn on_telemetry_sink_updated(&self, sink: Option<Arc<dyn MetricsSinkPort>>) {
        self.context.on_telemetry_sink_updated(sink);
    }

    /// Register an extension and announce it to the engine.
    pub fn add_extension(&self, extension: SharedExtension) {
        let uri: Box<str> = extension.uri().into();
        self.connection.register_extension(&uri);
        self.extensions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri, extension);
    }

    /// Extension registered under `uri`.
    #[must_use]
    pub fn extension(&self, uri: &str) -> Option<SharedExtension> {
        self.extensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }

    /// Forward an extension event to the document. Unknown URIs are dropped.
    pub fn on_extension_event(&self, uri: &str, name: &str, payload: &Value, fast_mode: bool) {
        if self.extension(uri).is_none() {
            self.logger.warn(
                "session.extension.unknown",
                "event for unregistered extension dropped",
                Some(log_fields([("uri", json!(uri)), ("name", json!(name))])),
            );
            return;
        }
        self.connection
            .invoke_extension_event_handler(uri, name, payload, fast_mode);
    }

    /// Send `message` to the viewhost and wait for the reply carrying the same
    /// `seqno`.
    ///
    /// `timeout` defaults to the configured reply timeout. An expired exchange
    /// fails with `core:timeout` and is not retried.
    pub async fn send_and_wait(&self, message: Value, timeout: Option<Duration>) -> Result<Value> {
        let Value::Object(mut body) = message else {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "blocking requests must be JSON objects",
            ));
        };

        let (seqno, receiver) = self.replies.register();
        let _waiter = self.replies.cancel_on_drop(seqno);
        body.insert(SEQNO_FIELD.into(), Value::from(seqno));
        self.viewhost.send_message(&self.window_id, &Value::Object(body));

        let timeout = timeout.unwrap_or_else(|| self.context.config().reply_timeout());
        let reply = await_with_timeout(timeout, "session.sendAndWait", async move {
            receiver.await.map_err(|_| {
                ErrorEnvelope::unexpected(
                    ErrorCode::channel_closed(),
                    "reply channel closed",
                    ErrorClass::NonRetriable,
                )
            })
        })
        .await;

        reply
            .with_error_metadata("seqno", &seqno.to_string())
            .inspect_err(|error| {
                self.logger
                    .error_envelope("session.exchange.failed", error, None);
            })
    }

    /// Clear the displayed document and forget its telemetry.
    pub fn clear_document(&self, token: &str) {
        self.abort_in_flight("document cleared");

        self.renderer.clear_document();
        self.connection.reset();
        self.context
            .recorder()
            .invalidate_document(DocumentId::CURRENT);

        {
            let mut inner = self.lock();
            inner.state = SessionState::cleared();
            inner.token = None;
            inner.render_timer = None;
            inner.complexity = 0;
        }

        self.observer.on_clear_document(&self.window_id, token);
    }

    /// Run a command batch against the current document.
    pub fn execute_commands(&self, commands: &Value, token: &str) {
        self.connection.execute_commands(commands, token);
    }

    /// Stop the running command sequence.
    pub fn interrupt_command_sequence(&self) {
        self.connection.interrupt_command_sequence();
    }

    /// Push a data source update into the current document.
    pub fn data_source_update(&self, source_type: &str, payload: &Value, token: &str) {
        self.connection
            .data_source_update(source_type, payload, token);
    }

    /// Advance engine time. Render thread only.
    pub fn on_update_tick(&self) {
        self.connection.on_update_tick();
    }

    fn on_document_rendered(&self) {
        let complexity = std::mem::take(&mut self.lock().complexity);
        self.connection.on_document_rendered(complexity);
        self.finish_attempt(None, complexity);
    }

    fn abort_render(&self, reason: &str) {
        let complexity = std::mem::take(&mut self.lock().complexity);
        self.finish_attempt(Some(reason), complexity);
    }

    fn abort_in_flight(&self, reason: &str) {
        if self.lock().state.is_rendering() {
            self.abort_render(reason);
        }
    }

    fn finish_attempt(&self, failure: Option<&str>, complexity: u64) {
        let Some(attempt) = self.complete_attempt(failure) else {
            self.logger.debug(
                "session.render.unexpectedEvent",
                "render result with no render in flight",
                Some(log_fields([("reason", json!(failure))])),
            );
            return;
        };

        let succeeded = attempt.outcome.is_success();
        if succeeded {
            if let Some(timer) = attempt.timer {
                timer.stop();
            }
        } else {
            if let Some(timer) = attempt.timer {
                timer.fail();
            }
            // Nothing else flushes a document whose render never completed.
            self.context.recorder().flush();
        }

        let reason = match &attempt.outcome {
            RenderOutcome::Failed { reason } => Some(&**reason),
            RenderOutcome::Rendered { .. } => None,
        };
        self.observer
            .on_render_document_complete(&self.window_id, &attempt.token, succeeded, reason);

        let duration_ms =
            u64::try_from(attempt.started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        let fields = log_fields([
            ("durationMs", json!(duration_ms)),
            ("complexity", json!(complexity)),
            ("reason", json!(reason)),
        ]);
        if succeeded {
            self.logger
                .info("session.render.completed", "document rendered", Some(fields));
        } else {
            self.logger
                .warn("session.render.aborted", "render attempt failed", Some(fields));
        }
    }

    fn complete_attempt(&self, failure: Option<&str>) -> Option<CompletedAttempt> {
        let mut inner = self.lock();
        let SessionState::Rendering { started_at } = inner.state else {
            return None;
        };
        let token = inner.token.clone().unwrap_or_default();
        let outcome = match failure {
            None => RenderOutcome::Rendered {
                token: token.clone(),
            },
            Some(reason) => RenderOutcome::Failed {
                reason: reason.into(),
            },
        };
        inner.state = inner.state.complete(outcome.clone())?;
        Some(CompletedAttempt {
            token,
            started_at,
            outcome,
            timer: inner.render_timer.take(),
        })
    }

    fn parse_message(&self, raw: &str) -> Option<Value> {
        serde_json::from_str::<Value>(raw)
            .map_err(|error| {
                ErrorEnvelope::expected(
                    ErrorCode::malformed_message(),
                    "viewhost message is not valid JSON",
                )
                .with_metadata("line", error.line().to_string())
                .with_metadata("column", error.column().to_string())
            })
            .ok_or_log(|error| {
                self.logger
                    .error_envelope("session.message.malformed", error, None);
            })
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RendererSession {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RendererSession")
            .field("window_id", &self.window_id)
            .field("state", &self.lock().state.label())
            .finish_non_exhaustive()
    }
}

fn render_fields(token: &str, attribution: &TokenAttribution) -> LogFields {
    log_fields([
        ("token", json!(token)),
        ("clientId", json!(&*attribution.client_id)),
        ("skillId", json!(&*attribution.skill_id)),
    ])
}
