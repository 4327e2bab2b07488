//! Composition root: shared context plus one session per window.

use crate::context::{ClientContext, json_logger};
use crate::session::{RendererSession, SessionDeps};
use apl_client_adapters::LogSink;
use apl_client_config::ValidatedClientConfig;
use apl_client_ports::{
    BackendOptions, LoggerPort, MetricsSinkPort, RenderObserverPort, SessionBackendFactory,
    ViewhostPort, log_fields,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Everything a binding needs from the host.
#[derive(Clone)]
pub struct BindingDeps {
    /// Validated client configuration.
    pub config: ValidatedClientConfig,
    /// Root logger. [`BindingDeps::with_log_sink`] builds one that honors
    /// `logging.level`.
    pub logger: Arc<dyn LoggerPort>,
    /// Builds the engine collaborators of each session.
    pub backends: Arc<dyn SessionBackendFactory>,
    /// Outbound channel to the viewhost.
    pub viewhost: Arc<dyn ViewhostPort>,
    /// Receiver of render results.
    pub observer: Arc<dyn RenderObserverPort>,
}

impl BindingDeps {
    /// Deps whose logger is a JSON logger on `log_sink` filtered at the
    /// configured `logging.level`.
    pub fn with_log_sink(
        config: ValidatedClientConfig,
        log_sink: Arc<dyn LogSink>,
        backends: Arc<dyn SessionBackendFactory>,
        viewhost: Arc<dyn ViewhostPort>,
        observer: Arc<dyn RenderObserverPort>,
    ) -> Self {
        let logger = json_logger(&config, log_sink);
        Self {
            config,
            logger,
            backends,
            viewhost,
            observer,
        }
    }
}

/// Owns the client context and hands out sessions.
///
/// Sessions are owned by the caller; the binding only keeps a weak index so
/// dropped sessions disappear from [`renderer`](Self::renderer) lookups.
pub struct RendererBinding {
    context: Arc<ClientContext>,
    backends: Arc<dyn SessionBackendFactory>,
    viewhost: Arc<dyn ViewhostPort>,
    observer: Arc<dyn RenderObserverPort>,
    sessions: Mutex<BTreeMap<Box<str>, Weak<RendererSession>>>,
}

impl RendererBinding {
    /// Binding with a null recorder until a metrics sink is installed.
    #[must_use]
    pub fn new(deps: BindingDeps) -> Self {
        Self {
            context: Arc::new(ClientContext::new(deps.config, deps.logger)),
            backends: deps.backends,
            viewhost: deps.viewhost,
            observer: deps.observer,
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Shared client context.
    #[must_use]
    pub fn context(&self) -> &Arc<ClientContext> {
        &self.context
    }

    /// Create a session for `window_id`, replacing any previous index entry.
    pub fn create_renderer(&self, window_id: &str) -> Arc<RendererSession> {
        let options = BackendOptions {
            max_concurrent_downloads: self.context.config().session.max_concurrent_downloads,
        };
        let backend = self.backends.create_backend(window_id, &options);
        let deps = SessionDeps {
            context: Arc::clone(&self.context),
            viewhost: Arc::clone(&self.viewhost),
            observer: Arc::clone(&self.observer),
        };
        let session = Arc::new(RendererSession::new(window_id, deps, backend));

        let mut sessions = self.lock();
        sessions.retain(|_, session| session.strong_count() > 0);
        sessions.insert(window_id.into(), Arc::downgrade(&session));
        drop(sessions);

        self.context.logger().info(
            "binding.session.created",
            "renderer session created",
            Some(log_fields([("windowId", json!(window_id))])),
        );
        session
    }

    /// Live session for `window_id`.
    #[must_use]
    pub fn renderer(&self, window_id: &str) -> Option<Arc<RendererSession>> {
        self.lock().get(window_id).and_then(Weak::upgrade)
    }

    /// Swap the metrics recorder for every session at once.
    pub fn on_telemetry_sink_updated(&self, sink: Option<Arc<dyn MetricsSinkPort>>) {
        self.context.on_telemetry_sink_updated(sink);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<Box<str>, Weak<RendererSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RendererBinding {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RendererBinding")
            .field("windows", &self.lock().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
