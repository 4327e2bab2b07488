//! Recording doubles for the engine and viewhost collaborators of a session.
//!
//! Every double is `Clone` and shares its recording buffer between clones, so
//! a test keeps one clone while the session owns the boxed other.

use apl_client_ports::{
    ConnectionManagerPort, ExtensionPort, GuiRendererPort, RenderObserverPort, RenderRequest,
    BackendOptions, SessionBackend, SessionBackendFactory, ViewhostPort,
};
use apl_client_shared::{ErrorEnvelope, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

fn push<T>(buffer: &Mutex<Vec<T>>, item: T) {
    buffer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(item);
}

fn snapshot<T: Clone>(buffer: &Mutex<Vec<T>>) -> Vec<T> {
    buffer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// One call received by [`FakeConnectionManager`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionCall {
    /// `should_handle_message`.
    ShouldHandle(Value),
    /// `handle_message`.
    Handle(Value),
    /// `on_document_rendered`.
    DocumentRendered(u64),
    /// `register_extension`.
    RegisterExtension(String),
    /// `invoke_extension_event_handler`.
    ExtensionEvent {
        /// Extension URI.
        uri: String,
        /// Event name.
        name: String,
        /// Event payload.
        payload: Value,
        /// Fast mode flag.
        fast_mode: bool,
    },
    /// `execute_commands`.
    ExecuteCommands {
        /// Command batch.
        commands: Value,
        /// Render token.
        token: String,
    },
    /// `interrupt_command_sequence`.
    InterruptCommandSequence,
    /// `data_source_update`.
    DataSourceUpdate {
        /// Data source type.
        source_type: String,
        /// Update payload.
        payload: Value,
        /// Render token.
        token: String,
    },
    /// `on_update_tick`.
    UpdateTick,
    /// `reset`.
    Reset,
}

/// Connection manager that records calls and accepts every message unless
/// told otherwise.
#[derive(Debug, Clone, Default)]
pub struct FakeConnectionManager {
    calls: Arc<Mutex<Vec<ConnectionCall>>>,
    reject_messages: Arc<AtomicBool>,
}

impl FakeConnectionManager {
    /// Snapshot of all calls.
    pub fn calls(&self) -> Vec<ConnectionCall> {
        snapshot(&self.calls)
    }

    /// Make `should_handle_message` answer `false`.
    pub fn reject_messages(&self, reject: bool) {
        self.reject_messages.store(reject, Ordering::SeqCst);
    }

    /// Complexity values passed to `on_document_rendered`.
    pub fn rendered_complexities(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ConnectionCall::DocumentRendered(complexity) => Some(complexity),
                _ => None,
            })
            .collect()
    }
}

impl ConnectionManagerPort for FakeConnectionManager {
    fn should_handle_message(&self, message: &Value) -> bool {
        push(&self.calls, ConnectionCall::ShouldHandle(message.clone()));
        !self.reject_messages.load(Ordering::SeqCst)
    }

    fn handle_message(&self, message: &Value) {
        push(&self.calls, ConnectionCall::Handle(message.clone()));
    }

    fn on_document_rendered(&self, complexity: u64) {
        push(&self.calls, ConnectionCall::DocumentRendered(complexity));
    }

    fn register_extension(&self, uri: &str) {
        push(&self.calls, ConnectionCall::RegisterExtension(uri.to_string()));
    }

    fn invoke_extension_event_handler(
        &self,
        uri: &str,
        name: &str,
        payload: &Value,
        fast_mode: bool,
    ) {
        push(
            &self.calls,
            ConnectionCall::ExtensionEvent {
                uri: uri.to_string(),
                name: name.to_string(),
                payload: payload.clone(),
                fast_mode,
            },
        );
    }

    fn execute_commands(&self, commands: &Value, token: &str) {
        push(
            &self.calls,
            ConnectionCall::ExecuteCommands {
                commands: commands.clone(),
                token: token.to_string(),
            },
        );
    }

    fn interrupt_command_sequence(&self) {
        push(&self.calls, ConnectionCall::InterruptCommandSequence);
    }

    fn data_source_update(&self, source_type: &str, payload: &Value, token: &str) {
        push(
            &self.calls,
            ConnectionCall::DataSourceUpdate {
                source_type: source_type.to_string(),
                payload: payload.clone(),
                token: token.to_string(),
            },
        );
    }

    fn on_update_tick(&self) {
        push(&self.calls, ConnectionCall::UpdateTick);
    }

    fn reset(&self) {
        push(&self.calls, ConnectionCall::Reset);
    }
}

/// One call received by [`FakeGuiRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub enum RendererCall {
    /// `render_document`.
    Render(RenderRequest),
    /// `clear_document`.
    Clear,
}

/// GUI renderer that records requests and can be primed to fail.
#[derive(Debug, Clone, Default)]
pub struct FakeGuiRenderer {
    calls: Arc<Mutex<Vec<RendererCall>>>,
    next_failure: Arc<Mutex<Option<ErrorEnvelope>>>,
}

impl FakeGuiRenderer {
    /// Snapshot of all calls.
    pub fn calls(&self) -> Vec<RendererCall> {
        snapshot(&self.calls)
    }

    /// Fail the next `render_document` with `error`.
    pub fn fail_next_render(&self, error: ErrorEnvelope) {
        *self
            .next_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
    }
}

impl GuiRendererPort for FakeGuiRenderer {
    fn render_document(&self, request: &RenderRequest) -> Result<()> {
        push(&self.calls, RendererCall::Render(request.clone()));
        let failure = self
            .next_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        failure.map_or(Ok(()), Err)
    }

    fn clear_document(&self) {
        push(&self.calls, RendererCall::Clear);
    }
}

/// Viewhost channel that records outbound messages.
#[derive(Debug, Clone, Default)]
pub struct RecordingViewhost {
    messages: Arc<Mutex<Vec<(String, Value)>>>,
}

impl RecordingViewhost {
    /// Snapshot of `(window_id, payload)` pairs.
    pub fn messages(&self) -> Vec<(String, Value)> {
        snapshot(&self.messages)
    }
}

impl ViewhostPort for RecordingViewhost {
    fn send_message(&self, window_id: &str, payload: &Value) {
        push(&self.messages, (window_id.to_string(), payload.clone()));
    }
}

/// One notification received by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    /// `on_render_document_complete`.
    RenderComplete {
        /// Window id.
        window_id: String,
        /// Render token.
        token: String,
        /// Whether the document reached the screen.
        success: bool,
        /// Failure description.
        error: Option<String>,
    },
    /// `on_clear_document`.
    Cleared {
        /// Window id.
        window_id: String,
        /// Render token.
        token: String,
    },
}

/// Render observer that records notifications.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<ObserverEvent>>>,
}

impl RecordingObserver {
    /// Snapshot of all notifications.
    pub fn events(&self) -> Vec<ObserverEvent> {
        snapshot(&self.events)
    }

    /// Only the render-complete notifications, as `(success, error)`.
    pub fn outcomes(&self) -> Vec<(bool, Option<String>)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObserverEvent::RenderComplete { success, error, .. } => Some((success, error)),
                ObserverEvent::Cleared { .. } => None,
            })
            .collect()
    }
}

impl RenderObserverPort for RecordingObserver {
    fn on_render_document_complete(
        &self,
        window_id: &str,
        token: &str,
        success: bool,
        error: Option<&str>,
    ) {
        push(
            &self.events,
            ObserverEvent::RenderComplete {
                window_id: window_id.to_string(),
                token: token.to_string(),
                success,
                error: error.map(str::to_string),
            },
        );
    }

    fn on_clear_document(&self, window_id: &str, token: &str) {
        push(
            &self.events,
            ObserverEvent::Cleared {
                window_id: window_id.to_string(),
                token: token.to_string(),
            },
        );
    }
}

/// Extension identified only by its URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticExtension {
    uri: String,
}

impl StaticExtension {
    /// Extension with `uri`.
    pub fn new(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
        }
    }
}

impl ExtensionPort for StaticExtension {
    fn uri(&self) -> &str {
        &self.uri
    }
}

/// Backend factory handing out fakes and remembering them per window.
#[derive(Debug, Default)]
pub struct FakeBackendFactory {
    backends: Mutex<BTreeMap<String, (FakeConnectionManager, FakeGuiRenderer)>>,
    options: Mutex<BTreeMap<String, BackendOptions>>,
}

impl FakeBackendFactory {
    /// Shared factory.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connection manager created for `window_id`.
    pub fn connection(&self, window_id: &str) -> Option<FakeConnectionManager> {
        self.backends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(window_id)
            .map(|(connection, _)| connection.clone())
    }

    /// Options the backend for `window_id` was created with.
    pub fn options(&self, window_id: &str) -> Option<BackendOptions> {
        self.options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(window_id)
            .copied()
    }

    /// GUI renderer created for `window_id`.
    pub fn renderer(&self, window_id: &str) -> Option<FakeGuiRenderer> {
        self.backends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(window_id)
            .map(|(_, renderer)| renderer.clone())
    }
}

impl SessionBackendFactory for FakeBackendFactory {
    fn create_backend(&self, window_id: &str, options: &BackendOptions) -> SessionBackend {
        let connection = FakeConnectionManager::default();
        let renderer = FakeGuiRenderer::default();
        self.options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(window_id.to_string(), *options);
        self.backends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(window_id.to_string(), (connection.clone(), renderer.clone()));
        SessionBackend {
            connection: Box::new(connection),
            renderer: Box::new(renderer),
        }
    }
}
