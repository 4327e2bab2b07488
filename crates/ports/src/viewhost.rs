//! Viewhost-facing boundaries: the outbound channel and the render observer.

use serde_json::Value;

/// Outbound message channel to the remote viewhost.
pub trait ViewhostPort: Send + Sync {
    /// Send one message to the viewhost window.
    fn send_message(&self, window_id: &str, payload: &Value);
}

/// Observer notified about user-visible render results.
pub trait RenderObserverPort: Send + Sync {
    /// A render attempt ended. Called exactly once per attempt.
    fn on_render_document_complete(
        &self,
        window_id: &str,
        token: &str,
        success: bool,
        error: Option<&str>,
    );

    /// The displayed document was cleared.
    fn on_clear_document(&self, window_id: &str, token: &str);
}
