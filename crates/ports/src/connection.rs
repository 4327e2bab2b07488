//! Engine connection manager boundary.
//!
//! The connection manager owns the engine-side protocol state. Sessions treat
//! it as opaque and only forward to it. Methods take `&self` because
//! `should_handle_message` runs on the IO thread while everything else runs on
//! the render thread.

use serde_json::Value;

/// Engine-facing connection manager for one session.
pub trait ConnectionManagerPort: Send + Sync {
    /// Cheap pre-filter, callable from any thread.
    fn should_handle_message(&self, message: &Value) -> bool;

    /// Process a message that passed the pre-filter. Render thread only.
    fn handle_message(&self, message: &Value);

    /// The current document reached the screen.
    fn on_document_rendered(&self, complexity: u64);

    /// Make an extension URI known to the engine.
    fn register_extension(&self, uri: &str);

    /// Dispatch an extension event to the document.
    fn invoke_extension_event_handler(
        &self,
        uri: &str,
        name: &str,
        payload: &Value,
        fast_mode: bool,
    );

    /// Run a command batch against the current document.
    fn execute_commands(&self, commands: &Value, token: &str);

    /// Stop the running command sequence, if any.
    fn interrupt_command_sequence(&self);

    /// Push a data source update into the current document.
    fn data_source_update(&self, source_type: &str, payload: &Value, token: &str);

    /// Advance engine time. Render thread only.
    fn on_update_tick(&self);

    /// Drop all document state.
    fn reset(&self);
}
