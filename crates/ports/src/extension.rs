//! Extension capability providers and session backend construction.

use crate::{ConnectionManagerPort, GuiRendererPort};
use std::sync::Arc;

/// Pluggable capability provider (audio player, backstack, ...).
///
/// The session stores extensions by URI and leaves the semantics to the
/// engine.
pub trait ExtensionPort: Send + Sync {
    /// Stable extension URI.
    fn uri(&self) -> &str;
}

/// Per-window engine collaborators created for a new session.
pub struct SessionBackend {
    /// Connection manager owned by the session.
    pub connection: Box<dyn ConnectionManagerPort>,
    /// GUI renderer owned by the session.
    pub renderer: Box<dyn GuiRendererPort>,
}

impl std::fmt::Debug for SessionBackend {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("SessionBackend").finish_non_exhaustive()
    }
}

/// Client settings handed to every new backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendOptions {
    /// Cap on parallel content downloads for the GUI renderer.
    pub max_concurrent_downloads: u32,
}

/// Builds engine collaborators for each window.
pub trait SessionBackendFactory: Send + Sync {
    /// Create a fresh backend for `window_id`.
    fn create_backend(&self, window_id: &str, options: &BackendOptions) -> SessionBackend;
}

/// Shared extension handle.
pub type SharedExtension = Arc<dyn ExtensionPort>;
