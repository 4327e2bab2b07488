//! Engine rendering lifecycle events.

use serde::{Deserialize, Serialize};

/// Lifecycle event raised by the engine while rendering a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderingEvent {
    /// Root context inflation started.
    InflateBegin,
    /// Root context inflation finished.
    InflateEnd,
    /// A text measurement pass ran.
    TextMeasure,
    /// The document is on screen.
    DocumentRendered,
    /// Rendering was abandoned; nothing further arrives for this document.
    RenderAborted,
}

impl RenderingEvent {
    /// True for events that end a render attempt.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::DocumentRendered | Self::RenderAborted)
    }
}
