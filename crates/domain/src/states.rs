//! Per-session lifecycle.
//!
//! A render attempt starts in [`SessionState::Rendering`] and leaves it exactly
//! once, through [`SessionState::complete`]. The session reports the render
//! result to its observer only when `complete` yields a transition, which is
//! what makes that report exactly-once per attempt.

use std::time::Instant;

/// Lifecycle of one renderer session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing rendered or the last document was cleared.
    #[default]
    Idle,
    /// A render attempt is in flight.
    Rendering {
        /// Earliest known receipt time of the render directive.
        started_at: Instant,
    },
    /// A document is on screen.
    Displayed {
        /// Token of the displayed document.
        token: Box<str>,
    },
    /// The last render attempt failed.
    Aborted {
        /// Human-readable failure reason.
        reason: Box<str>,
    },
}

/// How a render attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The document reached the screen.
    Rendered {
        /// Token of the rendered document.
        token: Box<str>,
    },
    /// The attempt failed or was abandoned.
    Failed {
        /// Human-readable failure reason.
        reason: Box<str>,
    },
}

impl SessionState {
    /// Stable label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Rendering { .. } => "rendering",
            Self::Displayed { .. } => "displayed",
            Self::Aborted { .. } => "aborted",
        }
    }

    /// True while a render attempt is in flight.
    #[must_use]
    pub const fn is_rendering(&self) -> bool {
        matches!(self, Self::Rendering { .. })
    }

    /// Start a new render attempt. Any previous attempt is superseded.
    #[must_use]
    pub const fn begin_render(started_at: Instant) -> Self {
        Self::Rendering { started_at }
    }

    /// End the in-flight attempt.
    ///
    /// Returns `None` when no attempt is in flight, so a second terminal
    /// signal for the same attempt does not produce a second transition.
    #[must_use]
    pub fn complete(&self, outcome: RenderOutcome) -> Option<Self> {
        if !self.is_rendering() {
            return None;
        }
        Some(match outcome {
            RenderOutcome::Rendered { token } => Self::Displayed { token },
            RenderOutcome::Failed { reason } => Self::Aborted { reason },
        })
    }

    /// Drop whatever is displayed.
    #[must_use]
    pub const fn cleared() -> Self {
        Self::Idle
    }
}

impl RenderOutcome {
    /// Whether the outcome is a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}
