//! # apl-client-app
//!
//! Renderer sessions, the binding that creates them, and the shared client
//! context. This crate depends on `ports`, `domain`, `shared`, `config`, and
//! `adapters` (for the live and null recorders).

pub mod binding;
pub mod context;
pub mod replies;
pub mod session;

pub use binding::{BindingDeps, RendererBinding};
pub use context::{ClientContext, json_logger, log_level};
pub use replies::{PendingReplies, SEQNO_FIELD};
pub use session::{
    CLIENT_ID_METADATA, DIRECTIVE_RECEIVED_METRIC, RendererSession, SKILL_ID_METADATA,
    SessionDeps, TOKEN_METADATA,
};

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
