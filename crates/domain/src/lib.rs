//! # apl-client-domain
//!
//! Domain model for the APL client integration layer:
//!
//! - **Documents** - `DocumentId` sentinels and the wrapping allocator
//! - **Segments** - well-known rendering phases and their metric names
//! - **Tokens** - client/skill attribution extracted from render tokens
//! - **Events** - engine rendering lifecycle events
//! - **Reported metrics** - validation of viewhost-pushed metric batches
//! - **State** - the explicit per-session lifecycle
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

// Re-export shared types for convenience
pub use apl_client_shared::shared_crate_version;

// =============================================================================
// DOMAIN MODULES
// =============================================================================

pub mod document;
pub mod events;
pub mod reported;
pub mod segment;
pub mod states;
pub mod token;

pub use document::{DocumentId, DocumentIdAllocator};
pub use events::RenderingEvent;
pub use reported::{
    COMPONENT_COMPLEXITY_METRIC, MetricsPayloadError, ReportedMetric, ReportedMetricKind,
    parse_reported_metrics,
};
pub use segment::Segment;
pub use states::{RenderOutcome, SessionState};
pub use token::{TOKEN_DELIMITER, TokenAttribution};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_crate_compiles() {
        let version = domain_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn domain_depends_on_shared() {
        let shared_version = shared_crate_version();
        assert!(!shared_version.is_empty());
    }
}
