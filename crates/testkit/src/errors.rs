//! Test fixtures for shared error codes and envelopes.

use apl_client_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return a list of common error codes used in tests.
pub fn common_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::invalid_input(),
        ErrorCode::timeout(),
        ErrorCode::internal(),
        ErrorCode::malformed_message(),
        ErrorCode::render_failed(),
        ErrorCode::channel_closed(),
        ErrorCode::invalid_metrics_payload(),
    ]
}

/// A GUI renderer failure fixture.
pub fn render_failed_error(message: &str) -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::render_failed(), message)
}

/// An invalid input error fixture.
pub fn invalid_input_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::invalid_input(), "invalid input")
}

/// A retriable timeout error fixture.
pub fn timeout_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::timeout(), "timeout", ErrorClass::Retriable)
}
