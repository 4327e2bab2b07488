//! Integration tests for shared error propagation.

use apl_client_shared::{ErrorCode, ErrorEnvelope, ErrorKind, ResultExt};
use apl_client_testkit::errors::{common_error_codes, render_failed_error, timeout_error};

#[test]
fn error_envelope_crosses_crates() {
    let timeout = timeout_error();
    assert_eq!(timeout.code, ErrorCode::timeout());
    assert!(timeout.is_timeout());

    let boxed: Box<dyn std::error::Error> = Box::new(timeout);
    assert!(boxed.to_string().contains("timeout"));
}

#[test]
fn render_failures_live_in_the_session_namespace() {
    let error = render_failed_error("missing mainTemplate");
    assert_eq!(error.code.namespace(), "session");
    assert_eq!(error.kind, ErrorKind::Expected);
    assert_eq!(error.message, "missing mainTemplate");
}

#[test]
fn common_codes_are_distinct() {
    let codes = common_error_codes();
    for (index, code) in codes.iter().enumerate() {
        assert!(
            !codes.iter().skip(index + 1).any(|other| other == code),
            "duplicate code {code}"
        );
    }
}

#[test]
fn best_effort_failures_are_logged_then_dropped() {
    let mut logged = Vec::new();
    let outcome = Err::<u64, _>(ErrorEnvelope::expected(ErrorCode::malformed_message(), "bad"))
        .with_error_metadata("windowId", "main")
        .ok_or_log(|error| logged.push((error.code.to_string(), error.metadata.clone())));

    assert!(outcome.is_none());
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].0, "session:malformed_message");
    assert_eq!(logged[0].1.get("windowId").map(String::as_str), Some("main"));
}
