//! Timeout helper for request/response exchanges with the viewhost.
//!
//! A timed out exchange is reported as failed; callers decide whether to try
//! again. Nothing in this layer retries automatically.

use crate::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use std::future::Future;
use std::time::Duration;

/// Await `fut`, failing with a `core:timeout` envelope after `timeout`.
pub async fn await_with_timeout<T, F>(
    timeout: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or_else(|_| Err(timeout_error(operation, timeout)))
}

fn timeout_error(operation: &'static str, timeout: Duration) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::timeout(),
        format!("operation timed out: {operation}"),
        ErrorClass::Retriable,
    )
    .with_metadata("operation", operation)
    .with_metadata("timeoutMs", timeout.as_millis().to_string())
}
