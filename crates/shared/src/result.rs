//! Result helpers for shared error handling.

use crate::errors::ErrorEnvelope;

/// Shared result type used across the workspace.
pub type Result<T, E = ErrorEnvelope> = std::result::Result<T, E>;

/// Extension helpers for results crossing crate boundaries.
pub trait ResultExt<T> {
    /// Attach a metadata entry to the error, if any.
    #[must_use]
    fn with_error_metadata(self, key: &str, value: &str) -> Self;

    /// Discard the error after handing it to `log`.
    ///
    /// For best-effort paths such as inbound viewhost messages, where a
    /// failure is recorded but never propagated.
    fn ok_or_log<F>(self, log: F) -> Option<T>
    where
        F: FnOnce(&ErrorEnvelope);
}

impl<T> ResultExt<T> for Result<T> {
    fn with_error_metadata(self, key: &str, value: &str) -> Self {
        self.map_err(|error| error.with_metadata(key, value))
    }

    fn ok_or_log<F>(self, log: F) -> Option<T>
    where
        F: FnOnce(&ErrorEnvelope),
    {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                log(&error);
                None
            },
        }
    }
}
