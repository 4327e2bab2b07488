//! Secret detection and redaction utilities.
//!
//! Render tokens embed a skill token, so any field whose key looks like a
//! token or credential is redacted before it reaches a log line.

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

/// Checks if a key/field name likely refers to a secret.
///
/// # Examples
///
/// ```
/// use apl_client_shared::is_secret_key;
///
/// assert!(is_secret_key("token"));
/// assert!(is_secret_key("skillToken"));
/// assert!(!is_secret_key("windowId"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    key.contains("KEY")
        || key.contains("TOKEN")
        || key.contains("SECRET")
        || key.contains("PASSWORD")
        || key.contains("CREDENTIAL")
        || key.contains("AUTH")
}

/// Redacts a value if the key is likely a secret.
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_token_like_keys() {
        assert!(is_secret_key("token"));
        assert!(is_secret_key("renderToken"));
        assert!(is_secret_key("SKILL_TOKEN"));
        assert!(is_secret_key("apiKey"));
        assert!(is_secret_key("basic_auth"));
    }

    #[test]
    fn keeps_attribution_keys() {
        assert!(!is_secret_key("clientId"));
        assert!(!is_secret_key("skillId"));
        assert!(!is_secret_key("windowId"));
        assert!(!is_secret_key("documentId"));
    }

    #[test]
    fn redacts_secret_values_only() {
        assert_eq!(redact_if_secret("token", "amzn1.ns.2.c#TID#s:t:1"), REDACTED);
        assert_eq!(redact_if_secret("windowId", "main"), "main");
    }
}
