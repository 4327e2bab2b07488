//! Attribution extracted from render tokens.
//!
//! Tokens look like
//! `amzn{ver}.{namespace}.{templateVer}.{clientId}#TID#{skillId}:{skillToken}:{random}`.
//! Only the client and skill identifiers are pulled out; the rest stays opaque.

/// Separates the client id from the skill portion of a render token.
pub const TOKEN_DELIMITER: &str = "#TID#";

/// Client and skill identifiers carried by a render token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenAttribution {
    /// Segment between the last `.` before the delimiter and the delimiter.
    pub client_id: Box<str>,
    /// Segment between the delimiter and the next `:`.
    pub skill_id: Box<str>,
}

impl TokenAttribution {
    /// Extract attribution from `token`. Missing pieces come back empty.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        let Some(delimiter_at) = token.find(TOKEN_DELIMITER) else {
            return Self::default();
        };

        let head = token.get(..delimiter_at).unwrap_or_default();
        let client_id = head.rfind('.').map_or(head, |dot| {
            head.get(dot + 1..).unwrap_or_default()
        });

        let tail = token
            .get(delimiter_at + TOKEN_DELIMITER.len()..)
            .unwrap_or_default();
        let skill_id = tail.split(':').next().unwrap_or_default();

        Self {
            client_id: client_id.into(),
            skill_id: skill_id.into(),
        }
    }
}
