//! Client configuration schema, defaults and validation.
//!
//! Deserialization goes through `serde` (JSON or TOML). Validation is manual
//! and returns a typed [`ConfigSchemaError`] that maps into `ErrorEnvelope`.

use apl_client_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

const REPLY_TIMEOUT_MIN_MS: u64 = 10;
const REPLY_TIMEOUT_MAX_MS: u64 = 60_000;
const REPLY_TIMEOUT_DEFAULT_MS: u64 = 2_000;
const MAX_CONCURRENT_DOWNLOADS_MIN: u32 = 1;
const MAX_CONCURRENT_DOWNLOADS_MAX: u32 = 64;
const MAX_CONCURRENT_DOWNLOADS_DEFAULT: u32 = 5;

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ClientConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Renderer session settings.
    pub session: SessionConfig,
    /// Metrics recorder settings.
    pub telemetry: TelemetryConfig,
    /// Structured logging settings.
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            session: SessionConfig::default(),
            telemetry: TelemetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Validate the config.
    pub fn validate(self) -> Result<ValidatedClientConfig, ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        self.session.validate()?;
        Ok(ValidatedClientConfig { raw: self })
    }
}

/// Config that passed [`ClientConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedClientConfig {
    raw: ClientConfig,
}

impl ValidatedClientConfig {
    /// Default reply timeout for blocking viewhost exchanges.
    #[must_use]
    pub const fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.raw.session.reply_timeout_ms)
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> ClientConfig {
        self.raw
    }
}

impl Default for ValidatedClientConfig {
    fn default() -> Self {
        Self {
            raw: ClientConfig::default(),
        }
    }
}

impl AsRef<ClientConfig> for ValidatedClientConfig {
    fn as_ref(&self) -> &ClientConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedClientConfig {
    type Target = ClientConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Renderer session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SessionConfig {
    /// Default wait (ms) for a viewhost reply in a blocking exchange.
    pub reply_timeout_ms: u64,
    /// Cap on parallel content downloads, passed to GUI renderers.
    pub max_concurrent_downloads: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: REPLY_TIMEOUT_DEFAULT_MS,
            max_concurrent_downloads: MAX_CONCURRENT_DOWNLOADS_DEFAULT,
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        if !(REPLY_TIMEOUT_MIN_MS..=REPLY_TIMEOUT_MAX_MS).contains(&self.reply_timeout_ms) {
            return Err(ConfigSchemaError::TimeoutOutOfRange {
                section: "session",
                field: "replyTimeoutMs",
                value_ms: self.reply_timeout_ms,
                min_ms: REPLY_TIMEOUT_MIN_MS,
                max_ms: REPLY_TIMEOUT_MAX_MS,
            });
        }
        if !(MAX_CONCURRENT_DOWNLOADS_MIN..=MAX_CONCURRENT_DOWNLOADS_MAX)
            .contains(&self.max_concurrent_downloads)
        {
            return Err(ConfigSchemaError::LimitOutOfRange {
                section: "session",
                field: "maxConcurrentDownloads",
                value: u64::from(self.max_concurrent_downloads),
                min: u64::from(MAX_CONCURRENT_DOWNLOADS_MIN),
                max: u64::from(MAX_CONCURRENT_DOWNLOADS_MAX),
            });
        }
        Ok(())
    }
}

/// Metrics recorder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct TelemetryConfig {
    /// Start with a live recorder. When false, the null recorder is used until
    /// a sink is installed.
    pub enabled: bool,
    /// Report a zero failure count for successful document renders.
    pub report_zero_render_failures: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            report_zero_render_failures: true,
        }
    }
}

/// Minimum level emitted by the JSON logger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevelSetting {
    /// Everything.
    Debug,
    /// Info and above.
    #[default]
    Info,
    /// Warnings and errors.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevelSetting {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Parse a case-insensitive level name.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevelSetting {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Structured logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// Minimum level.
    pub level: LogLevelSetting,
}

/// Parse a client config from a JSON string and validate it.
pub fn parse_client_config_json(input: &str) -> Result<ValidatedClientConfig, ErrorEnvelope> {
    let config: ClientConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate().map_err(Into::into)
}

/// Parse a client config from a TOML string and validate it.
pub fn parse_client_config_toml(input: &str) -> Result<ValidatedClientConfig, ErrorEnvelope> {
    let config: ClientConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate().map_err(Into::into)
}

/// Schema validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A timeout value is out of bounds.
    TimeoutOutOfRange {
        /// Schema section (e.g. `session`).
        section: &'static str,
        /// Field name in the config file (e.g. `replyTimeoutMs`).
        field: &'static str,
        /// Value provided (ms).
        value_ms: u64,
        /// Minimum allowed value (ms).
        min_ms: u64,
        /// Maximum allowed value (ms).
        max_ms: u64,
    },
    /// A numeric limit is out of bounds.
    LimitOutOfRange {
        /// Schema section.
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Value provided.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::TimeoutOutOfRange { .. } => ErrorCode::new("config", "invalid_timeout"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "invalid_limit"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => write!(
                formatter,
                "unsupported config version: {found} (supported: {supported})"
            ),
            Self::TimeoutOutOfRange {
                section,
                field,
                value_ms,
                min_ms,
                max_ms,
            } => write!(
                formatter,
                "{section}.{field} must be within [{min_ms}, {max_ms}] ms (got {value_ms})"
            ),
            Self::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => write!(
                formatter,
                "{section}.{field} must be within [{min}, {max}] (got {value})"
            ),
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => envelope
                .with_metadata("found", found.to_string())
                .with_metadata("supported", supported.to_string()),
            ConfigSchemaError::TimeoutOutOfRange {
                section,
                field,
                value_ms,
                ..
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("value_ms", value_ms.to_string()),
            ConfigSchemaError::LimitOutOfRange {
                section,
                field,
                value,
                ..
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("value", value.to_string()),
        }
    }
}
