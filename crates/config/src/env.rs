//! Environment variable parsing and env-to-config merging.
//!
//! Parsing is strict: a variable that is present but empty or unparsable
//! fails the load instead of being ignored.

use crate::schema::{ClientConfig, LogLevelSetting, ValidatedClientConfig};
use apl_client_shared::{ErrorCode, ErrorEnvelope, redact_if_secret};
use std::collections::BTreeMap;
use std::fmt;

/// Env var: default reply timeout in milliseconds.
pub const ENV_REPLY_TIMEOUT_MS: &str = "APL_CLIENT_REPLY_TIMEOUT_MS";
/// Env var: max concurrent content downloads.
pub const ENV_MAX_CONCURRENT_DOWNLOADS: &str = "APL_CLIENT_MAX_CONCURRENT_DOWNLOADS";
/// Env var: start with a live recorder.
pub const ENV_TELEMETRY_ENABLED: &str = "APL_CLIENT_TELEMETRY_ENABLED";
/// Env var: minimum log level.
pub const ENV_LOG_LEVEL: &str = "APL_CLIENT_LOG_LEVEL";

const ALL_VARS: [&str; 4] = [
    ENV_REPLY_TIMEOUT_MS,
    ENV_MAX_CONCURRENT_DOWNLOADS,
    ENV_TELEMETRY_ENABLED,
    ENV_LOG_LEVEL,
];

/// Parsed env overrides. `None` means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientEnv {
    /// Override for `session.replyTimeoutMs`.
    pub reply_timeout_ms: Option<u64>,
    /// Override for `session.maxConcurrentDownloads`.
    pub max_concurrent_downloads: Option<u32>,
    /// Override for `telemetry.enabled`.
    pub telemetry_enabled: Option<bool>,
    /// Override for `logging.level`.
    pub log_level: Option<LogLevelSetting>,
}

impl ClientEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            reply_timeout_ms: parse_optional_u64(map, ENV_REPLY_TIMEOUT_MS)?,
            max_concurrent_downloads: parse_optional_u32(map, ENV_MAX_CONCURRENT_DOWNLOADS)?,
            telemetry_enabled: parse_optional_bool(map, ENV_TELEMETRY_ENABLED)?,
            log_level: parse_optional_level(map, ENV_LOG_LEVEL)?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let map = ALL_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|value| ((*name).to_owned(), value)))
            .collect();
        Self::from_map(&map)
    }
}

/// Apply env overrides to a base config (env wins over file/default values),
/// then validate.
pub fn apply_env_overrides(
    base: ClientConfig,
    env: &ClientEnv,
) -> Result<ValidatedClientConfig, ErrorEnvelope> {
    let mut config = base;
    if let Some(value) = env.reply_timeout_ms {
        config.session.reply_timeout_ms = value;
    }
    if let Some(value) = env.max_concurrent_downloads {
        config.session.max_concurrent_downloads = value;
    }
    if let Some(value) = env.telemetry_enabled {
        config.telemetry.enabled = value;
    }
    if let Some(value) = env.log_level {
        config.logging.level = value;
    }

    config.validate().map_err(Into::into)
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// Boolean env var had an invalid value.
    InvalidBool {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Enum env var had an invalid value.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_env_var"),
            Self::InvalidBool { .. } => ErrorCode::new("config", "invalid_env_bool"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "invalid_env_enum"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } => write!(formatter, "{var} must be non-empty"),
            Self::InvalidBool { var, .. } => write!(formatter, "{var} must be a boolean"),
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            EnvParseError::EmptyValue { var } => envelope.with_metadata("env_var", var),
            EnvParseError::InvalidBool { var, value }
            | EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidEnum { var, value } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", redact_if_secret(var, &value)),
        }
    }
}

fn present_trimmed<'a>(
    map: &'a BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<&'a str>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }
    Ok(Some(trimmed))
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    present_trimmed(map, var)?
        .map(|value| {
            value.parse::<u64>().map_err(|_| EnvParseError::InvalidInt {
                var,
                value: value.to_owned(),
            })
        })
        .transpose()
}

fn parse_optional_u32(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u32>, EnvParseError> {
    present_trimmed(map, var)?
        .map(|value| {
            value.parse::<u32>().map_err(|_| EnvParseError::InvalidInt {
                var,
                value: value.to_owned(),
            })
        })
        .transpose()
}

fn parse_optional_bool(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<bool>, EnvParseError> {
    present_trimmed(map, var)?
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(EnvParseError::InvalidBool {
                var,
                value: value.to_owned(),
            }),
        })
        .transpose()
}

fn parse_optional_level(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<LogLevelSetting>, EnvParseError> {
    present_trimmed(map, var)?
        .map(|value| {
            LogLevelSetting::parse(value).ok_or_else(|| EnvParseError::InvalidEnum {
                var,
                value: value.to_owned(),
            })
        })
        .transpose()
}
