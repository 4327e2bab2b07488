//! Config loading helpers (env + file).
//!
//! The loader owns the merge order and surfaces user-facing errors as typed
//! `ErrorEnvelope`s.

use crate::{ClientConfig, ClientEnv, ValidatedClientConfig, apply_env_overrides};
use apl_client_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load the client config from in-memory JSON.
///
/// Precedence (highest wins):
/// - env overrides (`ClientEnv`)
/// - config JSON
/// - defaults (`ClientConfig::default()`)
pub fn load_client_config_from_sources(
    config_json: Option<&str>,
    env: &ClientEnv,
) -> Result<ValidatedClientConfig, ErrorEnvelope> {
    let config = match config_json {
        None => ClientConfig::default(),
        Some(input) => parse_config_unvalidated(input, ConfigFormat::Json)?,
    };

    // env is applied last and also validates the resulting config.
    apply_env_overrides(config, env)
}

/// Load the client config from an optional file path (`.json` or `.toml`).
pub fn load_client_config_from_path(
    config_path: Option<&Path>,
    env: &ClientEnv,
) -> Result<ValidatedClientConfig, ErrorEnvelope> {
    let config = match config_path {
        None => ClientConfig::default(),
        Some(path) => {
            let format = detect_config_format(path)?;
            let config_text = read_config_file(path)?;
            parse_config_unvalidated(&config_text, format)?
        },
    };

    apply_env_overrides(config, env)
}

/// Load the client config from the process environment and an optional file.
pub fn load_client_config_std_env(
    config_path: Option<&Path>,
) -> Result<ValidatedClientConfig, ErrorEnvelope> {
    let env = ClientEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_client_config_from_path(config_path, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &ClientConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<ClientConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogLevelSetting;

    #[test]
    fn env_wins_over_file_values() -> Result<(), Box<dyn std::error::Error>> {
        let config_json = r#"{
          "version": 1,
          "session": { "replyTimeoutMs": 4000 },
          "logging": { "level": "warn" }
        }"#;
        let env = ClientEnv {
            reply_timeout_ms: Some(9000),
            ..ClientEnv::default()
        };

        let config = load_client_config_from_sources(Some(config_json), &env)?;
        assert_eq!(config.session.reply_timeout_ms, 9000);
        assert_eq!(config.logging.level, LogLevelSetting::Warn);
        Ok(())
    }

    #[test]
    fn invalid_file_value_rescued_by_env() -> Result<(), Box<dyn std::error::Error>> {
        let config_json = r#"{ "version": 1, "session": { "maxConcurrentDownloads": 0 } }"#;
        let env = ClientEnv {
            max_concurrent_downloads: Some(3),
            ..ClientEnv::default()
        };

        let config = load_client_config_from_sources(Some(config_json), &env)?;
        assert_eq!(config.session.max_concurrent_downloads, 3);
        Ok(())
    }

    #[test]
    fn invalid_env_value_fails_validation() -> Result<(), Box<dyn std::error::Error>> {
        let env = ClientEnv {
            reply_timeout_ms: Some(1),
            ..ClientEnv::default()
        };

        let error = load_client_config_from_sources(None, &env)
            .err()
            .ok_or_else(|| std::io::Error::other("expected validation error"))?;
        assert_eq!(error.code, ErrorCode::new("config", "invalid_timeout"));
        Ok(())
    }

    #[test]
    fn unsupported_extension_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let error = load_client_config_from_path(
            Some(Path::new("client.yaml")),
            &ClientEnv::default(),
        )
        .err()
        .ok_or_else(|| std::io::Error::other("expected format error"))?;
        assert_eq!(error.code, ErrorCode::new("config", "unsupported_format"));
        assert_eq!(
            error.metadata.get("extension").map(String::as_str),
            Some("yaml")
        );
        Ok(())
    }

    #[test]
    fn serialization_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let config = load_client_config_from_sources(None, &ClientEnv::default())?;
        let first = to_pretty_json(&config)?;
        let second = to_pretty_json(&config)?;
        assert_eq!(first, second);
        assert!(first.contains("\"replyTimeoutMs\": 2000"));
        Ok(())
    }
}
