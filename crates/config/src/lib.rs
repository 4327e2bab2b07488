//! # apl-client-config
//!
//! Client configuration schema, validation and loading.
//! This crate depends on `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file).
pub mod load;
/// Configuration schema types and validation.
pub mod schema;

pub use env::{
    ClientEnv, ENV_LOG_LEVEL, ENV_MAX_CONCURRENT_DOWNLOADS, ENV_REPLY_TIMEOUT_MS,
    ENV_TELEMETRY_ENABLED, EnvParseError, apply_env_overrides,
};
pub use load::{
    load_client_config_from_path, load_client_config_from_sources, load_client_config_std_env,
    to_pretty_json,
};
pub use schema::{
    CURRENT_CONFIG_VERSION, ClientConfig, ConfigSchemaError, LogLevelSetting, LoggingConfig,
    SessionConfig, TelemetryConfig, ValidatedClientConfig, parse_client_config_json,
    parse_client_config_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
