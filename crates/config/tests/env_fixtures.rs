//! Integration tests for env parsing and env-to-config merging.

use apl_client_config::{
    ClientConfig, ClientEnv, EnvParseError, LogLevelSetting, apply_env_overrides,
};
use apl_client_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

fn read_env_map(relative: &str) -> Result<BTreeMap<String, String>, Box<dyn Error>> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let path: PathBuf = manifest_dir
        .parent()
        .map_or_else(|| manifest_dir.to_path_buf(), Path::to_path_buf)
        .join("testkit")
        .join("fixtures")
        .join(relative);
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[test]
fn env_fixture_merges_into_effective_config() -> Result<(), Box<dyn Error>> {
    let env = ClientEnv::from_map(&read_env_map("env/client-env.valid.json")?)?;
    let config = apply_env_overrides(ClientConfig::default(), &env)?;

    assert_eq!(config.session.reply_timeout_ms, 500);
    assert_eq!(config.session.max_concurrent_downloads, 2);
    assert!(!config.telemetry.enabled);
    assert_eq!(config.logging.level, LogLevelSetting::Error);
    assert!(config.telemetry.report_zero_render_failures);
    Ok(())
}

#[test]
fn invalid_env_fixture_maps_to_envelope() -> Result<(), Box<dyn Error>> {
    let map = read_env_map("env/client-env.invalid.json")?;
    let error = ClientEnv::from_map(&map)
        .err()
        .ok_or_else(|| std::io::Error::other("expected env parse error"))?;
    assert!(matches!(error, EnvParseError::InvalidBool { .. }));

    let envelope = ErrorEnvelope::from(error);
    assert_eq!(envelope.code, ErrorCode::new("config", "invalid_env_bool"));
    assert_eq!(
        envelope.metadata.get("value").map(String::as_str),
        Some("sometimes")
    );
    Ok(())
}
