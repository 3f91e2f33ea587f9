use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

use super::*;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

fn temp_config(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("stake_cli_config_test_{suffix}.toml"));
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn defaults_target_the_portal_pool() {
    let settings = load_settings_with(None, env_from(&[])).expect("settings");
    assert_eq!(settings, Settings::default());

    let session = settings.session_config();
    assert_eq!(session.default_pool_id, PoolId::new(DEFAULT_POOL_ID));
    assert_eq!(session.status_max_age, Duration::from_secs(600));
}

#[test]
fn file_values_are_overridden_by_environment() {
    let path = temp_config(
        r#"
blockfrost_project_id = "preprodFromFile"
builder_url = "http://127.0.0.1:9000"
pool_id = "pool1fromfile"
status_max_age_seconds = 30
"#,
    );

    let settings = load_settings_with(
        Some(&path),
        env_from(&[
            ("BLOCKFROST_PROJECT_ID", "previewPlain"),
            ("APP__BLOCKFROST_PROJECT_ID", "mainnetPrefixed"),
            ("APP__STATUS_MAX_AGE_SECONDS", "90"),
        ]),
    )
    .expect("settings");
    fs::remove_file(&path).expect("cleanup");

    assert_eq!(
        settings.blockfrost_project_id.as_deref(),
        Some("mainnetPrefixed")
    );
    assert_eq!(settings.builder_url.as_deref(), Some("http://127.0.0.1:9000"));
    assert_eq!(settings.pool_id, "pool1fromfile");
    assert_eq!(settings.status_max_age_seconds, 90);
}

#[test]
fn unparsable_max_age_keeps_previous_value() {
    let settings = load_settings_with(
        None,
        env_from(&[("APP__STATUS_MAX_AGE_SECONDS", "ten minutes")]),
    )
    .expect("settings");
    assert_eq!(
        settings.status_max_age_seconds,
        DEFAULT_STATUS_MAX_AGE.as_secs()
    );
}

#[test]
fn explicit_missing_file_is_an_error() {
    let path = env::temp_dir().join("stake_cli_config_test_missing.toml");
    assert!(load_settings_with(Some(&path), env_from(&[])).is_err());
}

#[test]
fn malformed_file_is_an_error() {
    let path = temp_config("status_max_age_seconds = \"soon\"");
    let result = load_settings_with(Some(&path), env_from(&[]));
    fs::remove_file(&path).expect("cleanup");
    assert!(result.is_err());
}

#[test]
fn chain_provider_requires_a_project_id() {
    let settings = Settings::default();
    assert!(settings.chain_provider().is_err());
    assert!(settings.transaction_builder().is_err());
}

#[test]
fn chain_provider_prefers_explicit_url() {
    let settings = Settings {
        blockfrost_project_id: Some("customKey".into()),
        blockfrost_url: Some("http://127.0.0.1:3100/api/v0/".into()),
        ..Settings::default()
    };
    let provider = settings.chain_provider().expect("provider");
    assert_eq!(provider.base_url(), "http://127.0.0.1:3100/api/v0");

    let inferred = Settings {
        blockfrost_project_id: Some("preprodKey".into()),
        ..Settings::default()
    };
    assert_eq!(
        inferred.chain_provider().expect("provider").base_url(),
        "https://cardano-preprod.blockfrost.io/api/v0"
    );
}
