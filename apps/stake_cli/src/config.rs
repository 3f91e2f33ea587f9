use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use shared::domain::PoolId;
use stake_core::{
    config::{DEFAULT_POOL_ID, DEFAULT_STATUS_MAX_AGE},
    BlockfrostProvider, HttpTransactionBuilder, SessionConfig,
};

pub const DEFAULT_CONFIG_PATH: &str = "stake.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub blockfrost_project_id: Option<String>,
    /// Overrides the network inferred from the project id.
    pub blockfrost_url: Option<String>,
    pub builder_url: Option<String>,
    pub pool_id: String,
    pub status_max_age_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            blockfrost_project_id: None,
            blockfrost_url: None,
            builder_url: None,
            pool_id: DEFAULT_POOL_ID.into(),
            status_max_age_seconds: DEFAULT_STATUS_MAX_AGE.as_secs(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    blockfrost_project_id: Option<String>,
    blockfrost_url: Option<String>,
    builder_url: Option<String>,
    pool_id: Option<String>,
    status_max_age_seconds: Option<u64>,
}

impl Settings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            status_max_age: Duration::from_secs(self.status_max_age_seconds),
            default_pool_id: PoolId::new(self.pool_id.clone()),
        }
    }

    pub fn chain_provider(&self) -> Result<BlockfrostProvider> {
        let project_id = self
            .blockfrost_project_id
            .clone()
            .ok_or_else(|| anyhow!("BLOCKFROST_PROJECT_ID is not set"))?;
        match &self.blockfrost_url {
            Some(url) => BlockfrostProvider::with_base_url(project_id, url),
            None => BlockfrostProvider::new(project_id),
        }
    }

    pub fn transaction_builder(&self) -> Result<HttpTransactionBuilder> {
        let url = self
            .builder_url
            .as_deref()
            .ok_or_else(|| anyhow!("APP__BUILDER_URL is not set"))?;
        HttpTransactionBuilder::new(url)
    }
}

pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

pub fn load_settings_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let mut settings = Settings::default();

    let file_cfg = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            parse_file(&raw, path)?
        }
        None => match fs::read_to_string(DEFAULT_CONFIG_PATH) {
            Ok(raw) => parse_file(&raw, Path::new(DEFAULT_CONFIG_PATH))?,
            Err(_) => FileSettings::default(),
        },
    };

    if let Some(v) = file_cfg.blockfrost_project_id {
        settings.blockfrost_project_id = Some(v);
    }
    if let Some(v) = file_cfg.blockfrost_url {
        settings.blockfrost_url = Some(v);
    }
    if let Some(v) = file_cfg.builder_url {
        settings.builder_url = Some(v);
    }
    if let Some(v) = file_cfg.pool_id {
        settings.pool_id = v;
    }
    if let Some(v) = file_cfg.status_max_age_seconds {
        settings.status_max_age_seconds = v;
    }

    if let Some(v) = env("BLOCKFROST_PROJECT_ID") {
        settings.blockfrost_project_id = Some(v);
    }
    if let Some(v) = env("APP__BLOCKFROST_PROJECT_ID") {
        settings.blockfrost_project_id = Some(v);
    }

    if let Some(v) = env("BLOCKFROST_URL") {
        settings.blockfrost_url = Some(v);
    }
    if let Some(v) = env("APP__BLOCKFROST_URL") {
        settings.blockfrost_url = Some(v);
    }

    if let Some(v) = env("APP__BUILDER_URL") {
        settings.builder_url = Some(v);
    }

    if let Some(v) = env("APP__POOL_ID") {
        settings.pool_id = v;
    }

    if let Some(v) = env("APP__STATUS_MAX_AGE_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.status_max_age_seconds = parsed;
        }
    }

    Ok(settings)
}

fn parse_file(raw: &str, path: &Path) -> Result<FileSettings> {
    toml::from_str(raw).with_context(|| format!("invalid config file '{}'", path.display()))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
