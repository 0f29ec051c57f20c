use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Environment override for `api.base_url`.
pub const API_URL_ENV: &str = "MEETSCRIBE_API_URL";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub meetings: MeetingsConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the meeting backend (the `/api/...` routes hang off it).
    pub base_url: String,
    /// Seconds between two status polls while a session is active.
    pub poll_interval_seconds: u64,
    /// Per-request timeout. Unset means the transport default (no timeout).
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingsConfig {
    /// Meeting platforms the bot knows how to join.
    pub allowed_hosts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of recently used meetings kept.
    pub limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            poll_interval_seconds: 10,
            request_timeout_seconds: None,
        }
    }
}

impl Default for MeetingsConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: crate::meeting::DEFAULT_ALLOWED_HOSTS
                .iter()
                .map(|host| host.to_string())
                .collect(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: crate::history::DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl ApiConfig {
    pub fn poll_interval(&self) -> Duration {
        // A zero interval would turn the poller into a busy loop.
        Duration::from_secs(self.poll_interval_seconds.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            config
        } else {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
            info!("Loaded config from {:?}", config_path);
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                info!("Using meeting backend from {}: {}", API_URL_ENV, url);
                self.api.base_url = url;
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
