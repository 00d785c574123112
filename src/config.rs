// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Settings are layered: built-in defaults, then the TOML config file, then
//! `REPOVIZ_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Backend address used when nothing else is configured
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Keys accepted by `repoviz config`
pub const KEYS: &[&str] = &[
    "backend_url",
    "poll_interval_secs",
    "request_timeout_secs",
    "session_dir",
];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base address of the diagram backend
    pub backend_url: String,
    /// Seconds between processing status polls
    pub poll_interval_secs: u64,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Directory holding the session store and the TUI log
    pub session_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval_secs: 3,
            request_timeout_secs: 30,
            session_dir: directories::ProjectDirs::from("com", "hyperpolymath", "repoviz")
                .map(|d| d.cache_dir().to_path_buf())
                .unwrap_or_else(|| std::env::temp_dir().join("repoviz")),
        }
    }
}

impl Settings {
    /// Interval between status polls, never shorter than one second
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Timeout applied to every backend request
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Read a setting by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "backend_url" => Some(self.backend_url.clone()),
            "poll_interval_secs" => Some(self.poll_interval_secs.to_string()),
            "request_timeout_secs" => Some(self.request_timeout_secs.to_string()),
            "session_dir" => Some(self.session_dir.display().to_string()),
            _ => None,
        }
    }

    /// Update a setting by key, validating the value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "backend_url" => {
                reqwest::Url::parse(value)
                    .with_context(|| format!("Invalid backend URL: {value}"))?;
                self.backend_url = value.to_string();
            }
            "poll_interval_secs" => {
                self.poll_interval_secs = value
                    .parse()
                    .with_context(|| format!("Invalid number of seconds: {value}"))?;
            }
            "request_timeout_secs" => {
                self.request_timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid number of seconds: {value}"))?;
            }
            "session_dir" => self.session_dir = PathBuf::from(value),
            other => anyhow::bail!("Unknown config key: {}. Valid: {}", other, KEYS.join(", ")),
        }
        Ok(())
    }
}

/// Default location of the config file
#[must_use]
pub fn default_path() -> PathBuf {
    directories::ProjectDirs::from("com", "hyperpolymath", "repoviz")
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("repoviz.toml"))
}

/// Load configuration from defaults, the config file and the environment
pub fn load(path: &Path) -> Result<Settings> {
    let defaults =
        config::Config::try_from(&Settings::default()).context("Failed to build defaults")?;

    config::Config::builder()
        .add_source(defaults)
        .add_source(config::File::from(path).format(config::FileFormat::Toml).required(false))
        .add_source(config::Environment::with_prefix("REPOVIZ").try_parsing(true))
        .build()
        .with_context(|| format!("Failed to read configuration from {}", path.display()))?
        .try_deserialize()
        .context("Failed to parse configuration")
}

/// Load only what the config file says, ignoring the environment
pub fn load_file(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write settings to the config file
pub fn save(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(settings).context("Failed to serialize configuration")?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
