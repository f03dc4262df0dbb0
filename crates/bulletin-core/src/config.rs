//! Configuration management for bulletin.
//!
//! Loads configuration from ${BULLETIN_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::Credentials;

/// Environment variable overriding the service base URL.
pub const BASE_URL_ENV: &str = "BULLETIN_BASE_URL";

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for bulletin configuration.
    //!
    //! BULLETIN_HOME resolution order:
    //! 1. BULLETIN_HOME environment variable (if set)
    //! 2. ~/.config/bulletin (default)

    use std::path::PathBuf;

    /// Returns the bulletin home directory.
    pub fn bulletin_home() -> PathBuf {
        if let Ok(home) = std::env::var("BULLETIN_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map_or_else(|| PathBuf::from(".bulletin"), |h| h.join(".config").join("bulletin"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        bulletin_home().join("config.toml")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the newsletter service
    pub base_url: String,

    /// Login sent to `POST /auth`
    pub username: String,
    pub password: String,

    /// Path of the server-sent event stream
    pub events_path: String,

    /// Fixed delay before reconnecting the live stream
    pub reconnect_delay_ms: u64,

    /// Connect timeout for HTTP requests in seconds (0 disables)
    pub connect_timeout_secs: u64,

    /// Log filter used when BULLETIN_LOG is unset
    pub log_level: String,

    /// Optional file that receives a copy of the logs
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            username: Self::DEFAULT_USERNAME.to_string(),
            password: Self::DEFAULT_PASSWORD.to_string(),
            events_path: Self::DEFAULT_EVENTS_PATH.to_string(),
            reconnect_delay_ms: Self::DEFAULT_RECONNECT_DELAY_MS,
            connect_timeout_secs: 0,
            log_level: Self::DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,
        }
    }
}

impl Config {
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
    const DEFAULT_USERNAME: &str = "demo";
    const DEFAULT_PASSWORD: &str = "demo";
    const DEFAULT_EVENTS_PATH: &str = "/newsletter/events";
    const DEFAULT_RECONNECT_DELAY_MS: u64 = 5000;
    const DEFAULT_LOG_LEVEL: &str = "warn";

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the base URL with precedence: env > override > config.
    ///
    /// # Errors
    /// Returns an error if the winning value is not a valid URL.
    pub fn resolve_base_url(&self, cli_override: Option<&str>) -> Result<String> {
        let env_value = std::env::var(BASE_URL_ENV).ok();
        let candidates = [env_value.as_deref(), cli_override, Some(self.base_url.as_str())];

        let chosen = candidates
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .unwrap_or(Self::DEFAULT_BASE_URL);

        url::Url::parse(chosen).with_context(|| format!("Invalid base URL: {chosen}"))?;
        Ok(chosen.trim_end_matches('/').to_string())
    }

    /// Full URL of the event stream under `base_url`.
    pub fn events_url(&self, base_url: &str) -> String {
        let path = self.events_path.trim();
        if path.starts_with('/') {
            format!("{base_url}{path}")
        } else {
            format!("{base_url}/{path}")
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        if self.connect_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.connect_timeout_secs))
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to move config into place at {}", path.display()))?;
        Ok(())
    }

    /// Saves only the base URL, keeping the rest of the file and its comments.
    ///
    /// # Errors
    /// Returns an error if the existing file cannot be read or parsed.
    pub fn save_base_url_to(path: &Path, base_url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let contents = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        doc["base_url"] = value(base_url);

        Self::write_config(path, &doc.to_string())
    }
}
