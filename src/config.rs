//! Connection settings for the Guacamole server
//!
//! Settings come from `~/.config/guacform/config.toml` (or `--config`) and
//! can be overridden by environment variables:
//!
//! - `GUACFORM_URL` - web application root, e.g. `https://host/guacamole`
//! - `GUACFORM_DATA_SOURCE` - data source name (default `postgresql`)
//! - `GUACFORM_TOKEN` - API token
//! - `GUACFORM_DELAY_MS` - pause after every write call

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_URL: &str = "GUACFORM_URL";
pub const ENV_DATA_SOURCE: &str = "GUACFORM_DATA_SOURCE";
pub const ENV_TOKEN: &str = "GUACFORM_TOKEN";
pub const ENV_DELAY_MS: &str = "GUACFORM_DELAY_MS";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("guacform"))
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub url: String,
    pub data_source: String,
    pub token: String,
    pub delay_ms: u64,
    /// Accounts that are never modified or deleted
    pub protected_users: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: String::new(),
            data_source: "postgresql".to_string(),
            token: String::new(),
            delay_ms: 0,
            protected_users: vec!["guacadmin".to_string()],
        }
    }
}

impl Settings {
    /// Load settings and apply environment overrides
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let settings = match path {
            Some(path) => Self::from_file(&expand_path(path))?,
            None => {
                let default = config_dir()?.join("config.toml");
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    log::debug!("No config at {}, using defaults", default.display());
                    Self::default()
                }
            }
        };
        settings.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Apply overrides from `lookup`, normally the process environment
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(ENV_URL) {
            self.url = url;
        }
        if let Some(data_source) = lookup(ENV_DATA_SOURCE) {
            self.data_source = data_source;
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.token = token;
        }
        if let Some(delay) = lookup(ENV_DELAY_MS) {
            self.delay_ms = delay
                .trim()
                .parse()
                .with_context(|| format!("{ENV_DELAY_MS} must be a number of milliseconds"))?;
        }
        Ok(self)
    }

    /// Check that a server can be contacted with these settings
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("No Guacamole URL configured (set `url` in the config or {ENV_URL})");
        }
        if self.token.is_empty() {
            bail!("No API token configured (set `token` in the config or {ENV_TOKEN})");
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
