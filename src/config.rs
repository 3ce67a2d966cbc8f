//! Configuration file handling.
//!
//! This module provides loading and saving of the client configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/osv-client/config.toml`
//! - macOS: `~/Library/Application Support/osv-client/config.toml`
//! - Windows: `%APPDATA%\osv-client\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! server = "staging"
//! max_requests = 50
//! max_requests_per_host = 50
//! timeout_secs = 10
//!
//! # Overrides `server` when set
//! url = "http://localhost:8080"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::Server;
use crate::transport::{default_user_agent, TransportConfig, DEFAULT_MAX_REQUESTS};

/// Client configuration.
///
/// Selects the API endpoint and tunes the transport. It can be loaded from a
/// TOML file or created with default values.
///
/// # Example
///
/// ```no_run
/// use osv_client::Config;
///
/// // Load from file (or use defaults if file doesn't exist)
/// let config = Config::load().unwrap();
///
/// println!("Server: {}", config.base_url());
/// println!("Max requests: {}", config.max_requests);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which well-known deployment to talk to.
    ///
    /// Default: production
    pub server: Server,

    /// Base URL overriding `server`, e.g. a mirror or a local fixture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Maximum simultaneous requests across all hosts.
    ///
    /// Default: 100
    pub max_requests: usize,

    /// Maximum simultaneous requests to a single host.
    ///
    /// Default: 100
    pub max_requests_per_host: usize,

    /// Timeout for a whole request/response exchange, in seconds.
    ///
    /// Default: 30
    pub timeout_secs: u64,

    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: Server::Production,
            url: None,
            max_requests: DEFAULT_MAX_REQUESTS,
            max_requests_per_host: DEFAULT_MAX_REQUESTS,
            timeout_secs: 30,
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    ///
    /// # Example
    ///
    /// ```
    /// use osv_client::Config;
    ///
    /// let path = Config::config_path();
    /// println!("Config file: {}", path.display());
    /// ```
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("osv-client")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// The base URL requests go to: `url` if set, else the `server` URL.
    pub fn base_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| self.server.url().to_string())
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            max_requests: self.max_requests,
            max_requests_per_host: self.max_requests_per_host,
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}
