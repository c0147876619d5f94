//! Bridge configuration
//!
//! Loaded from a YAML file with the same keys as the plugin's `config.yml`,
//! then overridden by command-line flags.

use serde::Deserialize;
use shopbridge_shared::defaults;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Remote store connection settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL, e.g. https://project.supabase.co
    pub url: String,
    /// Key sent as `apikey` and as the bearer credential
    pub api_key: String,
}

/// Poll timer settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_seconds: u64,
    pub initial_delay_seconds: u64,
    /// Optional page size appended as `limit=N`
    pub fetch_limit: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_seconds: defaults::POLL_INTERVAL_SECS,
            initial_delay_seconds: 0,
            fetch_limit: None,
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: defaults::HTTP_TIMEOUT_SECS,
        }
    }
}

/// Game host (RCON) settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub rcon_address: String,
    pub rcon_password: String,
    pub connect_timeout_seconds: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            rcon_address: defaults::RCON_ADDRESS.into(),
            rcon_password: String::new(),
            connect_timeout_seconds: defaults::HOST_CONNECT_TIMEOUT_SECS,
        }
    }
}

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub store: StoreConfig,
    pub poll: PollConfig,
    pub http: HttpConfig,
    pub host: HostConfig,
}

impl BridgeConfig {
    /// Parse configuration from YAML text
    pub fn from_yaml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from a file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text, path)
    }

    /// Check that the bridge can run with these settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.store.url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid("store.url is required".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "store.url must be an http(s) URL, got {url}"
            )));
        }
        if self.store.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid("store.api_key is required".into()));
        }
        if self.poll.interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "poll.interval_seconds must be greater than zero".into(),
            ));
        }
        if self.poll.fetch_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "poll.fetch_limit must be greater than zero when set".into(),
            ));
        }
        if self.http.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout_seconds must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Whether the poll interval lies in the recommended range
    pub fn interval_in_recommended_range(&self) -> bool {
        (defaults::POLL_INTERVAL_MIN_RECOMMENDED_SECS..=defaults::POLL_INTERVAL_MAX_RECOMMENDED_SECS)
            .contains(&self.poll.interval_seconds)
    }

    /// Store base URL without a trailing slash
    pub fn store_base_url(&self) -> &str {
        self.store.url.trim().trim_end_matches('/')
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_seconds)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.poll.initial_delay_seconds)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    pub fn host_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.host.connect_timeout_seconds)
    }
}
