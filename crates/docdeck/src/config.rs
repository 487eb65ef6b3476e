//! Console configuration.
//!
//! Loaded from a JSON file; every field has a default so an empty object
//! `{}` is a valid config pointing at a local backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_backend_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_submit_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_poll_max_attempts() -> u32 {
    600
}

fn default_stall_threshold_secs() -> u64 {
    25
}

fn default_eviction_delay_secs() -> u64 {
    5
}

/// Configuration for the ingestion console core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the document-indexing backend.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// TCP connect timeout for all backend requests.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Request timeout for short calls (health, duplicate check, status).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Request timeout for the multipart upload. Uploads carry the whole
    /// PDF payload, so this is much longer than the default timeout.
    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,

    /// Interval between job status polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum number of status polls before a job is given up on.
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,

    /// Age after which a non-terminal task is flagged as stalled.
    #[serde(default = "default_stall_threshold_secs")]
    pub stall_threshold_secs: u64,

    /// How long finished batch entries stay visible before eviction.
    #[serde(default = "default_eviction_delay_secs")]
    pub eviction_delay_secs: u64,

    /// Path to the metadata database. Defaults to the platform data dir.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            submit_timeout_secs: default_submit_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_max_attempts: default_poll_max_attempts(),
            stall_threshold_secs: default_stall_threshold_secs(),
            eviction_delay_secs: default_eviction_delay_secs(),
            database_path: None,
        }
    }
}

impl Config {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stall_threshold(&self) -> Duration {
        Duration::from_secs(self.stall_threshold_secs)
    }

    pub fn eviction_delay(&self) -> Duration {
        Duration::from_secs(self.eviction_delay_secs)
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !config.backend_url.starts_with("http://") && !config.backend_url.starts_with("https://") {
        return Err(ConfigError::Validation {
            message: format!("backendUrl must be an http(s) URL: {}", config.backend_url),
        });
    }

    if config.poll_max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "pollMaxAttempts must be at least 1".to_string(),
        });
    }

    if config.submit_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "submitTimeoutSecs must be at least 1".to_string(),
        });
    }

    Ok(())
}
