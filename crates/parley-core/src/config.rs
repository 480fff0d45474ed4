//! Chat configuration.
//!
//! Supports reading settings from `~/.config/parley/config.toml`, with
//! environment variables layered on top.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ParleyError, Result};
use crate::transport::DEFAULT_WAIT_FOR_DATA_SECS;

pub const DEFAULT_SERVER: &str = "http://localhost:8800";

/// Settings for one chat instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the messaging backend.
    #[serde(default = "default_server")]
    pub server: String,
    /// Existing session to attach to.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Agent to create a session with when `session_id` is absent.
    #[serde(default)]
    pub agent_id: Option<String>,
    /// Overrides the name fetched from the backend.
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Greeting shown while the conversation is empty.
    #[serde(default)]
    pub agent_opening_message: Option<String>,
    #[serde(default)]
    pub session_title: Option<String>,
    #[serde(default)]
    pub polling: PollingSettings,
}

/// Timing of the poll loop and its requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Server-side long-poll wait.
    pub wait_for_data_secs: u64,
    /// Extra client-side slack on top of `wait_for_data_secs`.
    pub poll_grace_secs: u64,
    /// Pause after a poll returned no events.
    pub idle_delay_ms: u64,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    /// Timeout for every non-polling request.
    pub request_timeout_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            wait_for_data_secs: DEFAULT_WAIT_FOR_DATA_SECS,
            poll_grace_secs: 10,
            idle_delay_ms: 250,
            backoff_initial_ms: 500,
            backoff_max_ms: 30_000,
            request_timeout_secs: 30,
        }
    }
}

impl PollingSettings {
    /// Client-side timeout for one long poll.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_for_data_secs + self.poll_grace_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            session_id: None,
            agent_id: None,
            agent_name: None,
            customer_id: None,
            agent_opening_message: None,
            session_title: None,
            polling: PollingSettings::default(),
        }
    }
}

impl ChatConfig {
    /// Loads the config file at `path`. A missing file yields the defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("[ChatConfig] No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ParleyError::config(format!(
                "Failed to read configuration file at {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)?;
        tracing::debug!("[ChatConfig] Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `~/.config/parley/config.toml` and applies environment overrides.
    pub fn load_default() -> Result<Self> {
        let mut config = Self::from_path(&default_config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    /// Applies `PARLEY_*` environment variables on top of the current values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(server) = non_empty("PARLEY_SERVER") {
            self.server = server;
        }
        if let Some(session_id) = non_empty("PARLEY_SESSION_ID") {
            self.session_id = Some(session_id);
        }
        if let Some(agent_id) = non_empty("PARLEY_AGENT_ID") {
            self.agent_id = Some(agent_id);
        }
        if let Some(agent_name) = non_empty("PARLEY_AGENT_NAME") {
            self.agent_name = Some(agent_name);
        }
        if let Some(customer_id) = non_empty("PARLEY_CUSTOMER_ID") {
            self.customer_id = Some(customer_id);
        }
    }

    /// Checks that the chat can run at all.
    ///
    /// Without a session id the chat needs an agent id to create one; with
    /// neither, nothing can be polled or submitted.
    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(ParleyError::config("server URL must not be empty"));
        }
        if self.session_id.is_none() && self.agent_id.is_none() {
            return Err(ParleyError::config("Either session_id or agent_id is required"));
        }
        if self.polling.backoff_initial_ms == 0 || self.polling.backoff_max_ms < self.polling.backoff_initial_ms {
            return Err(ParleyError::config(
                "backoff_initial_ms must be positive and not exceed backoff_max_ms",
            ));
        }
        Ok(())
    }

    pub fn server_url(&self) -> &str {
        self.server.trim_end_matches('/')
    }
}

/// Returns the path to the configuration file: ~/.config/parley/config.toml
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| ParleyError::config("Could not determine home directory"))?;
    Ok(home.join(".config").join("parley").join("config.toml"))
}
