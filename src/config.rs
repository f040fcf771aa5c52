//! Configuration handling for the broker

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable overriding the host command
pub const HOST_COMMAND_ENV: &str = "FORM_BROKER_HOST";

/// Default log filter when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "form_broker=info";

/// User configuration for the broker
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrokerConfig {
    /// Log filter directive, e.g. `form_broker=debug`
    pub log_filter: Option<String>,
    /// Cancel forms sent to a user who already has one open
    pub reject_busy_targets: Option<bool>,
    /// Program that renders forms
    pub host_command: Option<String>,
    /// Arguments passed to the host program
    pub host_args: Option<Vec<String>>,
}

impl BrokerConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "form-broker", "form-broker")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if let Some(path) = path {
            if path.exists() {
                let content = fs::read_to_string(&path)?;
                let config: BrokerConfig = serde_json::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Self::default())
    }

    pub fn reject_busy_targets(&self) -> bool {
        self.reject_busy_targets.unwrap_or(true)
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Host program: environment first, then the config file
    pub fn host_command(&self) -> Option<String> {
        std::env::var(HOST_COMMAND_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.host_command.clone())
    }

    pub fn host_args(&self) -> &[String] {
        self.host_args.as_deref().unwrap_or_default()
    }
}
