//! Core configuration types and loading.

use super::defaults::{
    default_database_path, default_leave_phrase, default_metrics_port, default_server_name,
};
use crate::engine::{EnginePolicy, ReentryPolicy, RerollPolicy};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub giveaway: GiveawayConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Process identity and observability.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name used in logs.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Prometheus metrics HTTP port (0 disables the endpoint).
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            metrics_port: default_metrics_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Give-away behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct GiveawayConfig {
    /// Roles that may remove participants and reroll, besides administrators.
    #[serde(default)]
    pub allowed_roles: Vec<String>,
    /// Phrase a member types to confirm leaving.
    #[serde(default = "default_leave_phrase")]
    pub leave_phrase: String,
    #[serde(default)]
    pub reentry_policy: ReentryPolicy,
    #[serde(default)]
    pub reroll_policy: RerollPolicy,
}

impl Default for GiveawayConfig {
    fn default() -> Self {
        Self {
            allowed_roles: Vec::new(),
            leave_phrase: default_leave_phrase(),
            reentry_policy: ReentryPolicy::default(),
            reroll_policy: RerollPolicy::default(),
        }
    }
}

impl GiveawayConfig {
    pub fn policy(&self) -> EnginePolicy {
        EnginePolicy {
            allowed_roles: self.allowed_roles.clone(),
            leave_phrase: self.leave_phrase.clone(),
            reentry: self.reentry_policy,
            reroll: self.reroll_policy,
        }
    }
}
