// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Process configuration.
//!
//! Built exactly once at startup and passed by reference into every
//! component constructor. Resolution order: compiled defaults, then an
//! optional JSON file, then `HIVE_*` environment variables (environment
//! wins).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {value}")]
    Env { var: String, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

/// Retry policy knobs consumed by the action handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(with = "humantime_serde", default = "default_base_delay")]
    pub base_delay: Duration,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_millis(500)
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: default_max_retries(), base_delay: default_base_delay() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiveConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Directory holding `agents/<id>.json` configurations.
    #[serde(default = "default_agents_dir")]
    pub agents_dir: PathBuf,

    /// Locations scanned for plugin manifests at startup.
    #[serde(default)]
    pub plugin_dirs: Vec<PathBuf>,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Bounded per-agent mailbox capacity; oldest messages are dropped on
    /// overflow.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    /// Grace period `stop()` waits for agents to exit before reporting
    /// them as failed to stop.
    #[serde(with = "humantime_serde", default = "default_stop_timeout")]
    pub stop_timeout: Duration,
}

fn default_agents_dir() -> PathBuf {
    PathBuf::from("agents")
}

fn default_mailbox_capacity() -> usize {
    256
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            agents_dir: default_agents_dir(),
            plugin_dirs: Vec::new(),
            retry: RetryConfig::default(),
            mailbox_capacity: default_mailbox_capacity(),
            stop_timeout: default_stop_timeout(),
        }
    }
}

impl HiveConfig {
    /// Resolve the effective configuration: defaults, then `path` (if
    /// given), then environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("HIVE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("HIVE_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Env { var: "HIVE_PORT".into(), value: port.clone() })?;
        }
        if let Ok(dir) = std::env::var("HIVE_AGENTS_DIR") {
            self.agents_dir = PathBuf::from(dir);
        }
        if let Ok(dirs) = std::env::var("HIVE_PLUGIN_DIRS") {
            self.plugin_dirs = std::env::split_paths(&dirs).collect();
        }
        if let Ok(cap) = std::env::var("HIVE_MAILBOX_CAPACITY") {
            self.mailbox_capacity = cap.parse().map_err(|_| ConfigError::Env {
                var: "HIVE_MAILBOX_CAPACITY".into(),
                value: cap.clone(),
            })?;
        }
        Ok(())
    }
}
