// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime configuration.
//!
//! Supports both programmatic and file-based (JSON) configuration. The node
//! binary embeds this structure in its own TOML file.

use crate::transport::frame::DEFAULT_MAX_MESSAGE_SIZE;
use crate::transport::TcpOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime configuration for one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Local bind address. `None` runs every slot in this process.
    #[serde(default)]
    pub local_address: Option<String>,

    /// Idle sleep of the steady-state pump (microseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_us: u64,

    /// Bound on each blocking handshake receive (milliseconds, 0 = forever).
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_ms: u64,

    /// How long an outbound connection keeps retrying (milliseconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Largest accepted message (bytes).
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Deployment plan loaded before the run starts.
    #[serde(default)]
    pub plan_path: Option<PathBuf>,
}

fn default_poll_interval() -> u64 {
    100
}

fn default_handshake_timeout() -> u64 {
    30_000
}

fn default_connect_timeout() -> u64 {
    30_000
}

fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            local_address: None,
            poll_interval_us: default_poll_interval(),
            handshake_timeout_ms: default_handshake_timeout(),
            connect_timeout_ms: default_connect_timeout(),
            max_message_size: default_max_message_size(),
            plan_path: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_local_address(mut self, address: impl Into<String>) -> Self {
        self.local_address = Some(address.into());
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_plan_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan_path = Some(path.into());
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_us == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_us must be greater than zero".into(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(ConfigError::Invalid(
                "max_message_size must be greater than zero".into(),
            ));
        }
        if let Some(address) = &self.local_address {
            if address.trim().is_empty() {
                return Err(ConfigError::Invalid("local_address is empty".into()));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    /// `None` when handshake receives block forever.
    pub fn handshake_timeout(&self) -> Option<Duration> {
        (self.handshake_timeout_ms > 0).then(|| Duration::from_millis(self.handshake_timeout_ms))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// TCP transport options derived from this configuration.
    pub fn tcp_options(&self) -> TcpOptions {
        TcpOptions {
            connect_timeout: self.connect_timeout(),
            max_message_size: self.max_message_size,
            ..TcpOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert!(config.local_address.is_none());
        assert_eq!(config.poll_interval(), Duration::from_micros(100));
        assert_eq!(config.handshake_timeout(), Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_json() {
        let config = RuntimeConfig::from_json(
            r#"{"local_address":"tcp://127.0.0.1:6000","handshake_timeout_ms":0}"#,
        )
        .expect("parse");
        assert_eq!(config.local_address.as_deref(), Some("tcp://127.0.0.1:6000"));
        assert_eq!(config.handshake_timeout(), None);
        assert_eq!(config.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = RuntimeConfig {
            poll_interval_us: 0,
            ..RuntimeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = RuntimeConfig {
            max_message_size: 0,
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(RuntimeConfig::from_json(r#"{"local_address":"  "}"#).is_err());
    }

    #[test]
    fn test_tcp_options_follow_config() {
        let config = RuntimeConfig {
            connect_timeout_ms: 250,
            max_message_size: 1024,
            ..RuntimeConfig::default()
        };
        let options = config.tcp_options();
        assert_eq!(options.connect_timeout, Duration::from_millis(250));
        assert_eq!(options.max_message_size, 1024);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("runtime.json");
        std::fs::write(&path, r#"{"poll_interval_us":250}"#).expect("write");
        let config = RuntimeConfig::from_file(&path).expect("load");
        assert_eq!(config.poll_interval_us, 250);
        assert!(RuntimeConfig::from_file(dir.path().join("missing.json")).is_err());
    }
}
