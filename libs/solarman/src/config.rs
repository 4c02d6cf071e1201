//! Logger configuration
//!
//! Everything the protocol needs to know about one logger that is not carried
//! on the wire: address, serial number, framing mode, timeouts and the list of
//! register blocks to poll.

use crate::constants::{DEFAULT_PORT, DEFAULT_READ_ATTEMPTS};
use crate::error::{Result, SolarmanError};
use crate::protocol::LoggerMode;
use crate::request::{parse_requests, RegisterRequest};
use common::config_loader::{load_config, load_config_with};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "SOLARMAN_";

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_read_attempts() -> u32 {
    DEFAULT_READ_ATTEMPTS
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_requests() -> Vec<String> {
    vec!["0x03:0x0000-0x006D".to_string()]
}

/// Configuration of one data logger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub hostname: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Logger stick serial number, required in V5 mode
    #[serde(default)]
    pub serial_number: Option<u32>,

    #[serde(default)]
    pub mode: LoggerMode,

    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-attempt read timeout
    #[serde(default = "default_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_read_attempts")]
    pub read_attempts: u32,

    #[serde(default)]
    pub frame_logging: bool,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Request strings `<fc>:<first>-<last>`, each may hold a comma separated list
    #[serde(default = "default_requests")]
    pub requests: Vec<String>,
}

impl LoggerConfig {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: default_port(),
            serial_number: None,
            mode: LoggerMode::default(),
            connect_timeout_ms: default_timeout_ms(),
            read_timeout_ms: default_timeout_ms(),
            read_attempts: default_read_attempts(),
            frame_logging: false,
            refresh_interval_secs: default_refresh_interval_secs(),
            requests: default_requests(),
        }
    }

    /// Load from an optional file plus `SOLARMAN_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = load_config(path, ENV_PREFIX)
            .map_err(|e| SolarmanError::config(format!("Failed to load config: {e}")))?;
        debug!(
            "Loaded logger config: {}:{} ({})",
            config.hostname, config.port, config.mode
        );
        Ok(config)
    }

    /// Like [`LoggerConfig::load`], with `overrides` taking precedence over file and env
    pub fn load_with_overrides<O: Serialize>(path: Option<&Path>, overrides: &O) -> Result<Self> {
        load_config_with(path, ENV_PREFIX, overrides)
            .map_err(|e| SolarmanError::config(format!("Failed to load config: {e}")))
    }

    /// All configured requests, in order
    pub fn register_requests(&self) -> Result<Vec<RegisterRequest>> {
        let mut requests = Vec::new();
        for entry in &self.requests {
            requests.extend(parse_requests(entry)?);
        }
        Ok(requests)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hostname.trim().is_empty() {
            return Err(SolarmanError::config("hostname must not be empty"));
        }
        if self.port == 0 {
            return Err(SolarmanError::config("port must not be 0"));
        }
        if self.read_attempts == 0 {
            return Err(SolarmanError::config("read_attempts must be at least 1"));
        }
        if self.mode == LoggerMode::V5 && self.serial_number.is_none() {
            return Err(SolarmanError::config("serial_number is required in v5 mode"));
        }
        if self.register_requests()?.is_empty() {
            return Err(SolarmanError::config("no register requests configured"));
        }
        Ok(())
    }
}
