//! # Gateway configuration
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//!
//! [logging]
//! level = "info"
//!
//! [zwave]
//! device = "/dev/ttyACM0"
//! baud = 115200
//! ack_timeout_ms = 1500
//! response_timeout_ms = 5000
//! controller_id = 1
//!
//! [enocean]
//! device = "/dev/ttyUSB0"
//! baud = 57600
//! response_timeout_ms = 1500
//! ```
//!
//! Every key except the device paths has a default. At least one of the
//! network sections must be present.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub zwave: Option<ZWaveConfig>,
    #[serde(default)]
    pub enocean: Option<EnOceanConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level() }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> Result<tracing::Level, ConfigError> {
        self.level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.level)))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZWaveConfig {
    pub device: String,
    #[serde(default = "default_zwave_baud")]
    pub baud: u32,
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    #[serde(default = "default_zwave_response_timeout_ms")]
    pub response_timeout_ms: u64,
    #[serde(default = "default_controller_id")]
    pub controller_id: u8,
}

impl ZWaveConfig {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            baud: default_zwave_baud(),
            ack_timeout_ms: default_ack_timeout_ms(),
            response_timeout_ms: default_zwave_response_timeout_ms(),
            controller_id: default_controller_id(),
        }
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnOceanConfig {
    pub device: String,
    #[serde(default = "default_enocean_baud")]
    pub baud: u32,
    #[serde(default = "default_ack_timeout_ms")]
    pub response_timeout_ms: u64,
}

impl EnOceanConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zwave.is_none() && self.enocean.is_none() {
            return Err(ConfigError::Invalid("no [zwave] or [enocean] section".to_string()));
        }
        if let Some(zwave) = &self.zwave {
            if zwave.device.is_empty() {
                return Err(ConfigError::Invalid("zwave.device must not be empty".to_string()));
            }
            if zwave.ack_timeout_ms == 0 || zwave.response_timeout_ms == 0 {
                return Err(ConfigError::Invalid("zwave timeouts must be > 0".to_string()));
            }
        }
        if let Some(enocean) = &self.enocean {
            if enocean.device.is_empty() {
                return Err(ConfigError::Invalid("enocean.device must not be empty".to_string()));
            }
            if enocean.response_timeout_ms == 0 {
                return Err(ConfigError::Invalid("enocean.response_timeout_ms must be > 0".to_string()));
            }
        }
        self.logging.max_level().map(|_| ())
    }
}

fn default_listen() -> SocketAddr { SocketAddr::from(([0, 0, 0, 0], 8080)) }
fn default_level() -> String { "info".to_string() }
fn default_zwave_baud() -> u32 { 115_200 }
fn default_enocean_baud() -> u32 { 57_600 }
fn default_ack_timeout_ms() -> u64 { 1500 }
fn default_zwave_response_timeout_ms() -> u64 { 5000 }
fn default_controller_id() -> u8 { 1 }

/// Parse and validate a configuration document.
pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents).inspect_err(|e| {
            tracing::error!("Invalid config file '{}': {}", path, e);
        }),
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            Err(ConfigError::Io(e))
        }
    }
}
