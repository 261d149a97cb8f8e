//! Configuration for the chat fabric processes
//!
//! Both binaries share one TOML configuration file. Every field has a
//! default matching the fabric's conventional ports and the bot's stock
//! pacing, so the processes also run with no file at all.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Top-level configuration for broker and agent processes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FabricConfig {
    #[serde(default)]
    pub endpoints: EndpointsSection,
    #[serde(default)]
    pub bot: BotSection,
}

/// Network endpoints of the fabric
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointsSection {
    /// Request/reply endpoint exposed by the external reply service
    #[serde(default = "default_reply_addr")]
    pub reply: String,
    /// Publisher-facing endpoint bound by the relay broker
    #[serde(default = "default_upstream_addr")]
    pub upstream: String,
    /// Subscriber-facing endpoint bound by the relay broker
    #[serde(default = "default_downstream_addr")]
    pub downstream: String,
    /// Bound wait for a request/reply exchange. Absent means block
    /// indefinitely, which matches the historical behavior of the fabric.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_reply_addr() -> String {
    "127.0.0.1:5555".to_string()
}

fn default_upstream_addr() -> String {
    "0.0.0.0:5557".to_string()
}

fn default_downstream_addr() -> String {
    "0.0.0.0:5558".to_string()
}

impl Default for EndpointsSection {
    fn default() -> Self {
        Self {
            reply: default_reply_addr(),
            upstream: default_upstream_addr(),
            downstream: default_downstream_addr(),
            request_timeout_secs: None,
        }
    }
}

/// Pacing of the bot's publish loop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BotSection {
    /// Messages per burst before the long pause
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
    /// Pause between messages inside a burst, uniform over this range
    #[serde(default = "default_message_delay_min")]
    pub message_delay_min_secs: f64,
    #[serde(default = "default_message_delay_max")]
    pub message_delay_max_secs: f64,
    /// Pause between bursts, uniform over this range
    #[serde(default = "default_cycle_delay_min")]
    pub cycle_delay_min_secs: f64,
    #[serde(default = "default_cycle_delay_max")]
    pub cycle_delay_max_secs: f64,
    /// Wait when no channel is available before retrying
    #[serde(default = "default_empty_wait")]
    pub empty_channels_wait_secs: f64,
    /// Backoff after an unexpected error in the publish loop
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: f64,
}

fn default_burst_size() -> u32 {
    10
}

fn default_message_delay_min() -> f64 {
    2.0
}

fn default_message_delay_max() -> f64 {
    5.0
}

fn default_cycle_delay_min() -> f64 {
    10.0
}

fn default_cycle_delay_max() -> f64 {
    20.0
}

fn default_empty_wait() -> f64 {
    10.0
}

fn default_error_backoff() -> f64 {
    5.0
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            burst_size: default_burst_size(),
            message_delay_min_secs: default_message_delay_min(),
            message_delay_max_secs: default_message_delay_max(),
            cycle_delay_min_secs: default_cycle_delay_min(),
            cycle_delay_max_secs: default_cycle_delay_max(),
            empty_channels_wait_secs: default_empty_wait(),
            error_backoff_secs: default_error_backoff(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FabricConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: FabricConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.burst_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "bot.burst_size must be at least 1".to_string(),
            ));
        }
        if self.bot.message_delay_min_secs > self.bot.message_delay_max_secs {
            return Err(ConfigError::InvalidConfig(
                "bot.message_delay_min_secs exceeds message_delay_max_secs".to_string(),
            ));
        }
        if self.bot.cycle_delay_min_secs > self.bot.cycle_delay_max_secs {
            return Err(ConfigError::InvalidConfig(
                "bot.cycle_delay_min_secs exceeds cycle_delay_max_secs".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a test configuration with short pacing for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[endpoints]
reply = "127.0.0.1:5555"
upstream = "127.0.0.1:5557"
downstream = "127.0.0.1:5558"

[bot]
burst_size = 2
message_delay_min_secs = 0.0
message_delay_max_secs = 0.01
cycle_delay_min_secs = 0.0
cycle_delay_max_secs = 0.01
empty_channels_wait_secs = 0.01
error_backoff_secs = 0.01
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}
