//! Configuration management for the bridge binary
//!
//! Handles loading, parsing and validation of YAML configuration files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::midi::ChannelFilter;
use crate::wrangler::HostMode;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub midi: MidiConfig,
    #[serde(default)]
    pub host: HostConfig,
}

/// MIDI port configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    /// Case-insensitive substring of the input port name
    pub input_port: String,
    /// Only accept this MIDI channel (1-16); omni when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
}

impl MidiConfig {
    pub fn channel_filter(&self) -> ChannelFilter {
        ChannelFilter::from_config(self.channel)
    }
}

/// Host loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    #[serde(default)]
    pub mode: HostMode,
    #[serde(default = "default_cycle_hz")]
    pub cycle_hz: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            mode: HostMode::default(),
            cycle_hz: default_cycle_hz(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration for correctness
    pub fn validate(&self) -> Result<()> {
        if self.midi.input_port.trim().is_empty() {
            anyhow::bail!("MIDI input_port cannot be empty");
        }

        // 1-16 in config, 0-15 on the wire
        if let Some(channel) = self.midi.channel {
            if channel == 0 || channel > 16 {
                anyhow::bail!("Invalid MIDI channel {} (must be 1-16)", channel);
            }
        }

        if self.host.cycle_hz == 0 || self.host.cycle_hz > 1000 {
            anyhow::bail!(
                "Invalid host cycle_hz {} (must be 1-1000)",
                self.host.cycle_hz
            );
        }

        Ok(())
    }
}

fn default_cycle_hz() -> u32 {
    60
}
