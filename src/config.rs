//! Configuration for the emulated system
//!
//! Covers the power-on state that real hardware leaves undefined or that test
//! harnesses want to pin down: where execution starts, what RAM contains, and
//! how much execution history the CPU keeps.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Entry point used by the nestest conformance ROM when run without a PPU.
pub const NESTEST_ENTRY_POINT: u16 = 0xC000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Where the CPU starts executing after power-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BootMode {
    /// Load PC from $FFFC/$FFFD, as the hardware does.
    ResetVector,
    /// Run the reset sequence, then override PC.
    EntryPoint { address: u16 },
}

impl Default for BootMode {
    fn default() -> Self {
        BootMode::ResetVector
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Byte written to every location of internal RAM at power-on
    #[serde(default = "default_ram_fill")]
    pub ram_fill: u8,

    /// Number of executed opcodes kept for the debugger (0 disables)
    #[serde(default = "default_history_len")]
    pub history_len: usize,

    #[serde(default)]
    pub boot: BootMode,
}

// Some games (Paperboy) do not boot with zeroed RAM
fn default_ram_fill() -> u8 {
    0xFF
}

fn default_history_len() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ram_fill: default_ram_fill(),
            history_len: default_history_len(),
            boot: BootMode::default(),
        }
    }
}

impl Config {
    /// Boots straight into the nestest automated test at $C000.
    pub fn nestest() -> Self {
        Self {
            boot: BootMode::EntryPoint {
                address: NESTEST_ENTRY_POINT,
            },
            ..Self::default()
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Like [`Config::load`], but a missing or broken file falls back to the
    /// defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::info!("Using default configuration");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{}, using default configuration", e);
                Self::default()
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        log::info!("Saved configuration to: {}", path.display());
        Ok(())
    }
}
