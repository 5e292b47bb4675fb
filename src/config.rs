//! Machine configuration.
//!
//! ```json
//! { "registers": 6, "load_address": 49152 }
//! ```

use crate::cpu::registers::{DEFAULT_REGISTERS, MAX_REGISTERS};
use serde::{Serialize, Deserialize};
use std::path::Path;
use thiserror::Error;

/// Default address programs are loaded at.
pub const DEFAULT_LOAD_ADDRESS: u16 = 0xC000;

/// Parameters that shape a machine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Number of general-purpose registers (1..=8).
    pub registers: usize,
    /// Where program images are placed and execution starts.
    pub load_address: u16,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            registers: DEFAULT_REGISTERS,
            load_address: DEFAULT_LOAD_ADDRESS,
        }
    }
}

impl MachineConfig {
    /// Parse a configuration from JSON text and validate it.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_REGISTERS).contains(&self.registers) {
            return Err(ConfigError::RegisterCount(self.registers));
        }
        if self.load_address & 1 != 0 {
            return Err(ConfigError::MisalignedLoadAddress(self.load_address));
        }
        Ok(())
    }
}

/// Errors that can occur while reading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("register count {0} outside 1..=8")]
    RegisterCount(usize),

    #[error("load address {0:#06x} is not word aligned")]
    MisalignedLoadAddress(u16),
}
