//! Runtime configuration - loaded from `adi.toml`
//!
//! Every section is optional; missing keys take their defaults.

use crate::error::{AdiError, AdiResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name searched for by `RuntimeConfig::discover`
pub const CONFIG_FILE: &str = "adi.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub strings: StringsConfig,

    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Slots per basic block for class instance pools
    #[serde(default = "default_block_slots")]
    pub block_slots: usize,

    /// Slots per basic block for the handle pool
    #[serde(default = "default_block_slots")]
    pub handle_block_slots: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringsConfig {
    /// Initial capacity of the common-string table
    #[serde(default = "default_table_capacity")]
    pub table_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Accept `d`/`D` exponent markers when scanning text into floats
    #[serde(default = "default_true")]
    pub fortran_exponents: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_false")]
    pub json: bool,

    #[serde(default)]
    pub file: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            block_slots: default_block_slots(),
            handle_block_slots: default_block_slots(),
        }
    }
}

impl Default for StringsConfig {
    fn default() -> Self {
        Self {
            table_capacity: default_table_capacity(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            fortran_exponents: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            file: None,
        }
    }
}

fn default_true() -> bool { true }
fn default_false() -> bool { false }
fn default_block_slots() -> usize { 512 }
fn default_table_capacity() -> usize { 203 }
fn default_level() -> String { "info".to_string() }

impl RuntimeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> AdiResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AdiError::invalid("Failed to read config ^PATH: ^ERR")
                .token("PATH", path.display())
                .token("ERR", e)
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> AdiResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            AdiError::invalid("Failed to parse config: ^ERR").token("ERR", e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the store cannot work with
    pub fn validate(&self) -> AdiResult<()> {
        if self.store.block_slots == 0 {
            return Err(AdiError::invalid("store.block_slots must be positive"));
        }
        if self.store.handle_block_slots == 0 {
            return Err(AdiError::invalid(
                "store.handle_block_slots must be positive",
            ));
        }
        Ok(())
    }

    /// Find `adi.toml` in `start` or its parents; defaults when absent
    pub fn discover(start: &Path) -> Self {
        Self::locate(start)
            .and_then(|path| Self::load(&path).ok())
            .unwrap_or_default()
    }

    fn locate(start: &Path) -> Option<PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            current = dir.parent().map(|p| p.to_path_buf());
        }

        None
    }

    /// Generate default configuration file content
    pub fn generate_default() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate config"))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> AdiResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            AdiError::invalid("Failed to serialize config: ^ERR").token("ERR", e)
        })?;

        fs::write(path, content).map_err(|e| {
            AdiError::invalid("Failed to write config ^PATH: ^ERR")
                .token("PATH", path.display())
                .token("ERR", e)
        })
    }
}
