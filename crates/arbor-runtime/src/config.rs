//! Runtime configuration.
//!
//! [`RuntimeConfig`] collects every construction-time parameter of a
//! runtime pair: engine format (sample rate, block size, channels), queue
//! capacities, GC cadence, and the default fade windows renders use. It
//! loads from and saves to TOML so hosts can keep a config file next to
//! their presets.
//!
//! # TOML Format
//!
//! ```toml
//! sample_rate = 48000.0
//! block_size = 512
//! channels = 2
//! instruction_queue = 64
//! event_queue = 256
//! terminal_generation = 4
//! gc_interval_blocks = 25
//! fade_in_ms = 20.0
//! fade_out_ms = 20.0
//! ```
//!
//! Every field has a default; a partial file (or an empty one) is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading, saving, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a config file.
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML.
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A field value is out of range.
    #[error("invalid config: {field} {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Construction-time parameters for a runtime pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Fixed engine sample rate in Hz.
    pub sample_rate: f32,
    /// Maximum frames per process block.
    pub block_size: usize,
    /// Output channel slots (= expected root count).
    pub channels: usize,
    /// Instruction channel capacity, in batches.
    pub instruction_queue: usize,
    /// Event relay capacity, in events.
    pub event_queue: usize,
    /// Unreferenced sweeps before GC reclaims a node.
    pub terminal_generation: u32,
    /// Blocks between engine GC sweeps.
    pub gc_interval_blocks: u32,
    /// Default fade-in window for root activation, in milliseconds.
    pub fade_in_ms: f64,
    /// Default fade-out window for root activation, in milliseconds.
    pub fade_out_ms: f64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            block_size: 512,
            channels: 2,
            instruction_queue: 64,
            event_queue: 256,
            terminal_generation: 4,
            gc_interval_blocks: 25,
            fade_in_ms: 20.0,
            fade_out_ms: 20.0,
        }
    }
}

impl RuntimeConfig {
    /// Loads and validates a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RuntimeConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the config as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks every field is in its valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "sample_rate",
                reason: "must be positive",
            });
        }
        if self.block_size == 0 {
            return Err(ConfigError::Invalid {
                field: "block_size",
                reason: "must be at least 1",
            });
        }
        if self.channels == 0 {
            return Err(ConfigError::Invalid {
                field: "channels",
                reason: "must be at least 1",
            });
        }
        if self.instruction_queue == 0 {
            return Err(ConfigError::Invalid {
                field: "instruction_queue",
                reason: "must be at least 1",
            });
        }
        if self.event_queue == 0 {
            return Err(ConfigError::Invalid {
                field: "event_queue",
                reason: "must be at least 1",
            });
        }
        if self.fade_in_ms < 0.0 || self.fade_out_ms < 0.0 {
            return Err(ConfigError::Invalid {
                field: "fade_in_ms/fade_out_ms",
                reason: "must be non-negative",
            });
        }
        Ok(())
    }
}
