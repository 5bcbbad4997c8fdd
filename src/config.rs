//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```
//! let config = drift::EngineConfig::from_toml_str("sample_rate = 44100").unwrap();
//! assert_eq!(config.sample_rate, 44100);
//! assert_eq!(config.message_queue_size, 1024);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate of the output context in Hz
    pub sample_rate: u32,
    /// Capacity of the PCM ring buffer handed to the hardware sink, in stereo frames
    pub output_buffer_frames: usize,
    /// Per-node parameter message queue capacity
    pub message_queue_size: usize,
    /// Create the context suspended, the way browsers do before a user gesture
    pub start_suspended: bool,
    /// Frequency of the silent keepalive oscillator
    pub keepalive_frequency: f32,
    /// How often `tick` re-checks that the context is running while sounds are active
    pub liveness_check_interval_ms: u64,
    /// Root directory that `/sounds/...` style URLs resolve against
    pub asset_root: PathBuf,
    /// Seed for noise buffers and ambience randomness; entropy when unset
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            output_buffer_frames: 8192,
            message_queue_size: 1024,
            start_suspended: false,
            keepalive_frequency: 0.001,
            liveness_check_interval_ms: 5000,
            asset_root: PathBuf::from("."),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(EngineError::Config("sample_rate must be non-zero".into()));
        }
        if self.output_buffer_frames == 0 {
            return Err(EngineError::Config("output_buffer_frames must be non-zero".into()));
        }
        if self.message_queue_size == 0 {
            return Err(EngineError::Config("message_queue_size must be non-zero".into()));
        }
        Ok(())
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn suspended(mut self) -> Self {
        self.start_suspended = true;
        self
    }
}
