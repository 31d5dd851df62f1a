use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lane::LaneConfig;
use crate::transport::ClockSource;
use crate::NUM_LANES;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),
    #[error("bpm must be positive and finite, got {0}")]
    InvalidBpm(f64),
    #[error("at most {max} lanes are supported, config has {found}")]
    TooManyLanes { found: usize, max: usize },
}

/// Startup configuration of an engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: f64,
    pub bpm: f64,
    pub clock_source: ClockSource,
    /// No host around: a `Daw` clock source falls back to `Internal`.
    pub standalone: bool,
    /// Seed for the Random arp mode, for reproducible renders.
    pub rng_seed: u64,
    /// Missing lanes take `LaneConfig::default()`.
    pub lanes: Vec<LaneConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            bpm: 120.0,
            clock_source: ClockSource::Internal,
            standalone: false,
            rng_seed: 0x5EED,
            lanes: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        log::info!("[Config] Loaded {} ({} lanes configured)", path.display(), config.lanes.len());
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(ConfigError::InvalidBpm(self.bpm));
        }
        if self.lanes.len() > NUM_LANES {
            return Err(ConfigError::TooManyLanes { found: self.lanes.len(), max: NUM_LANES });
        }
        Ok(())
    }

    /// Configuration for lane `index`, sanitized. Lanes beyond the list get defaults.
    pub fn lane(&self, index: usize) -> LaneConfig {
        self.lanes.get(index).cloned().unwrap_or_default().sanitized()
    }
}
