//! # Configuration Module
//!
//! Practice settings with documented defaults, loadable from a TOML file
//! and validated before a session starts.

use crate::audio::BUFFER_SIZE;
use crate::pitch::DEFAULT_THRESHOLD;
use crate::tuning::DEFAULT_SA_FREQUENCY;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// A named Sa the singer can pick instead of typing a frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SaPreset {
    pub name: &'static str,
    pub frequency: f64,
    pub label: &'static str,
}

pub const SA_PRESETS: [SaPreset; 12] = [
    SaPreset { name: "C3", frequency: 130.81, label: "C3 (Low - Male)" },
    SaPreset { name: "D3", frequency: 146.83, label: "D3" },
    SaPreset { name: "E3", frequency: 164.81, label: "E3" },
    SaPreset { name: "F3", frequency: 174.61, label: "F3" },
    SaPreset { name: "G3", frequency: 196.00, label: "G3 (Mid-Low)" },
    SaPreset { name: "A3", frequency: 220.00, label: "A3" },
    SaPreset { name: "B3", frequency: 246.94, label: "B3" },
    SaPreset { name: "C4", frequency: 261.63, label: "C4 (Standard)" },
    SaPreset { name: "D4", frequency: 293.66, label: "D4" },
    SaPreset { name: "E4", frequency: 329.63, label: "E4 (High - Female)" },
    SaPreset { name: "F4", frequency: 349.23, label: "F4" },
    SaPreset { name: "G4", frequency: 392.00, label: "G4 (Very High)" },
];

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Sa frequency must be a positive number of Hz, got {0}")]
    InvalidSa(f64),
    #[error("unknown Sa preset or frequency: {0:?}")]
    UnknownSaPreset(String),
    #[error("minimum volume must be within [0, 1], got {0}")]
    InvalidMinVolume(f64),
    #[error("smoothing factor must be within (0, 1], got {0}")]
    InvalidSmoothing(f64),
    #[error("estimator threshold must be within (0, 1), got {0}")]
    InvalidThreshold(f64),
    #[error("tick interval must be at least 1 ms")]
    ZeroTickInterval,
    #[error("frame size must be at least 64 samples, got {0}")]
    FrameTooSmall(usize),
}

/// Resolves a Sa given either as a preset name ("C4") or as Hz ("240.5").
pub fn parse_sa(value: &str) -> Result<f64, ConfigError> {
    let value = value.trim();
    if let Some(preset) = SA_PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(value)) {
        return Ok(preset.frequency);
    }
    let freq: f64 = value
        .parse()
        .map_err(|_| ConfigError::UnknownSaPreset(value.to_string()))?;
    if freq.is_finite() && freq > 0.0 {
        Ok(freq)
    } else {
        Err(ConfigError::InvalidSa(freq))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SadhanaConfig {
    /// Tonic in Hz.
    pub sa_frequency: f64,
    /// YIN absolute threshold.
    pub estimator_threshold: f64,
    /// Volume below which a cycle counts as silence.
    pub min_volume: f64,
    /// Weight of the newest frequency in the exponential smoothing.
    pub smoothing_factor: f64,
    /// Detection cadence; 16 ms is roughly one display frame.
    pub tick_interval_ms: u64,
    /// How long an exercise note must be held in tune.
    pub required_match_ms: u64,
    pub frame_size: usize,
    pub log_level: Option<String>,
}

impl Default for SadhanaConfig {
    fn default() -> Self {
        Self {
            sa_frequency: DEFAULT_SA_FREQUENCY,
            estimator_threshold: DEFAULT_THRESHOLD as f64,
            min_volume: 0.005,
            smoothing_factor: 0.5,
            tick_interval_ms: 16,
            required_match_ms: 500,
            frame_size: BUFFER_SIZE,
            log_level: None,
        }
    }
}

impl SadhanaConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: SadhanaConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sa_frequency.is_finite() && self.sa_frequency > 0.0) {
            return Err(ConfigError::InvalidSa(self.sa_frequency));
        }
        if !(0.0..=1.0).contains(&self.min_volume) {
            return Err(ConfigError::InvalidMinVolume(self.min_volume));
        }
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(ConfigError::InvalidSmoothing(self.smoothing_factor));
        }
        if !(self.estimator_threshold > 0.0 && self.estimator_threshold < 1.0) {
            return Err(ConfigError::InvalidThreshold(self.estimator_threshold));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.frame_size < 64 {
            return Err(ConfigError::FrameTooSmall(self.frame_size));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn required_match(&self) -> Duration {
        Duration::from_millis(self.required_match_ms)
    }
}
