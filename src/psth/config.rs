// src/psth/config.rs
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::psth::ConfigurationError;

/// Capacity every per-trial buffer is reserved for. Matches the longest trial
/// the instrument ever supported.
pub const MAX_TRIAL_LENGTH: usize = 5000;

/// What the accumulator does with each sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulationMode {
    /// Threshold the signal and histogram the spike rate per bin.
    #[default]
    SpikeRate,
    /// Average the raw signal per trial-relative sample slot.
    LinearAverage,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Samples per trial.
    pub trial_length: usize,
    /// Samples per histogram bin in spike-rate mode.
    pub bin_width: usize,
    /// Spike threshold in raw sample units.
    pub spike_threshold: f64,
    /// Trials per bounded recording; 0 records until stopped by hand.
    pub num_trials: u32,
    pub mode: AccumulationMode,
    /// Samples per second. At 1000 Hz one sample is one millisecond.
    pub sample_rate_hz: f64,
    /// Acquisition channel routed into the processor.
    pub channel: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            trial_length: 1000,
            bin_width: 20,
            spike_threshold: 2500.0,
            num_trials: 10,
            mode: AccumulationMode::SpikeRate,
            sample_rate_hz: 1000.0,
            channel: 0,
        }
    }
}

impl Configuration {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.trial_length == 0 {
            return Err(ConfigurationError::ZeroTrialLength);
        }
        if self.trial_length > MAX_TRIAL_LENGTH {
            return Err(ConfigurationError::TrialLengthTooLong {
                requested: self.trial_length,
                max: MAX_TRIAL_LENGTH,
            });
        }
        if self.bin_width == 0 {
            return Err(ConfigurationError::ZeroBinWidth);
        }
        if self.effective_bin_width() > self.trial_length {
            return Err(ConfigurationError::BinWiderThanTrial {
                bin_width: self.effective_bin_width(),
                trial_length: self.trial_length,
            });
        }
        if !self.spike_threshold.is_finite() {
            return Err(ConfigurationError::NonFiniteThreshold);
        }
        if !self.sample_rate_hz.is_finite() || self.sample_rate_hz <= 0.0 {
            return Err(ConfigurationError::InvalidSampleRate);
        }
        Ok(())
    }

    /// Bin width actually used for addressing. Linear averaging always works
    /// per sample slot; the configured width is kept for when spike-rate mode
    /// comes back.
    pub fn effective_bin_width(&self) -> usize {
        match self.mode {
            AccumulationMode::SpikeRate => self.bin_width,
            AccumulationMode::LinearAverage => 1,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.trial_length / self.effective_bin_width()
    }

    /// Milliseconds covered by one sample.
    pub fn sample_period_ms(&self) -> f64 {
        1000.0 / self.sample_rate_hz
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Configuration = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write config file {}", path.display()))
    }
}
