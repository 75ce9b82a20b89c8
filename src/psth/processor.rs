// src/psth/processor.rs
use log::{debug, info, warn};

use crate::psth::config::{AccumulationMode, Configuration};
use crate::psth::detector::{DetectorState, SpikeDetector};
use crate::psth::histogram::{Histogram, HistogramSnapshot};
use crate::psth::trace::RawTrace;
use crate::psth::ConfigurationError;

/// What happened during one `ingest` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// At least one trial finished; carries the running total.
    TrialCompleted { trials_completed: u32 },
    /// The bounded recording reached its target and accumulation stopped.
    SessionStopped { trials_completed: u32 },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Samples processed since the last reset.
    pub sample_clock: u64,
    pub trials_completed: u32,
    /// A bounded recording is running.
    pub recording: bool,
    /// Samples are being accumulated into the histogram.
    pub active: bool,
    /// Detector events since the last reset, whether accumulated or not.
    pub spikes_detected: u64,
}

/// The streaming PSTH / linear-average engine.
///
/// Owns the raw trace, the detector, the histogram and the session counters.
/// Every method takes `&mut self`, so a batch can never interleave with a
/// reconfiguration.
pub struct PsthProcessor {
    config: Configuration,
    trace: RawTrace,
    detector: SpikeDetector,
    histogram: Histogram,
    session: SessionState,
}

impl PsthProcessor {
    pub fn new(config: Configuration) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: Configuration) -> Self {
        Self {
            trace: RawTrace::new(config.trial_length),
            detector: SpikeDetector::new(config.spike_threshold),
            histogram: Histogram::new(&config),
            session: SessionState::default(),
            config,
        }
    }

    /// Processes `samples` strictly in order.
    ///
    /// Returns `SessionStopped` if a bounded recording finished inside this
    /// batch, otherwise `TrialCompleted` if any trial boundary was crossed.
    pub fn ingest(&mut self, samples: &[f64]) -> Option<SessionEvent> {
        let mut outcome = None;
        for &sample in samples {
            match self.process_sample(sample) {
                Some(stop @ SessionEvent::SessionStopped { .. }) => outcome = Some(stop),
                Some(trial) => {
                    if !matches!(outcome, Some(SessionEvent::SessionStopped { .. })) {
                        outcome = Some(trial);
                    }
                }
                None => {}
            }
        }
        outcome
    }

    fn process_sample(&mut self, sample: f64) -> Option<SessionEvent> {
        let clock = self.session.sample_clock;
        self.trace.push(sample);

        match self.config.mode {
            AccumulationMode::LinearAverage => {
                if self.session.active {
                    self.histogram.record_sample(clock, sample);
                }
            }
            AccumulationMode::SpikeRate => {
                if self.detector.process_sample(sample) {
                    self.session.spikes_detected += 1;
                    if self.session.active {
                        self.histogram.record_spike(clock);
                    }
                }
            }
        }

        self.session.sample_clock += 1;
        if self.session.sample_clock % self.config.trial_length as u64 != 0 {
            return None;
        }

        self.session.trials_completed = self.session.trials_completed.saturating_add(1);
        let trials_completed = self.session.trials_completed;
        if self.session.recording && trials_completed == self.config.num_trials {
            self.session.recording = false;
            self.session.active = false;
            info!("recording finished after {trials_completed} trials");
            return Some(SessionEvent::SessionStopped { trials_completed });
        }
        debug!("trial {trials_completed} complete");
        Some(SessionEvent::TrialCompleted { trials_completed })
    }

    /// Validates and applies `config` as a whole. Geometry changes (trial
    /// length, effective bin width, mode, sample rate) reset the histogram
    /// and the session counters; a new trial length also re-zeroes the trace.
    pub fn configure(&mut self, config: Configuration) -> Result<(), ConfigurationError> {
        if let Err(err) = config.validate() {
            warn!("rejected configuration: {err}");
            return Err(err);
        }
        let new = config.clone();
        let old = std::mem::replace(&mut self.config, config);

        let trial_length_changed = old.trial_length != new.trial_length;
        let geometry_changed = trial_length_changed
            || old.effective_bin_width() != new.effective_bin_width()
            || old.mode != new.mode
            || old.sample_rate_hz != new.sample_rate_hz;

        if trial_length_changed {
            self.trace.reset(new.trial_length);
        }
        if geometry_changed {
            self.histogram.reshape(&new);
            self.reset_counters();
        }
        if old.spike_threshold != new.spike_threshold {
            self.detector.set_threshold(new.spike_threshold);
        }
        if old.channel != new.channel {
            self.detector.rearm();
        }
        info!(
            "configured: {:?}, trial {} samples, {} bins of {} samples",
            new.mode,
            new.trial_length,
            self.histogram.bin_count(),
            new.effective_bin_width()
        );
        Ok(())
    }

    /// Zeroes the histogram and the counters; leaves `active`/`recording` alone.
    pub fn clear(&mut self) {
        self.histogram.clear();
        self.reset_counters();
    }

    /// Starts free-running accumulation. Trial zero starts with the next sample.
    pub fn trigger_start(&mut self) {
        if self.session.active {
            return;
        }
        self.session.active = true;
        self.session.sample_clock = 0;
        self.session.trials_completed = 0;
        info!("accumulation started");
    }

    /// Stops accumulation and any bounded recording. The histogram is kept.
    pub fn trigger_stop(&mut self) {
        if self.session.active || self.session.recording {
            info!("accumulation stopped");
        }
        self.session.active = false;
        self.session.recording = false;
        self.session.trials_completed = 0;
        self.detector.rearm();
    }

    /// Clears everything and records until `num_trials` trials have passed;
    /// 0 records until `trigger_stop`.
    pub fn start_recording(&mut self, num_trials: u32) {
        self.config.num_trials = num_trials;
        self.clear();
        self.session.recording = true;
        self.session.active = true;
        info!("recording started for {num_trials} trials");
    }

    pub fn set_channel(&mut self, channel: usize) {
        if self.config.channel != channel {
            self.config.channel = channel;
            self.detector.rearm();
            debug!("input channel set to {channel}");
        }
    }

    fn reset_counters(&mut self) {
        self.session.sample_clock = 0;
        self.session.trials_completed = 0;
        self.session.spikes_detected = 0;
        self.detector.rearm();
    }

    pub fn raw_trace(&self) -> Vec<f64> {
        self.trace.snapshot()
    }

    pub fn histogram(&self) -> HistogramSnapshot {
        self.histogram.snapshot()
    }

    pub fn histogram_state(&self) -> &Histogram {
        &self.histogram
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn detector_state(&self) -> DetectorState {
        self.detector.state()
    }
}

impl Default for PsthProcessor {
    fn default() -> Self {
        Self::from_valid(Configuration::default())
    }
}
