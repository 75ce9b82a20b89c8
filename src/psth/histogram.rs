// src/psth/histogram.rs
use crate::psth::config::{AccumulationMode, Configuration, MAX_TRIAL_LENGTH};

/// Copy of the histogram ready for a display or a file sink.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HistogramSnapshot {
    /// Left edge of each bin in milliseconds.
    pub time_axis: Vec<f64>,
    /// Spikes/s per bin, or the averaged signal per sample slot.
    pub values: Vec<f64>,
}

impl HistogramSnapshot {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Per-mode running state. Spike counts and signal sums never share storage,
/// so switching modes cannot leak one into the other.
#[derive(Debug, Clone)]
enum Accumulation {
    SpikeRate { counts: Vec<u32>, rates: Vec<f64> },
    LinearAverage { sums: Vec<f64>, means: Vec<f64> },
}

impl Accumulation {
    fn for_mode(mode: AccumulationMode) -> Self {
        match mode {
            AccumulationMode::SpikeRate => Accumulation::SpikeRate {
                counts: Vec::with_capacity(MAX_TRIAL_LENGTH),
                rates: Vec::with_capacity(MAX_TRIAL_LENGTH),
            },
            AccumulationMode::LinearAverage => Accumulation::LinearAverage {
                sums: Vec::with_capacity(MAX_TRIAL_LENGTH),
                means: Vec::with_capacity(MAX_TRIAL_LENGTH),
            },
        }
    }

    fn mode(&self) -> AccumulationMode {
        match self {
            Accumulation::SpikeRate { .. } => AccumulationMode::SpikeRate,
            Accumulation::LinearAverage { .. } => AccumulationMode::LinearAverage,
        }
    }

    fn zero(&mut self, bins: usize) {
        match self {
            Accumulation::SpikeRate { counts, rates } => {
                counts.clear();
                counts.resize(bins, 0);
                rates.clear();
                rates.resize(bins, 0.0);
            }
            Accumulation::LinearAverage { sums, means } => {
                sums.clear();
                sums.resize(bins, 0.0);
                means.clear();
                means.resize(bins, 0.0);
            }
        }
    }

    fn values(&self) -> &[f64] {
        match self {
            Accumulation::SpikeRate { rates, .. } => rates,
            Accumulation::LinearAverage { means, .. } => means,
        }
    }
}

/// Trial-relative accumulator behind the PSTH and the linear average.
///
/// Only `floor(trial_length / bin_width)` bins exist. Samples that land in
/// the tail of a trial past the last full bin are not accumulated.
#[derive(Debug, Clone)]
pub struct Histogram {
    accumulation: Accumulation,
    time_axis: Vec<f64>,
    trial_length: usize,
    bin_width: usize,
    sample_rate_hz: f64,
}

impl Histogram {
    pub fn new(config: &Configuration) -> Self {
        let mut histogram = Self {
            accumulation: Accumulation::for_mode(config.mode),
            time_axis: Vec::with_capacity(MAX_TRIAL_LENGTH),
            trial_length: config.trial_length,
            bin_width: config.effective_bin_width(),
            sample_rate_hz: config.sample_rate_hz,
        };
        histogram.reshape(config);
        histogram
    }

    /// Adopts a new geometry or mode and zeroes everything.
    pub fn reshape(&mut self, config: &Configuration) {
        if self.accumulation.mode() != config.mode {
            self.accumulation = Accumulation::for_mode(config.mode);
        }
        self.trial_length = config.trial_length;
        self.bin_width = config.effective_bin_width();
        self.sample_rate_hz = config.sample_rate_hz;

        let bins = self.bin_count();
        let bin_ms = self.bin_width as f64 * 1000.0 / self.sample_rate_hz;
        self.time_axis.clear();
        self.time_axis.extend((0..bins).map(|i| i as f64 * bin_ms));
        self.accumulation.zero(bins);
    }

    pub fn clear(&mut self) {
        let bins = self.bin_count();
        self.accumulation.zero(bins);
    }

    pub fn mode(&self) -> AccumulationMode {
        self.accumulation.mode()
    }

    pub fn bin_count(&self) -> usize {
        self.trial_length / self.bin_width
    }

    pub fn trial_index(&self, sample_clock: u64) -> usize {
        (sample_clock % self.trial_length as u64) as usize
    }

    /// `None` when the sample falls in the truncated tail of the trial.
    pub fn bin_index(&self, sample_clock: u64) -> Option<usize> {
        let bin = self.trial_index(sample_clock) / self.bin_width;
        (bin < self.bin_count()).then_some(bin)
    }

    /// Trials seen so far including the one in progress; the normaliser for
    /// every estimate, so early bins of a fresh trial run a little high.
    pub fn trials_elapsed_estimate(&self, sample_clock: u64) -> u64 {
        sample_clock / self.trial_length as u64 + 1
    }

    /// Counts one spike at `sample_clock` and refreshes that bin's rate.
    /// Returns `false` if nothing was recorded.
    pub fn record_spike(&mut self, sample_clock: u64) -> bool {
        let Some(bin) = self.bin_index(sample_clock) else {
            return false;
        };
        let trials = self.trials_elapsed_estimate(sample_clock) as f64;
        let denominator = self.bin_width as f64 * trials;
        let sample_rate_hz = self.sample_rate_hz;
        match &mut self.accumulation {
            Accumulation::SpikeRate { counts, rates } => {
                counts[bin] += 1;
                rates[bin] = counts[bin] as f64 * sample_rate_hz / denominator;
                true
            }
            Accumulation::LinearAverage { .. } => false,
        }
    }

    /// Adds `value` to its trial slot and refreshes that slot's mean.
    pub fn record_sample(&mut self, sample_clock: u64, value: f64) -> bool {
        let Some(slot) = self.bin_index(sample_clock) else {
            return false;
        };
        let trials = self.trials_elapsed_estimate(sample_clock) as f64;
        match &mut self.accumulation {
            Accumulation::LinearAverage { sums, means } => {
                sums[slot] += value;
                means[slot] = sums[slot] / trials;
                true
            }
            Accumulation::SpikeRate { .. } => false,
        }
    }

    pub fn values(&self) -> &[f64] {
        self.accumulation.values()
    }

    pub fn time_axis(&self) -> &[f64] {
        &self.time_axis
    }

    pub fn spike_counts(&self) -> Option<&[u32]> {
        match &self.accumulation {
            Accumulation::SpikeRate { counts, .. } => Some(counts),
            Accumulation::LinearAverage { .. } => None,
        }
    }

    pub fn signal_sums(&self) -> Option<&[f64]> {
        match &self.accumulation {
            Accumulation::LinearAverage { sums, .. } => Some(sums),
            Accumulation::SpikeRate { .. } => None,
        }
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        HistogramSnapshot {
            time_axis: self.time_axis.clone(),
            values: self.values().to_vec(),
        }
    }
}
