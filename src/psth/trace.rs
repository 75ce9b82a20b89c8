use std::collections::VecDeque;

use crate::psth::config::MAX_TRIAL_LENGTH;

/// Sliding window over the most recent trial's worth of raw samples.
pub struct RawTrace {
    samples: VecDeque<f64>,
}

impl RawTrace {
    pub fn new(len: usize) -> Self {
        let mut samples = VecDeque::with_capacity(MAX_TRIAL_LENGTH);
        samples.resize(len, 0.0);
        Self { samples }
    }

    /// Evicts the oldest sample and appends the newest; the length never changes.
    pub fn push(&mut self, sample: f64) {
        if self.samples.pop_front().is_some() {
            self.samples.push_back(sample);
        }
    }

    /// Re-zeroes the window at a new length. Old data is never carried over.
    pub fn reset(&mut self, len: usize) {
        self.samples.clear();
        self.samples.resize(len, 0.0);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}
