/// Latch state of the spike detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorState {
    /// Waiting for the signal to reach the threshold.
    #[default]
    Armed,
    /// Already counted the current excursion; waits for the signal to drop.
    Cooldown,
}

/// Threshold crossing detector with re-arm hysteresis: one event per
/// excursion at or above the threshold, re-armed by the first sample
/// strictly below it.
#[derive(Debug, Clone)]
pub struct SpikeDetector {
    threshold: f64,
    state: DetectorState,
}

impl SpikeDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            state: DetectorState::Armed,
        }
    }

    /// Returns `true` when `sample` starts a new excursion.
    pub fn process_sample(&mut self, sample: f64) -> bool {
        match self.state {
            DetectorState::Armed if sample >= self.threshold => {
                self.state = DetectorState::Cooldown;
                true
            }
            _ => {
                if sample < self.threshold {
                    self.state = DetectorState::Armed;
                }
                false
            }
        }
    }

    /// Changing the threshold re-arms the latch.
    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
        self.rearm();
    }

    pub fn rearm(&mut self) {
        self.state = DetectorState::Armed;
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == DetectorState::Armed
    }
}
