use std::collections::VecDeque;
use std::io::BufRead;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::AcquisitionError;
/// One poll's worth of multi-channel A/D samples.
#[derive(Clone, Debug)]
pub struct SampleBatch {
    pub sample_rate_hz: f64,
    pub samples: Vec<Vec<f64>>, // channels x samples
}
impl SampleBatch {
    pub fn validate(&self) -> Result<(), AcquisitionError> {
        if self.sample_rate_hz <= 0.0 {
            return Err(AcquisitionError::InvalidSampleRate);
        }
        if let Some(expected) = self.samples_per_channel() {
            if let Some(ragged) = self.samples.iter().find(|c| c.len() != expected) {
                return Err(AcquisitionError::RaggedBatch {
                    expected,
                    actual: ragged.len(),
                });
            }
        }
        Ok(())
    }
    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }
    pub fn samples_per_channel(&self) -> Option<usize> {
        self.samples.first().map(|c| c.len())
    }
    pub fn channel(&self, channel: usize) -> Result<&[f64], AcquisitionError> {
        self.samples
            .get(channel)
            .map(Vec::as_slice)
            .ok_or(AcquisitionError::ChannelOutOfRange {
                channel,
                available: self.num_channels(),
            })
    }
}
/// Lightweight helper to produce a batch from owned sample data.
pub fn make_batch(sample_rate_hz: f64, samples: Vec<Vec<f64>>) -> SampleBatch {
    SampleBatch {
        sample_rate_hz,
        samples,
    }
}
/// Anything that can hand over the samples that arrived since the last poll.
/// `Ok(None)` means nothing new yet, not end of stream.
pub trait SampleSource {
    fn next_batch(&mut self) -> Result<Option<SampleBatch>, AcquisitionError>;
}
/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<SampleBatch>,
}
impl ManualSource {
    pub fn new(batches: impl IntoIterator<Item = SampleBatch>) -> Self {
        Self {
            queue: batches.into_iter().collect(),
        }
    }
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}
impl SampleSource for ManualSource {
    fn next_batch(&mut self) -> Result<Option<SampleBatch>, AcquisitionError> {
        Ok(self.queue.pop_front())
    }
}
/// Replays a recorded text file: one line per time step, channels separated
/// by commas or whitespace. Ends with `SourceExhausted`.
pub struct PlaybackSource {
    rows: VecDeque<Vec<f64>>,
    sample_rate_hz: f64,
    batch_len: usize,
}
impl PlaybackSource {
    pub fn from_reader<R: BufRead>(
        reader: R,
        sample_rate_hz: f64,
        batch_len: usize,
    ) -> Result<Self, AcquisitionError> {
        let mut rows = VecDeque::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let row = trimmed
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|field| !field.is_empty())
                .map(|field| {
                    field.parse::<f64>().map_err(|_| AcquisitionError::Parse {
                        line: idx + 1,
                        value: field.to_string(),
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            rows.push_back(row);
        }
        Ok(Self {
            rows,
            sample_rate_hz,
            batch_len: batch_len.max(1),
        })
    }
    pub fn remaining_rows(&self) -> usize {
        self.rows.len()
    }
}
impl SampleSource for PlaybackSource {
    fn next_batch(&mut self) -> Result<Option<SampleBatch>, AcquisitionError> {
        if self.rows.is_empty() {
            return Err(AcquisitionError::SourceExhausted);
        }
        let take = self.batch_len.min(self.rows.len());
        let channels = self.rows.front().map(Vec::len).unwrap_or(0);
        let mut samples = vec![Vec::with_capacity(take); channels];
        for row in self.rows.drain(..take) {
            if row.len() != channels {
                return Err(AcquisitionError::RaggedBatch {
                    expected: channels,
                    actual: row.len(),
                });
            }
            for (channel, value) in samples.iter_mut().zip(row) {
                channel.push(value);
            }
        }
        Ok(Some(make_batch(self.sample_rate_hz, samples)))
    }
}
/// Shape of the synthetic recording, in raw A/D units.
#[derive(Clone, Debug)]
pub struct SpikeProfile {
    pub baseline: f64,
    /// Peak of the uniform background noise.
    pub noise: f64,
    pub spike_amplitude: f64,
    /// Samples a spike stays above baseline.
    pub spike_width: usize,
    pub background_rate_hz: f64,
    /// Firing rate inside the evoked window.
    pub response_rate_hz: f64,
    /// Evoked window, in samples after each stimulus.
    pub response_onset: usize,
    pub response_duration: usize,
}
impl Default for SpikeProfile {
    fn default() -> Self {
        // 12-bit converter centred at mid-scale; spikes clear the default threshold of 2500.
        Self {
            baseline: 2048.0,
            noise: 50.0,
            spike_amplitude: 1500.0,
            spike_width: 2,
            background_rate_hz: 5.0,
            response_rate_hz: 80.0,
            response_onset: 100,
            response_duration: 200,
        }
    }
}
/// Stimulus-locked spiking neuron on every channel, for running without hardware.
pub struct SimulatedSource {
    rng: StdRng,
    sample_rate_hz: f64,
    batch_len: usize,
    stimulus_period: usize,
    profile: SpikeProfile,
    clock: u64,
    spike_remaining: Vec<usize>, // channel -> samples left in the current spike
    batches_left: Option<usize>,
}
impl SimulatedSource {
    pub fn new(
        channels: usize,
        sample_rate_hz: f64,
        batch_len: usize,
        stimulus_period: usize,
        seed: u64,
    ) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            sample_rate_hz,
            batch_len,
            stimulus_period: stimulus_period.max(1),
            profile: SpikeProfile::default(),
            clock: 0,
            spike_remaining: vec![0; channels],
            batches_left: None,
        }
    }
    pub fn with_profile(mut self, profile: SpikeProfile) -> Self {
        self.profile = profile;
        self
    }
    /// Stop with `SourceExhausted` after `batches` batches.
    pub fn with_batch_limit(mut self, batches: usize) -> Self {
        self.batches_left = Some(batches);
        self
    }
    fn in_response_window(&self) -> bool {
        let phase = (self.clock % self.stimulus_period as u64) as usize;
        let onset = self.profile.response_onset;
        phase >= onset && phase < onset + self.profile.response_duration
    }
    fn next_frame(&mut self, out: &mut [Vec<f64>]) {
        let rate = if self.in_response_window() {
            self.profile.response_rate_hz
        } else {
            self.profile.background_rate_hz
        };
        let p_spike = (rate / self.sample_rate_hz).clamp(0.0, 1.0);
        for (channel, samples) in out.iter_mut().enumerate() {
            let noise = self.rng.gen_range(-1.0..=1.0) * self.profile.noise;
            let mut value = self.profile.baseline + noise;
            if self.spike_remaining[channel] == 0 && self.rng.gen_bool(p_spike) {
                self.spike_remaining[channel] = self.profile.spike_width;
            }
            if self.spike_remaining[channel] > 0 {
                self.spike_remaining[channel] -= 1;
                value += self.profile.spike_amplitude;
            }
            samples.push(value);
        }
        self.clock += 1;
    }
}
impl SampleSource for SimulatedSource {
    fn next_batch(&mut self) -> Result<Option<SampleBatch>, AcquisitionError> {
        if let Some(left) = self.batches_left.as_mut() {
            if *left == 0 {
                return Err(AcquisitionError::SourceExhausted);
            }
            *left -= 1;
        }
        let channels = self.spike_remaining.len();
        let mut samples = vec![Vec::with_capacity(self.batch_len); channels];
        for _ in 0..self.batch_len {
            self.next_frame(&mut samples);
        }
        Ok(Some(make_batch(self.sample_rate_hz, samples)))
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn manual_source_replays_in_order() {
        let mut source = ManualSource::new(vec![
            make_batch(1000.0, vec![vec![1.0]]),
            make_batch(1000.0, vec![vec![2.0]]),
        ]);
        assert_eq!(source.next_batch().unwrap().unwrap().samples, vec![vec![1.0]]);
        assert_eq!(source.remaining(), 1);
        assert_eq!(source.next_batch().unwrap().unwrap().samples, vec![vec![2.0]]);
        assert!(source.next_batch().unwrap().is_none());
    }
    #[test]
    fn batch_validation_catches_bad_shapes() {
        assert!(matches!(
            make_batch(0.0, vec![vec![0.0]]).validate(),
            Err(AcquisitionError::InvalidSampleRate)
        ));
        assert!(matches!(
            make_batch(1000.0, vec![vec![0.0; 3], vec![0.0; 2]]).validate(),
            Err(AcquisitionError::RaggedBatch { expected: 3, actual: 2 })
        ));
        let batch = make_batch(1000.0, vec![vec![0.0; 4]; 2]);
        assert!(batch.validate().is_ok());
        assert_eq!(batch.samples_per_channel(), Some(4));
        assert!(matches!(
            batch.channel(2),
            Err(AcquisitionError::ChannelOutOfRange { channel: 2, available: 2 })
        ));
    }
    #[test]
    fn simulated_source_is_seeded_and_shaped() {
        let mut a = SimulatedSource::new(3, 1000.0, 50, 1000, 42);
        let mut b = SimulatedSource::new(3, 1000.0, 50, 1000, 42);
        let batch_a = a.next_batch().unwrap().unwrap();
        let batch_b = b.next_batch().unwrap().unwrap();
        assert_eq!(batch_a.samples, batch_b.samples);
        assert_eq!(batch_a.num_channels(), 3);
        assert_eq!(batch_a.samples_per_channel(), Some(50));
        assert!(batch_a.validate().is_ok());
    }
    #[test]
    fn simulated_spikes_cluster_in_the_response_window() {
        let profile = SpikeProfile {
            background_rate_hz: 0.0,
            response_rate_hz: 1000.0,
            response_onset: 10,
            response_duration: 5,
            spike_width: 1,
            ..SpikeProfile::default()
        };
        let mut source = SimulatedSource::new(1, 1000.0, 40, 40, 1).with_profile(profile);
        let batch = source.next_batch().unwrap().unwrap();
        for (i, &v) in batch.samples[0].iter().enumerate() {
            let in_window = (10..15).contains(&i);
            assert_eq!(v > 3000.0, in_window, "sample {i} = {v}");
        }
    }
    #[test]
    fn playback_source_batches_rows_by_channel() {
        let text = "# t0\n1, 10\n2 20\n\n3,30\n";
        let mut source = PlaybackSource::from_reader(text.as_bytes(), 1000.0, 2).unwrap();
        assert_eq!(source.remaining_rows(), 3);
        let first = source.next_batch().unwrap().unwrap();
        assert_eq!(first.samples, vec![vec![1.0, 2.0], vec![10.0, 20.0]]);
        let second = source.next_batch().unwrap().unwrap();
        assert_eq!(second.samples, vec![vec![3.0], vec![30.0]]);
        assert!(matches!(
            source.next_batch(),
            Err(AcquisitionError::SourceExhausted)
        ));
    }
    #[test]
    fn playback_source_reports_bad_lines() {
        let err = PlaybackSource::from_reader("1\nabc\n".as_bytes(), 1000.0, 4)
            .err()
            .unwrap();
        assert!(matches!(err, AcquisitionError::Parse { line: 2, .. }));
    }
    #[test]
    fn batch_limit_exhausts_the_source() {
        let mut source = SimulatedSource::new(1, 1000.0, 10, 100, 0).with_batch_limit(1);
        assert!(source.next_batch().is_ok());
        assert!(matches!(
            source.next_batch(),
            Err(AcquisitionError::SourceExhausted)
        ));
    }
}
