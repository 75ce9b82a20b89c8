use crate::drivers::error::AcquisitionError;
use crate::drivers::source::SampleSource;
use crate::psth::{PsthProcessor, SessionEvent};
/// Outcome of one poll of the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PumpReport {
    /// Samples handed to the processor from the selected channel.
    pub samples: usize,
    pub event: Option<SessionEvent>,
}
/// Pulls batches from a source and feeds the configured channel to the processor.
pub struct AcquisitionPipeline<S: SampleSource> {
    source: S,
    processor: PsthProcessor,
    batches: u64,
}
impl<S: SampleSource> AcquisitionPipeline<S> {
    pub fn new(source: S, processor: PsthProcessor) -> Self {
        Self {
            source,
            processor,
            batches: 0,
        }
    }
    /// `Ok(None)` when the source had nothing new.
    pub fn pump_once(&mut self) -> Result<Option<PumpReport>, AcquisitionError> {
        let Some(batch) = self.source.next_batch()? else {
            return Ok(None);
        };
        batch.validate()?;
        let expected = self.processor.config().sample_rate_hz;
        if batch.sample_rate_hz != expected {
            return Err(AcquisitionError::SampleRateMismatch {
                expected,
                actual: batch.sample_rate_hz,
            });
        }
        let samples = batch.channel(self.processor.config().channel)?;
        let event = self.processor.ingest(samples);
        self.batches += 1;
        Ok(Some(PumpReport {
            samples: samples.len(),
            event,
        }))
    }
    pub fn batches_processed(&self) -> u64 {
        self.batches
    }
    pub fn processor(&self) -> &PsthProcessor {
        &self.processor
    }
    pub fn processor_mut(&mut self) -> &mut PsthProcessor {
        &mut self.processor
    }
    pub fn into_processor(self) -> PsthProcessor {
        self.processor
    }
}
