// src/drivers/mod.rs
// Acquisition side: where samples come from and how they reach the processor
pub mod error;
pub mod pipeline;
pub mod source;
pub use error::AcquisitionError;
pub use pipeline::{AcquisitionPipeline, PumpReport};
pub use source::{
    make_batch, ManualSource, PlaybackSource, SampleBatch, SampleSource, SimulatedSource,
    SpikeProfile,
};
