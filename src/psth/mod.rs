// src/psth/mod.rs
// Streaming PSTH accumulation: trace window, spike latch, trial histogram.
pub mod config;
pub mod detector;
pub mod error;
pub mod histogram;
pub mod processor;
pub mod trace;

pub use config::{AccumulationMode, Configuration, MAX_TRIAL_LENGTH};
pub use detector::{DetectorState, SpikeDetector};
pub use error::ConfigurationError;
pub use histogram::{Histogram, HistogramSnapshot};
pub use processor::{PsthProcessor, SessionEvent, SessionState};
pub use trace::RawTrace;
