use thiserror::Error;
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("sample rate mismatch: expected {expected}, got {actual}")]
    SampleRateMismatch { expected: f64, actual: f64 },
    #[error("channel {channel} out of range: the source delivers {available} channels")]
    ChannelOutOfRange { channel: usize, available: usize },
    #[error("ragged batch: expected {expected} samples per channel, got {actual}")]
    RaggedBatch { expected: usize, actual: usize },
    #[error("sample source is exhausted")]
    SourceExhausted,
    #[error("line {line}: {value:?} is not a number")]
    Parse { line: usize, value: String },
    #[error("sample source I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
