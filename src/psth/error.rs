use thiserror::Error;

/// Rejected reconfiguration. The processor keeps its previous configuration
/// and state whenever one of these is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("trial length must be greater than zero")]
    ZeroTrialLength,
    #[error("trial length {requested} exceeds the maximum of {max} samples")]
    TrialLengthTooLong { requested: usize, max: usize },
    #[error("bin width must be greater than zero")]
    ZeroBinWidth,
    #[error("bin width {bin_width} is wider than the trial ({trial_length} samples)")]
    BinWiderThanTrial {
        bin_width: usize,
        trial_length: usize,
    },
    #[error("spike threshold must be a finite number")]
    NonFiniteThreshold,
    #[error("sample rate must be a finite number greater than zero")]
    InvalidSampleRate,
}
