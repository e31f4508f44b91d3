//! Error types for asset orchestration

use studio_core::ValidationError;

/// Asset request error
///
/// Service failures are not errors at this level: they are recorded in the
/// slot and reported through [`crate::RequestOutcome::Failed`].
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// Request does not address a valid scene or slot
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Background request task panicked or was aborted
    #[error("asset task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for AssetError {
    fn from(err: tokio::task::JoinError) -> Self {
        AssetError::Task(err.to_string())
    }
}

/// PCM to WAV conversion error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WavError {
    /// Zero channels or zero sample rate
    #[error("invalid pcm format: {channels} channels at {sample_rate} Hz")]
    InvalidFormat { channels: u16, sample_rate: u32 },

    /// No complete sample frame in the input
    #[error("pcm buffer holds no complete frame")]
    Empty,

    /// Data does not fit a RIFF chunk
    #[error("pcm buffer of {0} bytes is too large for a wav file")]
    TooLarge(usize),
}
