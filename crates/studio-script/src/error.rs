//! Error types for script generation

use studio_core::{Epoch, Scene, ServiceError, ValidationError};

/// Why a model reply could not be turned into scenes
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    /// Reply is not JSON of the expected shape
    #[error("reply is not a scene list: {0}")]
    Json(#[from] serde_json::Error),

    /// Reply contained no scenes
    #[error("reply contained no scenes")]
    Empty,

    /// A scene has no action text
    #[error("scene at position {position} has no action")]
    MissingAction { position: usize },
}

/// Failure of a single batch
#[derive(Debug, thiserror::Error)]
pub enum BatchFailure {
    /// Service call failed
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Service answered with unusable data
    #[error(transparent)]
    Reply(#[from] ReplyError),
}

/// Main script generation error
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Input rejected before calling the service
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A batch failed; scenes from earlier batches are kept in `partial`
    #[error("generation failed at batch {batch} of {total_batches}: {source}")]
    BatchFailed {
        /// 1-based batch number
        batch: usize,
        /// Planned batches
        total_batches: usize,
        /// Underlying failure
        #[source]
        source: BatchFailure,
        /// Scenes accumulated before the failure
        partial: Vec<Scene>,
    },

    /// A newer run started before this one finished
    #[error("run {0} was superseded by a newer run")]
    Superseded(Epoch),
}

impl ScriptError {
    /// True for input errors
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// True when the user may simply run again: the service failed, not the input
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BatchFailed {
                source: BatchFailure::Service(_),
                ..
            }
        )
    }

    /// Scenes that survived a failed run
    #[must_use]
    pub fn partial_scenes(&self) -> &[Scene] {
        match self {
            Self::BatchFailed { partial, .. } => partial,
            _ => &[],
        }
    }
}
