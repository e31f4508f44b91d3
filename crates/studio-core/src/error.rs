//! Error types shared across the studio crates
//!
//! - Validation errors, rejected before any external call
//! - Opaque service failures from the generation backends
//! - Storage errors from key-value backends
//! - Configuration loading errors

use std::path::PathBuf;

/// Input rejected before any external call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Master prompt is empty or whitespace
    #[error("master prompt must not be empty")]
    EmptyPrompt,

    /// Scene index does not exist in the current script
    #[error("scene index {index} out of range (script has {len} scenes)")]
    SceneOutOfRange { index: usize, len: usize },

    /// Asset kind name is not usable
    #[error("invalid asset kind: {0:?}")]
    InvalidAssetKind(String),

    /// Panel does not offer the requested slot
    #[error("slot {0} is not offered by this panel")]
    UnsupportedSlot(String),

    /// Batch size of zero
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
}

/// Failure reported by an external generation service.
///
/// The message is opaque; it is shown to the user and never parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ServiceError {
    message: String,
}

impl ServiceError {
    /// Create a service error
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error message
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ServiceError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ServiceError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Key-value backend failure
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem failure
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Configuration loading failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid config value: {0}")]
    Invalid(String),
}
