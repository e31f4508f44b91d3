//! Error types for the project vault

use std::path::PathBuf;
use studio_core::StorageError;

/// Vault operation error
///
/// Malformed history under the storage key is not an error: it is logged and
/// read as an empty list.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Backend read or write failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Records could not be serialized
    #[error("cannot serialize history: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Import payload is not a JSON array of records
    #[error("invalid import file: {0}")]
    InvalidImport(#[source] serde_json::Error),

    /// Import or export file could not be accessed
    #[error("cannot access {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VaultError {
    /// True if the caller supplied bad input rather than the backend failing
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, VaultError::InvalidImport(_))
    }
}
