//! Error types for panel sessions

use studio_assets::AssetError;
use studio_core::ValidationError;
use studio_script::ScriptError;
use studio_vault::VaultError;

/// Panel operation error
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Input rejected before any service call
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Script generation failed or was superseded
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Asset request could not be issued
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Vault read or write failed
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Saved blob is not a session snapshot
    #[error("invalid session snapshot: {0}")]
    InvalidSnapshot(String),
}

impl SessionError {
    /// True for input errors shown inline rather than as notifications
    #[must_use]
    pub fn is_validation(&self) -> bool {
        match self {
            SessionError::Validation(_) => true,
            SessionError::Script(e) => e.is_validation(),
            SessionError::Asset(AssetError::Validation(_)) => true,
            _ => false,
        }
    }

    /// True if a newer run replaced the one that produced this error
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        matches!(self, SessionError::Script(ScriptError::Superseded(_)))
    }
}
