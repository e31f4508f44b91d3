//! Studio shell
//!
//! Owns the event bus and the vault, tracks which panel is active and turns
//! user actions into addressed events:
//! - "save" becomes `RequestSave { tool: active }`
//! - "open" becomes `LoadProject(record)` and activates the record's tool

use crate::error::SessionError;
use chrono::{DateTime, TimeZone};
use parking_lot::RwLock;
use std::sync::Arc;
use studio_core::{EventBus, ProjectRecord, StudioEvent, ToolId};
use studio_vault::{ProjectVault, RecencyGroups};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Application shell
#[derive(Debug)]
pub struct Studio {
    vault: Arc<ProjectVault>,
    active: RwLock<Option<ToolId>>,
}

impl Studio {
    /// Start the shell: runs the expiry sweep once.
    ///
    /// # Errors
    /// Returns `SessionError::Vault` if the sweep cannot read or write history.
    pub fn start(vault: Arc<ProjectVault>) -> Result<Self, SessionError> {
        let expired = vault.expiry_sweep()?;
        tracing::info!("Studio started, {} expired projects removed", expired);
        Ok(Self {
            vault,
            active: RwLock::new(None),
        })
    }

    /// Shared vault
    #[inline]
    #[must_use]
    pub fn vault(&self) -> &Arc<ProjectVault> {
        &self.vault
    }

    /// Shared event bus
    #[inline]
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        self.vault.bus()
    }

    /// Subscribe to studio events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.bus().subscribe()
    }

    /// Make `tool` the active panel
    pub fn activate(&self, tool: ToolId) {
        tracing::debug!("Active panel: {}", tool);
        *self.active.write() = Some(tool);
    }

    /// Active panel, if any
    #[must_use]
    pub fn active(&self) -> Option<ToolId> {
        self.active.read().clone()
    }

    /// Ask the active panel to save itself; returns the addressed tool
    pub fn request_save(&self) -> Option<ToolId> {
        let tool = self.active()?;
        self.bus().publish(StudioEvent::RequestSave { tool: tool.clone() });
        Some(tool)
    }

    /// Deliver `record` to its panel and activate it
    pub fn open(&self, record: ProjectRecord) {
        self.activate(record.tool.clone());
        self.bus().publish(StudioEvent::LoadProject(Arc::new(record)));
    }

    /// Open the record with `id`; returns it if it exists
    ///
    /// # Errors
    /// Returns `SessionError::Vault` on storage failure.
    pub fn open_by_id(&self, id: Uuid) -> Result<Option<ProjectRecord>, SessionError> {
        let Some(record) = self.vault.get(id)? else {
            return Ok(None);
        };
        self.open(record.clone());
        Ok(Some(record))
    }

    /// History matching `query`, grouped by day in `now`'s time zone
    ///
    /// # Errors
    /// Returns `SessionError::Vault` on storage failure.
    pub fn history<Tz: TimeZone>(
        &self,
        query: &str,
        now: &DateTime<Tz>,
    ) -> Result<RecencyGroups, SessionError> {
        let matching = self.vault.search(query)?;
        Ok(studio_vault::group_by_recency(&matching, now))
    }
}
