//! Project vault
//!
//! One newest-first list of [`ProjectRecord`]s stored as a JSON array under a
//! single key. Every mutation is a whole-list read-modify-write under the
//! vault lock; mutations that change the list publish
//! [`StudioEvent::HistoryUpdated`].

use crate::error::VaultError;
use crate::recency::{filter_records, group_by_recency, RecencyGroups};
use crate::storage::KeyValueStore;
use chrono::{DateTime, TimeZone};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use studio_core::{
    Clock, EventBus, ProjectRecord, StudioEvent, SystemClock, ToolId, VaultConfig, DAY_MS,
    HISTORY_KEY,
};
use uuid::Uuid;

/// Longest generated title, in characters, before the ellipsis
pub const MAX_TITLE_CHARS: usize = 80;

/// Asks the user to approve a destructive action
pub trait Confirmer: Send + Sync {
    /// True to proceed
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirmer for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Confirmer that approves everything (`--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirmer for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Result of a destructive operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Records were removed
    Removed(usize),
    /// The user declined
    Cancelled,
    /// Nothing matched; no confirmation was asked
    Nothing,
}

/// Result of a merge import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Records prepended to the vault
    pub added: usize,
    /// Incoming records whose id already existed
    pub skipped: usize,
}

/// Durable project history
pub struct ProjectVault {
    store: Arc<dyn KeyValueStore>,
    key: String,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    retention_ms: i64,
    lock: Mutex<()>,
}

impl std::fmt::Debug for ProjectVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectVault")
            .field("store", &self.store)
            .field("key", &self.key)
            .field("retention_ms", &self.retention_ms)
            .finish_non_exhaustive()
    }
}

impl ProjectVault {
    /// Create a vault over `store` with default key and retention
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, bus: EventBus) -> Self {
        Self {
            store,
            key: HISTORY_KEY.to_string(),
            bus,
            clock: Arc::new(SystemClock),
            retention_ms: VaultConfig::default().retention_ms(),
            lock: Mutex::new(()),
        }
    }

    /// Use a different storage key
    #[inline]
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Use `clock` for timestamps and expiry
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Apply retention from config
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: &VaultConfig) -> Self {
        self.retention_ms = config.retention_ms();
        self
    }

    /// Retain records for `days`
    #[inline]
    #[must_use]
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_ms = i64::from(days) * DAY_MS;
        self
    }

    /// Event bus the vault publishes on
    #[inline]
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Storage key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    // Callers must hold `self.lock`.
    fn read_list(&self) -> Result<Vec<ProjectRecord>, VaultError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Vec<ProjectRecord>>(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!("History under {} is malformed, treating as empty: {}", self.key, e);
                Ok(Vec::new())
            }
        }
    }

    // Callers must hold `self.lock`.
    fn write_list(&self, records: &[ProjectRecord]) -> Result<(), VaultError> {
        let json = serde_json::to_string(records).map_err(VaultError::Serialize)?;
        self.store.set(&self.key, &json)?;
        Ok(())
    }

    fn notify(&self) {
        self.bus.publish(StudioEvent::HistoryUpdated);
    }

    /// Snapshot `data` as a new record, prepended to the history
    ///
    /// # Errors
    /// Returns `VaultError::Storage` if the list cannot be persisted.
    pub fn save(
        &self,
        tool: &ToolId,
        category: &str,
        title_hint: &str,
        data: serde_json::Value,
    ) -> Result<ProjectRecord, VaultError> {
        let record = ProjectRecord::new(
            tool.clone(),
            category,
            derive_title(tool, title_hint),
            data,
            self.clock.now_ms(),
        );
        {
            let _guard = self.lock.lock();
            let mut records = self.read_list()?;
            records.insert(0, record.clone());
            self.write_list(&records)?;
        }
        tracing::info!("Saved project {} for {}", record.id, record.tool);
        self.notify();
        Ok(record)
    }

    /// Every record, newest first
    ///
    /// # Errors
    /// Returns `VaultError::Storage` on backend failure.
    pub fn list(&self) -> Result<Vec<ProjectRecord>, VaultError> {
        let _guard = self.lock.lock();
        self.read_list()
    }

    /// Record with `id`
    ///
    /// # Errors
    /// Returns `VaultError::Storage` on backend failure.
    pub fn get(&self, id: Uuid) -> Result<Option<ProjectRecord>, VaultError> {
        Ok(self.list()?.into_iter().find(|record| record.id == id))
    }

    /// Number of records
    ///
    /// # Errors
    /// Returns `VaultError::Storage` on backend failure.
    pub fn len(&self) -> Result<usize, VaultError> {
        Ok(self.list()?.len())
    }

    /// True when the history is empty
    ///
    /// # Errors
    /// Returns `VaultError::Storage` on backend failure.
    pub fn is_empty(&self) -> Result<bool, VaultError> {
        Ok(self.len()? == 0)
    }

    /// Remove one record after confirmation
    ///
    /// # Errors
    /// Returns `VaultError::Storage` on backend failure.
    pub fn delete(&self, id: Uuid, confirmer: &dyn Confirmer) -> Result<Removal, VaultError> {
        let title = match self.get(id)? {
            Some(record) => record.title,
            None => return Ok(Removal::Nothing),
        };
        if !confirmer.confirm(&format!("Delete \"{title}\"? This cannot be undone.")) {
            return Ok(Removal::Cancelled);
        }
        let removed = {
            let _guard = self.lock.lock();
            let mut records = self.read_list()?;
            let before = records.len();
            records.retain(|record| record.id != id);
            let removed = before - records.len();
            if removed > 0 {
                self.write_list(&records)?;
            }
            removed
        };
        if removed == 0 {
            return Ok(Removal::Nothing);
        }
        tracing::info!("Deleted project {}", id);
        self.notify();
        Ok(Removal::Removed(removed))
    }

    /// Remove every record after confirmation; an empty vault is left
    /// untouched without asking
    ///
    /// # Errors
    /// Returns `VaultError::Storage` on backend failure.
    pub fn delete_all(&self, confirmer: &dyn Confirmer) -> Result<Removal, VaultError> {
        let count = self.len()?;
        if count == 0 {
            return Ok(Removal::Nothing);
        }
        if !confirmer.confirm(&format!("Delete all {count} saved projects? This cannot be undone.")) {
            return Ok(Removal::Cancelled);
        }
        let removed = {
            let _guard = self.lock.lock();
            let removed = self.read_list()?.len();
            self.write_list(&[])?;
            removed
        };
        tracing::info!("Cleared {} projects", removed);
        self.notify();
        Ok(Removal::Removed(removed))
    }

    /// Full history as a pretty JSON array
    ///
    /// # Errors
    /// Returns `VaultError::Storage` on backend failure.
    pub fn export_all(&self) -> Result<String, VaultError> {
        let records = self.list()?;
        serde_json::to_string_pretty(&records).map_err(VaultError::Serialize)
    }

    /// Write [`ProjectVault::export_all`] to `path`; returns the record count
    ///
    /// # Errors
    /// Returns `VaultError::File` if the file cannot be written.
    pub fn export_to_file(&self, path: &Path) -> Result<usize, VaultError> {
        let records = self.list()?;
        let json = serde_json::to_string_pretty(&records).map_err(VaultError::Serialize)?;
        std::fs::write(path, json).map_err(|source| VaultError::File {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(records.len())
    }

    /// Merge `incoming` by id.
    ///
    /// Records whose id already exists are dropped; the rest are prepended in
    /// their incoming order. Duplicate ids inside `incoming` keep the first.
    ///
    /// # Errors
    /// Returns `VaultError::Storage` on backend failure.
    pub fn import_merge(&self, incoming: Vec<ProjectRecord>) -> Result<ImportSummary, VaultError> {
        let summary = {
            let _guard = self.lock.lock();
            let existing = self.read_list()?;
            let mut seen: HashSet<Uuid> = existing.iter().map(|record| record.id).collect();
            let total = incoming.len();
            let mut merged: Vec<ProjectRecord> = incoming
                .into_iter()
                .filter(|record| seen.insert(record.id))
                .collect();
            let summary = ImportSummary {
                added: merged.len(),
                skipped: total - merged.len(),
            };
            if summary.added > 0 {
                merged.extend(existing);
                self.write_list(&merged)?;
            }
            summary
        };
        tracing::info!(
            "Imported {} projects, skipped {} already present",
            summary.added,
            summary.skipped
        );
        if summary.added > 0 {
            self.notify();
        }
        Ok(summary)
    }

    /// Parse an export file body and merge it
    ///
    /// # Errors
    /// Returns `VaultError::InvalidImport` if `json` is not an array of records.
    pub fn import_json(&self, json: &str) -> Result<ImportSummary, VaultError> {
        let incoming: Vec<ProjectRecord> =
            serde_json::from_str(json).map_err(VaultError::InvalidImport)?;
        self.import_merge(incoming)
    }

    /// Read `path` and merge it
    ///
    /// # Errors
    /// Returns `VaultError::File` if the file cannot be read, or
    /// `VaultError::InvalidImport` for malformed content.
    pub fn import_from_file(&self, path: &Path) -> Result<ImportSummary, VaultError> {
        let json = std::fs::read_to_string(path).map_err(|source| VaultError::File {
            path: path.to_path_buf(),
            source,
        })?;
        self.import_json(&json)
    }

    /// Remove records at or past the retention age; returns the count removed
    ///
    /// # Errors
    /// Returns `VaultError::Storage` on backend failure.
    pub fn expiry_sweep(&self) -> Result<usize, VaultError> {
        let now = self.clock.now_ms();
        let removed = {
            let _guard = self.lock.lock();
            let mut records = self.read_list()?;
            let before = records.len();
            records.retain(|record| record.age_ms(now) < self.retention_ms);
            let removed = before - records.len();
            if removed > 0 {
                self.write_list(&records)?;
            }
            removed
        };
        if removed > 0 {
            tracing::info!("Expired {} projects", removed);
            self.notify();
        } else {
            tracing::debug!("Expiry sweep found nothing to remove");
        }
        Ok(removed)
    }

    /// Records whose title or tool contains `query`, case-insensitively
    ///
    /// # Errors
    /// Returns `VaultError::Storage` on backend failure.
    pub fn search(&self, query: &str) -> Result<Vec<ProjectRecord>, VaultError> {
        Ok(filter_records(&self.list()?, query))
    }

    /// Current history grouped by calendar day in `now`'s time zone
    ///
    /// # Errors
    /// Returns `VaultError::Storage` on backend failure.
    pub fn grouped<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<RecencyGroups, VaultError> {
        Ok(group_by_recency(&self.list()?, now))
    }
}

/// Display title for a new record
#[must_use]
pub fn derive_title(tool: &ToolId, hint: &str) -> String {
    let hint = hint.trim();
    if hint.is_empty() {
        return format!("Untitled {tool}");
    }
    if hint.chars().count() <= MAX_TITLE_CHARS {
        return hint.to_string();
    }
    let cut: String = hint.chars().take(MAX_TITLE_CHARS).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use studio_core::ManualClock;

    const NOW: i64 = 1_780_000_000_000;

    fn vault() -> (ProjectVault, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::at_millis(NOW));
        let vault = ProjectVault::new(store.clone(), EventBus::default()).with_clock(clock.clone());
        (vault, store, clock)
    }

    fn story() -> ToolId {
        ToolId::new("storygen-kh")
    }

    #[test]
    fn save_prepends_newest_first() {
        let (vault, _, clock) = vault();
        let first = vault.save(&story(), "story", "one", serde_json::json!({})).unwrap();
        clock.advance_ms(10);
        let second = vault.save(&story(), "story", "two", serde_json::json!({})).unwrap();
        let ids: Vec<_> = vault.list().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(second.timestamp, NOW + 10);
    }

    #[test]
    fn titles_are_derived() {
        assert_eq!(derive_title(&story(), "  "), "Untitled storygen-kh");
        assert_eq!(derive_title(&story(), " Harbour "), "Harbour");
        let long = "é".repeat(100);
        let title = derive_title(&story(), &long);
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS + 3);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn malformed_history_reads_as_empty() {
        let (vault, store, _) = vault();
        store.set(HISTORY_KEY, "{not json").unwrap();
        assert!(vault.list().unwrap().is_empty());
        vault.save(&story(), "story", "fresh", serde_json::Value::Null).unwrap();
        assert_eq!(vault.len().unwrap(), 1);
    }

    #[test]
    fn delete_asks_and_respects_answer() {
        let (vault, _, _) = vault();
        let record = vault.save(&story(), "story", "keep me", serde_json::Value::Null).unwrap();

        let decline = |_: &str| false;
        assert_eq!(vault.delete(record.id, &decline).unwrap(), Removal::Cancelled);
        assert_eq!(vault.len().unwrap(), 1);

        assert_eq!(vault.delete(record.id, &AlwaysConfirm).unwrap(), Removal::Removed(1));
        assert!(vault.is_empty().unwrap());
        assert_eq!(vault.delete(record.id, &AlwaysConfirm).unwrap(), Removal::Nothing);
    }

    #[test]
    fn delete_all_on_empty_vault_does_not_prompt() {
        let (vault, _, _) = vault();
        let never = |_: &str| -> bool { panic!("must not prompt") };
        assert_eq!(vault.delete_all(&never).unwrap(), Removal::Nothing);
        assert!(vault.list().unwrap().is_empty());
    }

    #[test]
    fn sweep_uses_retention_boundary() {
        let (vault, _, _) = vault();
        let vault = vault.with_retention_days(30);
        let at = |ts: i64, title: &str| {
            ProjectRecord::new(story(), "story", title, serde_json::Value::Null, ts)
        };
        let old = at(NOW - 30 * DAY_MS, "old");
        let fresh = at(NOW - 30 * DAY_MS + 1, "fresh");
        vault.import_merge(vec![old, fresh.clone()]).unwrap();
        assert_eq!(vault.expiry_sweep().unwrap(), 1);
        assert_eq!(vault.list().unwrap(), vec![fresh]);
    }

    #[tokio::test]
    async fn only_changing_mutations_broadcast() {
        let (vault, _, _) = vault();
        let mut rx = vault.bus().subscribe();
        assert_eq!(vault.expiry_sweep().unwrap(), 0);
        vault.save(&story(), "story", "x", serde_json::Value::Null).unwrap();
        assert!(matches!(rx.recv().await.unwrap(), StudioEvent::HistoryUpdated));
        assert!(rx.try_recv().is_err());
    }
}
