//! Studio Vault - saved project history
//!
//! Provides:
//! - [`ProjectVault`]: save, list, delete, export, merge import and expiry
//! - [`KeyValueStore`] backends: memory, file and (feature `sled`) sled
//! - Search and Today / Yesterday / Older grouping
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use studio_core::{EventBus, ToolId};
//! use studio_vault::{MemoryStore, ProjectVault};
//!
//! let vault = ProjectVault::new(Arc::new(MemoryStore::new()), EventBus::default());
//! let record = vault
//!     .save(&ToolId::new("storygen-kh"), "story", "Harbour at dawn", serde_json::json!({}))
//!     .unwrap();
//! assert_eq!(vault.list().unwrap()[0].id, record.id);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod recency;
pub mod storage;
pub mod vault;

pub use error::VaultError;
pub use recency::{filter_records, group_by_recency, matches_query, RecencyGroups};
#[cfg(feature = "sled")]
pub use storage::SledStore;
pub use storage::{open_store, FileStore, KeyValueStore, MemoryStore};
pub use vault::{
    derive_title, AlwaysConfirm, Confirmer, ImportSummary, ProjectVault, Removal, MAX_TITLE_CHARS,
};
