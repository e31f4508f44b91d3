//! Studio Core - shared model for the media studio
//!
//! Provides the vocabulary every other studio crate speaks:
//! - Scenes, asset slots and project records
//! - Validation, service, storage and config errors
//! - The typed event bus connecting the shell, the vault and the panels
//! - Configuration and a testable clock
//!
//! # Example
//!
//! ```rust
//! use studio_core::{AssetKind, Scene, SlotKey};
//!
//! let scene = Scene::new(1, "A ship leaves port", "Foggy harbour, dawn light");
//! let key = SlotKey::new(0, AssetKind::Image);
//! assert_eq!(key.to_string(), "0:image");
//! assert_eq!(scene.scene_number, 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock, DAY_MS};
pub use config::{
    AssetConfig, ScriptConfig, StorageBackend, StorageConfig, StudioConfig, VaultConfig,
    HISTORY_KEY,
};
pub use error::{ConfigError, ServiceError, StorageError, ValidationError};
pub use events::{EventBus, Notification, NotificationLevel, StudioEvent};
pub use types::{
    AssetKind, AssetMedia, AssetSlot, Epoch, ProjectRecord, Scene, SlotKey, SlotSnapshot, ToolId,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
