//! Studio configuration
//!
//! Loaded from `studio.toml` when present, then overridden by environment:
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | STUDIO_DATA_DIR | `<data_local_dir>/media-studio` | Directory for file and sled backends |
//! | STUDIO_STORAGE_BACKEND | file | `memory` \| `file` \| `sled` |
//! | STUDIO_STORAGE_KEY | global_project_history | Key holding the project list |
//! | STUDIO_BATCH_DELAY_MS | 1500 | Pause between script batches |
//! | STUDIO_MAX_SCENES | 100 | Upper clamp for requested scene counts (max 500) |
//! | STUDIO_RETENTION_DAYS | 30 | Age at which saved projects expire |

use crate::clock::DAY_MS;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Shared key holding the serialized project list
pub const HISTORY_KEY: &str = "global_project_history";

/// Default project retention
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Default pause between script batches
pub const DEFAULT_BATCH_DELAY_MS: u64 = 1500;

/// Hard ceiling for any panel's scene count
pub const ABSOLUTE_MAX_SCENES: u32 = 500;

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "studio.toml";

/// Default application data directory
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("media-studio")
}

/// Key-value backend used for the vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory only
    Memory,
    /// One JSON file per key
    #[default]
    File,
    /// Embedded sled database
    Sled,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "sled" => Ok(Self::Sled),
            other => Err(ConfigError::Invalid(format!(
                "unknown storage backend {other:?}"
            ))),
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for on-disk backends
    pub data_dir: PathBuf,
    /// Key holding the project list
    pub history_key: String,
    /// Backend kind
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            history_key: HISTORY_KEY.to_string(),
            backend: StorageBackend::default(),
        }
    }
}

/// Script generation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Pause between batches in milliseconds
    pub batch_delay_ms: u64,
    /// Lower clamp for requested scene counts
    pub min_scenes: u32,
    /// Upper clamp for requested scene counts
    pub max_scenes: u32,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
            min_scenes: 1,
            max_scenes: 100,
        }
    }
}

/// Asset generation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Max number of binary blobs kept in memory
    pub blob_capacity: u64,
    /// Sample rate of PCM speech returned by the service
    pub voice_sample_rate: u32,
    /// Channel count of PCM speech returned by the service
    pub voice_channels: u16,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            blob_capacity: 512,
            voice_sample_rate: 24_000,
            voice_channels: 1,
        }
    }
}

/// Vault settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Age at which records are swept
    pub retention_days: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl VaultConfig {
    /// Retention window in milliseconds
    #[inline]
    #[must_use]
    pub fn retention_ms(&self) -> i64 {
        i64::from(self.retention_days) * DAY_MS
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Persistence
    pub storage: StorageConfig,
    /// Script generation
    pub script: ScriptConfig,
    /// Asset generation
    pub assets: AssetConfig,
    /// Vault
    pub vault: VaultConfig,
}

impl StudioConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With data directory
    #[inline]
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.data_dir = dir.into();
        self
    }

    /// With storage backend
    #[inline]
    #[must_use]
    pub fn with_backend(mut self, backend: StorageBackend) -> Self {
        self.storage.backend = backend;
        self
    }

    /// With pause between script batches
    #[inline]
    #[must_use]
    pub fn with_batch_delay_ms(mut self, delay_ms: u64) -> Self {
        self.script.batch_delay_ms = delay_ms;
        self
    }

    /// With retention window
    #[inline]
    #[must_use]
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.vault.retention_days = days;
        self
    }

    /// Parse from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: StudioConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load configuration: explicit file, else `studio.toml` if present, else
    /// defaults; then apply `STUDIO_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        tracing::debug!(backend = ?config.storage.backend, data_dir = %config.storage.data_dir.display(), "configuration loaded");
        Ok(config)
    }

    /// Apply `STUDIO_*` overrides from an arbitrary lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(dir) = get("STUDIO_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = get("STUDIO_STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(key) = get("STUDIO_STORAGE_KEY") {
            self.storage.history_key = key;
        }
        if let Some(delay) = get("STUDIO_BATCH_DELAY_MS") {
            self.script.batch_delay_ms = parse_number("STUDIO_BATCH_DELAY_MS", &delay)?;
        }
        if let Some(max) = get("STUDIO_MAX_SCENES") {
            self.script.max_scenes = parse_number("STUDIO_MAX_SCENES", &max)?;
        }
        if let Some(days) = get("STUDIO_RETENTION_DAYS") {
            self.vault.retention_days = parse_number("STUDIO_RETENTION_DAYS", &days)?;
        }
        self.validate()
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.script.min_scenes == 0 {
            return Err(ConfigError::Invalid("script.min_scenes must be >= 1".into()));
        }
        if self.script.max_scenes < self.script.min_scenes {
            return Err(ConfigError::Invalid(
                "script.max_scenes must be >= script.min_scenes".into(),
            ));
        }
        if self.script.max_scenes > ABSOLUTE_MAX_SCENES {
            return Err(ConfigError::Invalid(format!(
                "script.max_scenes must be <= {ABSOLUTE_MAX_SCENES}"
            )));
        }
        if self.vault.retention_days == 0 {
            return Err(ConfigError::Invalid("vault.retention_days must be >= 1".into()));
        }
        if self.storage.history_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.history_key must not be empty".into()));
        }
        if self.assets.voice_channels == 0 || self.assets.voice_sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "assets.voice_channels and assets.voice_sample_rate must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{name}={value:?} is not a number")))
}
