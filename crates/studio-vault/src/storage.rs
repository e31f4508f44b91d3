//! Key-value string stores backing the vault
//!
//! Backends:
//! - [`MemoryStore`]: process-local, for tests and ephemeral sessions
//! - [`FileStore`]: one file per key, replaced atomically via temp + rename
//! - `SledStore`: embedded sled tree (feature `sled`)

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use studio_core::{StorageBackend, StorageConfig, StorageError};

/// String store addressed by key; no transactions
pub trait KeyValueStore: Send + Sync + Debug {
    /// Value under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key`
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`; missing keys are ignored
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Directory of `<key>.json` files
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating it if needed
    ///
    /// # Errors
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::Backend(format!("invalid key {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Embedded sled database
#[cfg(feature = "sled")]
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
}

#[cfg(feature = "sled")]
impl SledStore {
    /// Open or create a database at `path`
    ///
    /// # Errors
    /// Returns `StorageError::Backend` if sled cannot open the path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(sled_error)?;
        Ok(Self { db })
    }
}

#[cfg(feature = "sled")]
fn sled_error(err: sled::Error) -> StorageError {
    StorageError::Backend(format!("sled: {err}"))
}

#[cfg(feature = "sled")]
impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let Some(raw) = self.db.get(key.as_bytes()).map_err(sled_error)? else {
            return Ok(None);
        };
        String::from_utf8(raw.to_vec())
            .map(Some)
            .map_err(|e| StorageError::Backend(format!("non-utf8 value under {key}: {e}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(sled_error)?;
        self.db.flush().map_err(sled_error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.db.remove(key.as_bytes()).map_err(sled_error)?;
        Ok(())
    }
}

/// Open the backend selected in `config`
///
/// # Errors
/// Returns `StorageError` if the backend cannot be opened, or
/// `StorageError::Backend` when sled is selected without the `sled` feature.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, StorageError> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::File => Ok(Arc::new(FileStore::open(&config.data_dir)?)),
        #[cfg(feature = "sled")]
        StorageBackend::Sled => Ok(Arc::new(SledStore::open(config.data_dir.join("vault.sled"))?)),
        #[cfg(not(feature = "sled"))]
        StorageBackend::Sled => Err(StorageError::Backend(
            "sled backend requires the `sled` feature".to_string(),
        )),
    }
}
