//! In-memory blob store backing `blob:` urls
//!
//! Video clips and wrapped speech are binary payloads; slots only hold a
//! `blob:<uuid>` handle that resolves through this store. Entries are evicted
//! LRU once the capacity is reached.

use moka::future::Cache;
use std::sync::Arc;
use uuid::Uuid;

/// Url scheme of stored blobs
pub const BLOB_SCHEME: &str = "blob:";

/// Binary payload with its media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBlob {
    /// MIME type, e.g. `audio/wav`
    pub mime: String,
    /// Raw bytes
    pub bytes: Vec<u8>,
}

impl AssetBlob {
    /// Create a blob
    #[inline]
    #[must_use]
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }
}

/// Bounded blob cache
#[derive(Debug, Clone)]
pub struct BlobStore {
    inner: Cache<String, Arc<AssetBlob>>,
}

impl BlobStore {
    /// Create a store holding at most `max_capacity` blobs
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Store a blob and return its url
    pub async fn insert(&self, blob: AssetBlob) -> String {
        let url = format!("{BLOB_SCHEME}{}", Uuid::new_v4());
        tracing::debug!("Storing {} blob of {} bytes at {}", blob.mime, blob.bytes.len(), url);
        self.inner.insert(url.clone(), Arc::new(blob)).await;
        url
    }

    /// Resolve a blob url
    #[inline]
    #[must_use]
    pub async fn get(&self, url: &str) -> Option<Arc<AssetBlob>> {
        self.inner.get(url).await
    }

    /// Drop a blob; unknown urls are ignored
    #[inline]
    pub async fn revoke(&self, url: &str) {
        self.inner.invalidate(url).await;
    }

    /// Drop every blob
    #[inline]
    pub fn revoke_all(&self) {
        self.inner.invalidate_all();
    }

    /// Number of stored blobs after pending maintenance has run
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

impl Default for BlobStore {
    fn default() -> Self {
        Self::new(512)
    }
}

/// True if `url` points into a [`BlobStore`]
#[inline]
#[must_use]
pub fn is_blob_url(url: &str) -> bool {
    url.starts_with(BLOB_SCHEME)
}
