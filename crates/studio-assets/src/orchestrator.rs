//! On-demand asset orchestration
//!
//! One request per `(scene, kind)` slot:
//! 1. Refuse while the slot is already loading
//! 2. Check cross-slot prerequisites (video needs the scene's image)
//! 3. Build a prompt from the scene's continuity context and the panel style
//! 4. Call the asset service and store the url, or record the error
//!
//! Binary results (video clips, speech) are kept in the [`BlobStore`] and
//! exposed as `blob:` urls.

use crate::blob::{is_blob_url, AssetBlob, BlobStore};
use crate::cache::{AssetCache, SlotTicket};
use crate::error::AssetError;
use crate::prompt::synthesize_prompt;
use crate::service::{AssetService, StyleProfile};
use crate::wav::{is_wav, pcm_to_wav, PcmFormat};
use parking_lot::RwLock;
use std::sync::Arc;
use studio_core::{AssetConfig, AssetKind, AssetMedia, Epoch, Scene, SlotKey, ValidationError};
use tokio::task::JoinHandle;

const VIDEO_MIME: &str = "video/mp4";
const WAV_MIME: &str = "audio/wav";

/// Result of one asset request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Asset produced and stored in the slot
    Completed { url: String },
    /// A request for the slot was already in flight; nothing was done
    AlreadyLoading,
    /// The slot consumes another slot's output that does not exist yet
    MissingPrerequisite { needs: AssetKind },
    /// Service failed; the message is stored in the slot
    Failed { message: String },
    /// The cache was cleared while the request ran; the result was dropped
    Discarded,
}

impl RequestOutcome {
    /// True if the slot now holds a fresh url
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, RequestOutcome::Completed { .. })
    }
}

/// Drives asset requests against one [`AssetCache`]
pub struct SceneAssetOrchestrator {
    cache: Arc<AssetCache>,
    blobs: BlobStore,
    service: Arc<dyn AssetService>,
    style: RwLock<StyleProfile>,
    pcm: PcmFormat,
}

impl std::fmt::Debug for SceneAssetOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneAssetOrchestrator")
            .field("slots", &self.cache.len())
            .field("epoch", &self.cache.epoch())
            .field("pcm", &self.pcm)
            .finish_non_exhaustive()
    }
}

impl SceneAssetOrchestrator {
    /// Create an orchestrator with an empty cache
    #[must_use]
    pub fn new(service: Arc<dyn AssetService>, config: &AssetConfig) -> Self {
        Self {
            cache: Arc::new(AssetCache::new()),
            blobs: BlobStore::new(config.blob_capacity),
            service,
            style: RwLock::new(StyleProfile::default()),
            pcm: PcmFormat::new(config.voice_sample_rate, config.voice_channels),
        }
    }

    /// Use the given style for subsequent prompts
    #[inline]
    #[must_use]
    pub fn with_style(mut self, style: StyleProfile) -> Self {
        *self.style.get_mut() = style;
        self
    }

    /// Replace the style for subsequent prompts
    pub fn set_style(&self, style: StyleProfile) {
        *self.style.write() = style;
    }

    /// Current style
    #[must_use]
    pub fn style(&self) -> StyleProfile {
        self.style.read().clone()
    }

    /// Slot cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.cache
    }

    /// Blob store behind `blob:` urls
    #[inline]
    #[must_use]
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Drop every slot and blob; in-flight results are discarded
    pub fn clear(&self) -> Epoch {
        let epoch = self.cache.clear();
        self.blobs.revoke_all();
        tracing::debug!("Asset cache cleared, now at epoch {}", epoch);
        epoch
    }

    /// Request the `kind` asset for `scenes[scene_index]`.
    ///
    /// The request is tagged with the cache epoch current on entry.
    ///
    /// # Errors
    /// Returns `ValidationError::SceneOutOfRange` for an unknown scene.
    pub async fn request_asset(
        &self,
        scenes: &[Scene],
        scene_index: usize,
        kind: AssetKind,
    ) -> Result<RequestOutcome, AssetError> {
        let issued = self.cache.epoch();
        self.request_asset_at(issued, scenes, scene_index, kind).await
    }

    /// Request an asset on behalf of a caller that read `scenes` at `issued`.
    ///
    /// Callers read the epoch before reading their scene list; if the cache
    /// was cleared in between the request is [`RequestOutcome::Discarded`].
    ///
    /// # Errors
    /// Returns `ValidationError::SceneOutOfRange` for an unknown scene.
    pub async fn request_asset_at(
        &self,
        issued: Epoch,
        scenes: &[Scene],
        scene_index: usize,
        kind: AssetKind,
    ) -> Result<RequestOutcome, AssetError> {
        let scene = scene_at(scenes, scene_index)?;
        Ok(self.request_for_scene(issued, scene_index, scene, kind).await)
    }

    /// Run a request on the tokio runtime without blocking the caller.
    ///
    /// The epoch is captured here, not when the task first runs.
    ///
    /// # Errors
    /// Returns `ValidationError::SceneOutOfRange` for an unknown scene.
    pub fn spawn_request(
        self: &Arc<Self>,
        scenes: &[Scene],
        scene_index: usize,
        kind: AssetKind,
    ) -> Result<JoinHandle<RequestOutcome>, AssetError> {
        let issued = self.cache.epoch();
        let scene = scene_at(scenes, scene_index)?.clone();
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move {
            this.request_for_scene(issued, scene_index, &scene, kind).await
        }))
    }

    /// Wait for a spawned request
    ///
    /// # Errors
    /// Returns `AssetError::Task` if the task panicked or was aborted.
    pub async fn join_request(
        handle: JoinHandle<RequestOutcome>,
    ) -> Result<RequestOutcome, AssetError> {
        Ok(handle.await?)
    }

    /// Request the `kind` asset for an already resolved scene issued at `issued`
    pub async fn request_for_scene(
        &self,
        issued: Epoch,
        scene_index: usize,
        scene: &Scene,
        kind: AssetKind,
    ) -> RequestOutcome {
        let key = SlotKey::new(scene_index, kind.clone());
        if self.cache.epoch() != issued {
            tracing::debug!("Slot {} request predates epoch {}", key, self.cache.epoch());
            return RequestOutcome::Discarded;
        }

        let source_url = match kind.prerequisite() {
            Some(needs) => match self.cache.url(&SlotKey::new(scene_index, needs.clone())) {
                Some(url) => Some(url),
                None => {
                    tracing::debug!("Slot {} needs a {} first", key, needs);
                    return RequestOutcome::MissingPrerequisite { needs };
                }
            },
            None => None,
        };

        let Some(ticket) = self.cache.try_begin_at(&key, issued) else {
            if self.cache.epoch() != issued {
                return RequestOutcome::Discarded;
            }
            tracing::debug!("Slot {} already loading", key);
            return RequestOutcome::AlreadyLoading;
        };
        let previous = self.cache.url(&key);

        let style = self.style();
        let prompt = synthesize_prompt(scene, &kind, &style);
        tracing::debug!("Requesting asset for slot {}", key);

        let produced = match kind.media() {
            AssetMedia::Image => self
                .service
                .generate_image(&prompt, style.aspect)
                .await
                .map_err(|e| e.message().to_string()),
            AssetMedia::Video => {
                let image_url = source_url.unwrap_or_default();
                match self
                    .service
                    .generate_video(&prompt, &image_url, style.aspect)
                    .await
                {
                    Ok(bytes) => Ok(self.blobs.insert(AssetBlob::new(VIDEO_MIME, bytes)).await),
                    Err(e) => Err(e.message().to_string()),
                }
            }
            AssetMedia::Audio => {
                match self
                    .service
                    .generate_speech(&prompt, style.voice.as_deref())
                    .await
                {
                    Ok(bytes) => match self.wrap_speech(bytes) {
                        Ok(wav) => Ok(self.blobs.insert(AssetBlob::new(WAV_MIME, wav)).await),
                        Err(message) => Err(message),
                    },
                    Err(e) => Err(e.message().to_string()),
                }
            }
        };

        self.settle(&ticket, previous, produced).await
    }

    fn wrap_speech(&self, bytes: Vec<u8>) -> Result<Vec<u8>, String> {
        if is_wav(&bytes) {
            return Ok(bytes);
        }
        pcm_to_wav(&bytes, self.pcm).map_err(|e| e.to_string())
    }

    async fn settle(
        &self,
        ticket: &SlotTicket,
        previous: Option<String>,
        produced: Result<String, String>,
    ) -> RequestOutcome {
        match produced {
            Ok(url) => {
                if self.cache.complete(ticket, url.clone()) {
                    if let Some(old) = previous.filter(|old| is_blob_url(old) && *old != url) {
                        self.blobs.revoke(&old).await;
                    }
                    tracing::info!("Slot {} ready", ticket.key());
                    RequestOutcome::Completed { url }
                } else {
                    if is_blob_url(&url) {
                        self.blobs.revoke(&url).await;
                    }
                    RequestOutcome::Discarded
                }
            }
            Err(message) => {
                if self.cache.fail(ticket, message.clone()) {
                    tracing::warn!("Slot {} failed: {}", ticket.key(), message);
                    RequestOutcome::Failed { message }
                } else {
                    RequestOutcome::Discarded
                }
            }
        }
    }
}

fn scene_at(scenes: &[Scene], index: usize) -> Result<&Scene, ValidationError> {
    scenes.get(index).ok_or(ValidationError::SceneOutOfRange {
        index,
        len: scenes.len(),
    })
}
