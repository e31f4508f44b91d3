//! Studio Assets - per-scene asset slots
//!
//! Provides:
//! - [`AssetCache`]: concurrent `(scene, kind)` slot map with epoch guard
//! - [`SceneAssetOrchestrator`]: on-demand image, video and voice requests
//! - [`BlobStore`]: `blob:` urls for binary assets
//! - PCM to WAV wrapping for speech
//! - Text export of scripts
//!
//! # Example
//!
//! ```rust,ignore
//! use studio_assets::{RequestOutcome, SceneAssetOrchestrator};
//! use studio_core::AssetKind;
//!
//! let orchestrator = SceneAssetOrchestrator::new(service, &config.assets);
//! match orchestrator.request_asset(&scenes, 0, AssetKind::Image).await? {
//!     RequestOutcome::Completed { url } => println!("{url}"),
//!     other => println!("{other:?}"),
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod blob;
pub mod cache;
pub mod error;
pub mod export;
pub mod orchestrator;
pub mod prompt;
pub mod service;
pub mod wav;

pub use blob::{is_blob_url, AssetBlob, BlobStore, BLOB_SCHEME};
pub use cache::{AssetCache, SlotTicket};
pub use error::{AssetError, WavError};
pub use export::{scene_to_json, script_to_json, script_to_text, SceneExport};
pub use orchestrator::{RequestOutcome, SceneAssetOrchestrator};
pub use prompt::synthesize_prompt;
pub use service::{AspectRatio, AssetService, StyleProfile};
pub use wav::{is_wav, pcm_to_wav, PcmFormat};
