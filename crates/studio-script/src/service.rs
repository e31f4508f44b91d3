//! Script-generation service boundary
//!
//! The model call itself lives outside this workspace. Implementors receive a
//! [`BatchRequest`] and answer with the raw reply text; parsing happens on
//! this side so malformed replies count as batch failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use studio_core::{Scene, ServiceError};

/// Excerpt of the previous batch's last scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuityHint {
    /// Number of the scene the excerpt comes from
    pub last_scene_number: u32,
    /// Its action text
    pub action: String,
    /// Its continuity description
    pub consistent_context: String,
}

impl ContinuityHint {
    /// Build from the last scene of a batch
    #[must_use]
    pub fn from_scene(scene: &Scene) -> Self {
        Self {
            last_scene_number: scene.scene_number,
            action: scene.action.clone(),
            consistent_context: scene.consistent_context.clone(),
        }
    }

    /// Plain-text rendering for prompt construction
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "Previous scene {}: {}\nVisual continuity: {}",
            self.last_scene_number, self.action, self.consistent_context
        )
    }
}

/// One call to the script service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    /// Master prompt
    pub context: String,
    /// Scenes wanted from this call
    pub desired_count: u32,
    /// Number the first returned scene will receive
    pub start_number: u32,
    /// 0-based batch index
    pub batch_index: usize,
    /// Planned batches in the run
    pub total_batches: usize,
    /// Present for every batch after the first
    pub continuity: Option<ContinuityHint>,
    /// Panel style / voice / consistency directives
    pub directives: Vec<String>,
}

impl BatchRequest {
    /// True for the first batch of a run
    #[inline]
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.batch_index == 0
    }
}

/// External script generator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScriptService: Send + Sync {
    /// Produce up to `request.desired_count` scenes as raw JSON text
    async fn generate_batch(&self, request: BatchRequest) -> Result<String, ServiceError>;
}
