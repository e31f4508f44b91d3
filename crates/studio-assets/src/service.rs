//! Asset generation service boundary

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use studio_core::ServiceError;

/// Frame shape requested from the image and video models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 16:9
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16
    #[serde(rename = "9:16")]
    Portrait,
    /// 1:1
    #[serde(rename = "1:1")]
    Square,
    /// 4:3
    #[serde(rename = "4:3")]
    Classic,
}

impl AspectRatio {
    /// Wire form, e.g. `16:9`
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Square => "1:1",
            AspectRatio::Classic => "4:3",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Panel-level styling applied to every asset prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleProfile {
    /// Free-form style directives appended to prompts
    pub directives: Vec<String>,
    /// Frame shape for images and videos
    pub aspect: AspectRatio,
    /// Voice name passed to speech synthesis
    pub voice: Option<String>,
}

impl StyleProfile {
    /// Create an empty style
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directive
    #[inline]
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Set the aspect ratio
    #[inline]
    #[must_use]
    pub fn with_aspect(mut self, aspect: AspectRatio) -> Self {
        self.aspect = aspect;
        self
    }

    /// Set the voice
    #[inline]
    #[must_use]
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }
}

/// External image, video and speech models
#[async_trait]
pub trait AssetService: Send + Sync {
    /// Render an image; returns a displayable url
    async fn generate_image(&self, prompt: &str, aspect: AspectRatio)
        -> Result<String, ServiceError>;

    /// Animate `image_url`; returns the encoded clip
    async fn generate_video(
        &self,
        prompt: &str,
        image_url: &str,
        aspect: AspectRatio,
    ) -> Result<Vec<u8>, ServiceError>;

    /// Synthesize narration; returns raw 16-bit PCM (a WAV body is tolerated)
    async fn generate_speech(
        &self,
        text: &str,
        voice: Option<&str>,
    ) -> Result<Vec<u8>, ServiceError>;
}
