//! Core types for the media studio
//!
//! Defines the data shared by every panel:
//! - Scenes produced by script generation
//! - Asset kinds, slot keys and slot state
//! - Project records persisted by the vault
//! - Tool identifiers and run epochs

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Panel identifier (e.g. `storygen-kh`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolId(String);

impl ToolId {
    /// Create a tool id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ToolId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ToolId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for ToolId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ToolId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Monotonic tag attached to an asynchronous run.
///
/// Results carrying an epoch older than the owner's current one are dropped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Epoch(pub u64);

impl Epoch {
    /// Epoch before any run was issued
    pub const ZERO: Epoch = Epoch(0);

    /// The epoch following this one
    #[inline]
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One numbered unit of a generated script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// 1-based, contiguous within one script
    pub scene_number: u32,
    /// Short narration / description
    pub action: String,
    /// Long-form visual continuity description used for asset prompts
    pub consistent_context: String,
}

impl Scene {
    /// Create a scene
    #[inline]
    #[must_use]
    pub fn new(
        scene_number: u32,
        action: impl Into<String>,
        consistent_context: impl Into<String>,
    ) -> Self {
        Self {
            scene_number,
            action: action.into(),
            consistent_context: consistent_context.into(),
        }
    }
}

/// Media family produced for a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetMedia {
    /// Displayable image URL
    Image,
    /// Playable video blob
    Video,
    /// PCM speech wrapped as WAV
    Audio,
}

/// Named asset slot attached to a scene
///
/// Panels may define additional slots through [`AssetKind::Named`]; those are
/// image slots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AssetKind {
    /// Single still frame
    Image,
    /// Clip animated from the scene's image
    Video,
    /// Narration audio
    Voice,
    /// Opening frame of a three-frame scene
    ImageFirst,
    /// Middle frame of a three-frame scene
    ImageMid,
    /// Closing frame of a three-frame scene
    ImageLast,
    /// Panel-defined image slot
    Named(String),
}

impl AssetKind {
    /// Wire name of the kind
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
            AssetKind::Voice => "voice",
            AssetKind::ImageFirst => "imageFirst",
            AssetKind::ImageMid => "imageMid",
            AssetKind::ImageLast => "imageLast",
            AssetKind::Named(name) => name,
        }
    }

    /// Slot whose output this kind consumes, if any
    #[must_use]
    pub fn prerequisite(&self) -> Option<AssetKind> {
        match self {
            AssetKind::Video => Some(AssetKind::Image),
            _ => None,
        }
    }

    /// Media family of the produced asset
    #[must_use]
    pub fn media(&self) -> AssetMedia {
        match self {
            AssetKind::Video => AssetMedia::Video,
            AssetKind::Voice => AssetMedia::Audio,
            _ => AssetMedia::Image,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "image" => AssetKind::Image,
            "video" => AssetKind::Video,
            "voice" => AssetKind::Voice,
            "imageFirst" => AssetKind::ImageFirst,
            "imageMid" => AssetKind::ImageMid,
            "imageLast" => AssetKind::ImageLast,
            other => {
                let valid = !other.is_empty()
                    && other
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
                if !valid {
                    return Err(ValidationError::InvalidAssetKind(other.to_string()));
                }
                AssetKind::Named(other.to_string())
            }
        };
        Ok(kind)
    }
}

impl From<AssetKind> for String {
    fn from(kind: AssetKind) -> Self {
        kind.as_str().to_string()
    }
}

impl TryFrom<String> for AssetKind {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Address of one slot: `(scene index, kind)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotKey {
    /// 0-based position of the scene in the current script
    pub scene_index: usize,
    /// Slot kind
    pub kind: AssetKind,
}

impl SlotKey {
    /// Create a slot key
    #[inline]
    #[must_use]
    pub fn new(scene_index: usize, kind: AssetKind) -> Self {
        Self { scene_index, kind }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scene_index, self.kind)
    }
}

/// State of one asset slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSlot {
    /// Produced asset, if any
    pub url: Option<String>,
    /// A request is in flight
    #[serde(default)]
    pub loading: bool,
    /// Message from the last failed request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AssetSlot {
    /// Slot with a finished asset
    #[inline]
    #[must_use]
    pub fn ready(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            loading: false,
            error: None,
        }
    }

    /// True when a url is present
    #[inline]
    #[must_use]
    pub fn has_url(&self) -> bool {
        self.url.is_some()
    }
}

/// Serialized slot entry, as stored inside a session snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSnapshot {
    /// 0-based scene index
    pub scene_index: usize,
    /// Slot kind
    pub kind: AssetKind,
    /// Slot state
    pub slot: AssetSlot,
}

/// One persisted snapshot of a panel session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Unique across the whole vault
    pub id: Uuid,
    /// Creation time, epoch milliseconds; never mutated
    pub timestamp: i64,
    /// Panel that produced the record
    pub tool: ToolId,
    /// Panel family, used for display
    #[serde(default)]
    pub category: String,
    /// Human-readable title
    #[serde(default)]
    pub title: String,
    /// Session blob
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ProjectRecord {
    /// Create a record with a fresh id
    #[must_use]
    pub fn new(
        tool: ToolId,
        category: impl Into<String>,
        title: impl Into<String>,
        data: serde_json::Value,
        timestamp: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            tool,
            category: category.into(),
            title: title.into(),
            data,
        }
    }

    /// Age relative to `now_ms`; negative for records from the future
    #[inline]
    #[must_use]
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.timestamp)
    }
}
