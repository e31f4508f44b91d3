//! Built-in panels

use crate::profile::PanelProfile;
use crate::session::GenerationSession;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use studio_assets::{AspectRatio, StyleProfile};
use studio_core::{AssetKind, ToolId};
use studio_script::FidelityMode;

/// Tool id of the story panel
pub const STORY_TOOL: &str = "storygen-kh";
/// Tool id of the survival panel
pub const SURVIVAL_TOOL: &str = "survival-cold";

/// Story panel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorySettings {
    pub visual_style: String,
    pub aspect: AspectRatio,
    pub language: String,
    pub voice: Option<String>,
    pub fidelity: FidelityMode,
}

impl Default for StorySettings {
    fn default() -> Self {
        Self {
            visual_style: "cinematic, natural light".to_string(),
            aspect: AspectRatio::Landscape,
            language: "English".to_string(),
            voice: None,
            fidelity: FidelityMode::Standard,
        }
    }
}

/// Narrated story with one still, an optional clip and narration per scene
#[derive(Debug, Clone, Copy, Default)]
pub struct StoryPanel;

impl PanelProfile for StoryPanel {
    type Settings = StorySettings;

    fn tool_id(&self) -> ToolId {
        ToolId::new(STORY_TOOL)
    }

    fn category(&self) -> &'static str {
        "story"
    }

    fn slot_kinds(&self) -> Vec<AssetKind> {
        vec![AssetKind::Image, AssetKind::Video, AssetKind::Voice]
    }

    fn fidelity(&self, settings: &StorySettings) -> FidelityMode {
        settings.fidelity
    }

    fn directives(&self, settings: &StorySettings) -> Vec<String> {
        vec![
            format!("Write narration in {}.", settings.language),
            format!("Visual style: {}.", settings.visual_style),
        ]
    }

    fn style(&self, settings: &StorySettings) -> StyleProfile {
        let mut style = StyleProfile::new()
            .with_directive(settings.visual_style.clone())
            .with_aspect(settings.aspect);
        if let Some(voice) = &settings.voice {
            style = style.with_voice(voice.clone());
        }
        style
    }
}

/// Survival panel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SurvivalSettings {
    pub environment: String,
    pub season: String,
    pub aspect: AspectRatio,
    pub voice: Option<String>,
    pub fidelity: FidelityMode,
}

impl Default for SurvivalSettings {
    fn default() -> Self {
        Self {
            environment: "boreal forest".to_string(),
            season: "deep winter".to_string(),
            aspect: AspectRatio::Portrait,
            voice: None,
            fidelity: FidelityMode::HighFidelity,
        }
    }
}

/// Cold-weather survival walkthrough with first, middle and last frames
#[derive(Debug, Clone, Copy, Default)]
pub struct SurvivalPanel;

impl PanelProfile for SurvivalPanel {
    type Settings = SurvivalSettings;

    fn tool_id(&self) -> ToolId {
        ToolId::new(SURVIVAL_TOOL)
    }

    fn category(&self) -> &'static str {
        "survival"
    }

    fn slot_kinds(&self) -> Vec<AssetKind> {
        vec![
            AssetKind::ImageFirst,
            AssetKind::ImageMid,
            AssetKind::ImageLast,
            AssetKind::Voice,
        ]
    }

    fn count_range(&self) -> RangeInclusive<u32> {
        1..=60
    }

    fn default_count(&self) -> u32 {
        20
    }

    fn fidelity(&self, settings: &SurvivalSettings) -> FidelityMode {
        settings.fidelity
    }

    fn directives(&self, settings: &SurvivalSettings) -> Vec<String> {
        vec![
            format!("Setting: {} in {}.", settings.environment, settings.season),
            "Each scene is one concrete survival step.".to_string(),
        ]
    }

    fn style(&self, settings: &SurvivalSettings) -> StyleProfile {
        let mut style = StyleProfile::new()
            .with_directive("documentary realism")
            .with_directive(format!("{}, {}", settings.environment, settings.season))
            .with_aspect(settings.aspect);
        if let Some(voice) = &settings.voice {
            style = style.with_voice(voice.clone());
        }
        style
    }

    fn title_hint(&self, session: &GenerationSession<SurvivalSettings>) -> String {
        if session.master_prompt.trim().is_empty() {
            return String::new();
        }
        format!("{} ({})", session.master_prompt.trim(), session.settings.environment)
    }
}
