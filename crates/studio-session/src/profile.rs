//! Panel profiles
//!
//! A profile describes what differs between panels: identity, settings type,
//! offered asset slots, scene range and how settings become directives.

use crate::session::GenerationSession;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::ops::RangeInclusive;
use studio_assets::StyleProfile;
use studio_core::{AssetKind, ToolId};
use studio_script::FidelityMode;

/// Static description of one panel
pub trait PanelProfile: Send + Sync + Debug + 'static {
    /// Panel-specific settings, persisted inside snapshots
    type Settings: Serialize + DeserializeOwned + Default + Clone + Debug + Send + Sync + 'static;

    /// Tool id used to address events
    fn tool_id(&self) -> ToolId;

    /// Display family of saved records
    fn category(&self) -> &'static str;

    /// Asset slots the panel offers per scene
    fn slot_kinds(&self) -> Vec<AssetKind>;

    /// Allowed scene counts
    fn count_range(&self) -> RangeInclusive<u32> {
        1..=100
    }

    /// Scene count of a fresh session
    fn default_count(&self) -> u32 {
        10
    }

    /// Batch sizing for script runs
    fn fidelity(&self, _settings: &Self::Settings) -> FidelityMode {
        FidelityMode::Standard
    }

    /// Free-form directives forwarded to the script service
    fn directives(&self, settings: &Self::Settings) -> Vec<String>;

    /// Style applied to asset prompts
    fn style(&self, settings: &Self::Settings) -> StyleProfile;

    /// Title hint for a saved record
    fn title_hint(&self, session: &GenerationSession<Self::Settings>) -> String {
        session.master_prompt.clone()
    }
}
