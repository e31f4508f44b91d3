//! Asset prompt synthesis
//!
//! Image prompts are built from the scene's continuity description, never from
//! its action alone, so every frame of a script shares the same look.

use crate::service::StyleProfile;
use studio_core::{AssetKind, Scene};

/// Framing sentence for each slot kind
fn framing(kind: &AssetKind) -> Option<&'static str> {
    match kind {
        AssetKind::Image => Some("A single cinematic still of this moment."),
        AssetKind::Video => Some("Animate this frame with subtle, continuous motion."),
        AssetKind::ImageFirst => Some("Opening frame: establish the situation before the action."),
        AssetKind::ImageMid => Some("Middle frame: the action at its peak."),
        AssetKind::ImageLast => Some("Closing frame: the immediate aftermath."),
        AssetKind::Voice | AssetKind::Named(_) => None,
    }
}

/// Prompt for rendering `kind` for `scene`.
///
/// Voice prompts are the narration text itself.
#[must_use]
pub fn synthesize_prompt(scene: &Scene, kind: &AssetKind, style: &StyleProfile) -> String {
    if *kind == AssetKind::Voice {
        return scene.action.trim().to_string();
    }

    let mut parts: Vec<String> = Vec::with_capacity(4);
    let context = scene.consistent_context.trim();
    if context.is_empty() {
        parts.push(scene.action.trim().to_string());
    } else {
        parts.push(context.to_string());
        parts.push(format!("Action: {}", scene.action.trim()));
    }
    match framing(kind) {
        Some(frame) => parts.push(frame.to_string()),
        None => parts.push(format!("Frame: {kind}.")),
    }
    let directives: Vec<&str> = style
        .directives
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .collect();
    if !directives.is_empty() {
        parts.push(format!("Style: {}", directives.join(", ")));
    }
    parts.join("\n")
}
