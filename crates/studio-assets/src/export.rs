//! Script export
//!
//! Text-only views of a script, independent of any generated asset.

use crate::prompt::synthesize_prompt;
use crate::service::StyleProfile;
use serde::Serialize;
use studio_core::{AssetKind, Scene};

/// Canonical per-scene export; field order is fixed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneExport<'a> {
    pub scene_number: u32,
    pub action: &'a str,
    pub prompt: &'a str,
}

/// JSON object `{ sceneNumber, action, prompt }` for one scene
///
/// # Errors
/// Returns the serializer error; unreachable for these field types.
pub fn scene_to_json(scene: &Scene, prompt: &str) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&SceneExport {
        scene_number: scene.scene_number,
        action: &scene.action,
        prompt,
    })
}

/// Pretty JSON array of every scene with its image prompt
///
/// # Errors
/// Returns the serializer error; unreachable for these field types.
pub fn script_to_json(scenes: &[Scene], style: &StyleProfile) -> serde_json::Result<String> {
    let prompts: Vec<String> = scenes
        .iter()
        .map(|scene| synthesize_prompt(scene, &AssetKind::Image, style))
        .collect();
    let exports: Vec<SceneExport<'_>> = scenes
        .iter()
        .zip(&prompts)
        .map(|(scene, prompt)| SceneExport {
            scene_number: scene.scene_number,
            action: &scene.action,
            prompt,
        })
        .collect();
    serde_json::to_string_pretty(&exports)
}

/// Plain-text screenplay: one numbered block per scene
#[must_use]
pub fn script_to_text(title: &str, scenes: &[Scene]) -> String {
    let mut out = String::new();
    let title = title.trim();
    if !title.is_empty() {
        out.push_str(title);
        out.push_str("\n\n");
    }
    for scene in scenes {
        out.push_str(&format!("Scene {}\n", scene.scene_number));
        out.push_str(scene.action.trim());
        out.push('\n');
        let context = scene.consistent_context.trim();
        if !context.is_empty() {
            out.push_str(&format!("[{context}]\n"));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scene_json_keeps_key_order() {
        let scene = Scene::new(2, "Run", "Forest");
        let json = scene_to_json(&scene, "Forest at night").unwrap();
        let compact: String = json.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(
            compact,
            r#"{ "sceneNumber": 2, "action": "Run", "prompt": "Forest at night" }"#
        );
    }

    #[test]
    fn script_json_has_one_entry_per_scene() {
        let scenes = vec![Scene::new(1, "A", "ctx a"), Scene::new(2, "B", "ctx b")];
        let json = script_to_json(&scenes, &StyleProfile::default()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["sceneNumber"], 2);
        assert!(items[0]["prompt"].as_str().unwrap().starts_with("ctx a"));
    }

    #[test]
    fn text_export() {
        let scenes = vec![Scene::new(1, "Wake", "Cabin"), Scene::new(2, "Leave", "")];
        let text = script_to_text("Cold Night", &scenes);
        assert_eq!(text, "Cold Night\n\nScene 1\nWake\n[Cabin]\n\nScene 2\nLeave\n\n");
    }
}
