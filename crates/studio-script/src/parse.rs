//! Reply parsing
//!
//! Accepts a JSON array of scenes or an object wrapping it under `scenes`,
//! optionally inside a Markdown code fence. Numbering in the reply is kept
//! only as a hint; the generator renumbers every scene.

use crate::error::ReplyError;
use serde::Deserialize;
use studio_core::Scene;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScene {
    #[serde(default, alias = "scene_number")]
    scene_number: Option<u32>,
    #[serde(default)]
    action: String,
    #[serde(default, alias = "consistent_context")]
    consistent_context: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Reply {
    List(Vec<RawScene>),
    Wrapped { scenes: Vec<RawScene> },
}

/// Remove a surrounding ```` ``` ```` / ```` ```json ```` fence
fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a service reply into scenes, keeping the service's numbering
///
/// # Errors
/// - `ReplyError::Json` if the text is not a scene list
/// - `ReplyError::Empty` if the list is empty
/// - `ReplyError::MissingAction` if a scene has blank action text
pub fn parse_reply(raw: &str) -> Result<Vec<Scene>, ReplyError> {
    let reply: Reply = serde_json::from_str(strip_fence(raw))?;
    let raw_scenes = match reply {
        Reply::List(list) => list,
        Reply::Wrapped { scenes } => scenes,
    };
    if raw_scenes.is_empty() {
        return Err(ReplyError::Empty);
    }
    raw_scenes
        .into_iter()
        .enumerate()
        .map(|(position, raw)| {
            if raw.action.trim().is_empty() {
                return Err(ReplyError::MissingAction { position });
            }
            Ok(Scene {
                scene_number: raw.scene_number.unwrap_or(0),
                action: raw.action,
                consistent_context: raw.consistent_context,
            })
        })
        .collect()
}
