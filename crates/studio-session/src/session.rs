//! Panel working state and its saved form
//!
//! Restoring is additive-replace: every field present in the saved blob
//! overwrites the current value, absent fields keep theirs. Settings are
//! merged key by key so a record saved before a setting existed still loads.

use crate::error::SessionError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use studio_core::{Scene, SlotSnapshot};

/// Working state of one panel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSession<S> {
    pub master_prompt: String,
    pub scene_count: u32,
    pub scenes: Vec<Scene>,
    pub settings: S,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_metadata: Option<Value>,
}

/// Serialized session plus its finished asset slots
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot<'a, S> {
    #[serde(flatten)]
    pub session: &'a GenerationSession<S>,
    pub assets: Vec<SlotSnapshot>,
}

/// What a restore changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    /// Top-level fields that were applied
    pub applied: Vec<&'static str>,
    /// Present fields that could not be decoded and were skipped
    pub skipped: Vec<&'static str>,
    /// Asset slots from the blob, when the blob carried them
    pub assets: Option<Vec<SlotSnapshot>>,
}

impl<S> GenerationSession<S>
where
    S: Serialize + DeserializeOwned + Clone,
{
    /// Create a session with the given settings
    #[must_use]
    pub fn new(settings: S, scene_count: u32) -> Self {
        Self {
            master_prompt: String::new(),
            scene_count,
            scenes: Vec::new(),
            settings,
            derived_metadata: None,
        }
    }

    /// Serialize the session and `assets` into a blob
    ///
    /// # Errors
    /// Returns `SessionError::InvalidSnapshot` if the settings type fails to
    /// serialize.
    pub fn to_snapshot(&self, assets: Vec<SlotSnapshot>) -> Result<Value, SessionError> {
        serde_json::to_value(SessionSnapshot {
            session: self,
            assets,
        })
        .map_err(|e| SessionError::InvalidSnapshot(e.to_string()))
    }

    /// Apply a saved blob with additive-replace semantics.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidSnapshot` if `data` is not a JSON object.
    pub fn apply_snapshot(&mut self, data: &Value) -> Result<RestoreReport, SessionError> {
        let Some(fields) = data.as_object() else {
            return Err(SessionError::InvalidSnapshot(format!(
                "expected an object, found {}",
                json_kind(data)
            )));
        };
        let mut report = RestoreReport::default();

        apply_field(fields, "masterPrompt", &mut self.master_prompt, &mut report);
        apply_field(fields, "sceneCount", &mut self.scene_count, &mut report);
        apply_field(fields, "scenes", &mut self.scenes, &mut report);

        if let Some(value) = fields.get("derivedMetadata") {
            self.derived_metadata = if value.is_null() {
                None
            } else {
                Some(value.clone())
            };
            report.applied.push("derivedMetadata");
        }

        if let Some(incoming) = fields.get("settings") {
            match merge_settings(&self.settings, incoming) {
                Some(merged) => {
                    self.settings = merged;
                    report.applied.push("settings");
                }
                None => report.skipped.push("settings"),
            }
        }

        if let Some(value) = fields.get("assets") {
            match serde_json::from_value::<Vec<SlotSnapshot>>(value.clone()) {
                Ok(assets) => {
                    report.assets = Some(assets);
                    report.applied.push("assets");
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable assets in snapshot: {}", e);
                    report.skipped.push("assets");
                }
            }
        }

        Ok(report)
    }
}

fn apply_field<T: DeserializeOwned>(
    fields: &Map<String, Value>,
    name: &'static str,
    target: &mut T,
    report: &mut RestoreReport,
) {
    let Some(value) = fields.get(name) else {
        return;
    };
    match serde_json::from_value::<T>(value.clone()) {
        Ok(decoded) => {
            *target = decoded;
            report.applied.push(name);
        }
        Err(e) => {
            tracing::warn!("Skipping unreadable {} in snapshot: {}", name, e);
            report.skipped.push(name);
        }
    }
}

/// Overlay the keys of `incoming` onto `current`.
///
/// Returns `None` when the result no longer decodes as `S`.
#[must_use]
pub fn merge_settings<S>(current: &S, incoming: &Value) -> Option<S>
where
    S: Serialize + DeserializeOwned,
{
    let mut base = serde_json::to_value(current).ok()?;
    match (base.as_object_mut(), incoming.as_object()) {
        (Some(base_fields), Some(incoming_fields)) => {
            for (key, value) in incoming_fields {
                base_fields.insert(key.clone(), value.clone());
            }
        }
        _ => base = incoming.clone(),
    }
    match serde_json::from_value(base) {
        Ok(merged) => Some(merged),
        Err(e) => {
            tracing::warn!("Skipping unreadable settings in snapshot: {}", e);
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
