//! Testing utilities for the studio workspace
//!
//! Deterministic fake services, gates for interleaving tests, and fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use studio_assets::{AspectRatio, AssetService};
use studio_core::{
    EventBus, ManualClock, ProjectRecord, ScriptConfig, ServiceError, StudioConfig, ToolId,
};
use studio_script::{BatchRequest, ScriptService};
use studio_vault::{MemoryStore, ProjectVault};
use tokio::sync::Semaphore;

/// Fixed "now" used by fixtures: 2026-09-01T10:00:00Z
pub const TEST_NOW_MS: i64 = 1_788_256_800_000;

/// Blocks calls until permits are released
#[derive(Debug)]
pub struct Gate {
    permits: Semaphore,
    arrived: AtomicUsize,
}

impl Gate {
    /// Closed gate
    #[must_use]
    pub fn closed() -> Self {
        Self {
            permits: Semaphore::new(0),
            arrived: AtomicUsize::new(0),
        }
    }

    /// Let `n` waiting or future calls through
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    /// Calls that reached the gate so far
    #[must_use]
    pub fn arrived(&self) -> usize {
        self.arrived.load(Ordering::SeqCst)
    }

    /// Yield until `n` calls have reached the gate
    pub async fn wait_for(&self, n: usize) {
        while self.arrived() < n {
            tokio::task::yield_now().await;
        }
    }

    async fn pass(&self) {
        self.arrived.fetch_add(1, Ordering::SeqCst);
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

/// Script service producing numbered scenes from the request
#[derive(Debug, Default)]
pub struct FakeScriptService {
    requests: Mutex<Vec<BatchRequest>>,
    fail_on_batch: Option<usize>,
    gate: Option<Arc<Gate>>,
}

impl FakeScriptService {
    /// Service answering every batch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the batch with this 0-based index
    #[must_use]
    pub fn failing_on(mut self, batch_index: usize) -> Self {
        self.fail_on_batch = Some(batch_index);
        self
    }

    /// Hold every call at `gate`
    #[must_use]
    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Requests received so far
    #[must_use]
    pub fn requests(&self) -> Vec<BatchRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ScriptService for FakeScriptService {
    async fn generate_batch(&self, request: BatchRequest) -> Result<String, ServiceError> {
        self.requests.lock().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        if self.fail_on_batch == Some(request.batch_index) {
            return Err(ServiceError::new(format!(
                "quota exceeded at batch {}",
                request.batch_index + 1
            )));
        }
        let scenes: Vec<serde_json::Value> = (0..request.desired_count)
            .map(|offset| {
                let number = request.start_number + offset;
                serde_json::json!({
                    "sceneNumber": number,
                    "action": format!("{} - beat {}", request.context, number),
                    "consistentContext": format!("{} / continuity", request.context),
                })
            })
            .collect();
        Ok(serde_json::Value::Array(scenes).to_string())
    }
}

/// Asset service with per-kind call counters
#[derive(Debug, Default)]
pub struct FakeAssetService {
    pub image_calls: AtomicUsize,
    pub video_calls: AtomicUsize,
    pub speech_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    fail_when_prompt_contains: Option<String>,
    gate: Option<Arc<Gate>>,
}

impl FakeAssetService {
    /// Service that always succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any call whose prompt contains `marker`
    #[must_use]
    pub fn failing_when(mut self, marker: impl Into<String>) -> Self {
        self.fail_when_prompt_contains = Some(marker.into());
        self
    }

    /// Hold every call at `gate`
    #[must_use]
    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Prompts received so far
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Total calls of any kind
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
            + self.video_calls.load(Ordering::SeqCst)
            + self.speech_calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, prompt: &str) -> Result<(), ServiceError> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        match &self.fail_when_prompt_contains {
            Some(marker) if prompt.contains(marker.as_str()) => {
                Err(ServiceError::new("safety filter rejected the prompt"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl AssetService for FakeAssetService {
    async fn generate_image(&self, prompt: &str, aspect: AspectRatio) -> Result<String, ServiceError> {
        let n = self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(prompt).await?;
        Ok(format!("https://assets.test/image/{n}?aspect={aspect}"))
    }

    async fn generate_video(
        &self,
        prompt: &str,
        image_url: &str,
        _aspect: AspectRatio,
    ) -> Result<Vec<u8>, ServiceError> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(prompt).await?;
        Ok(format!("mp4:{image_url}").into_bytes())
    }

    async fn generate_speech(&self, text: &str, _voice: Option<&str>) -> Result<Vec<u8>, ServiceError> {
        self.speech_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(text).await?;
        // 10 ms of silence at 24 kHz mono
        Ok(vec![0u8; 480])
    }
}

/// Config with no pacing delay and an in-memory vault
#[must_use]
pub fn test_config() -> StudioConfig {
    StudioConfig {
        script: ScriptConfig {
            batch_delay_ms: 0,
            ..ScriptConfig::default()
        },
        ..StudioConfig::default()
    }
    .with_backend(studio_core::StorageBackend::Memory)
}

/// Clock frozen at [`TEST_NOW_MS`]
#[must_use]
pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at_millis(TEST_NOW_MS))
}

/// In-memory vault on a fresh bus using `clock`
#[must_use]
pub fn memory_vault(clock: Arc<ManualClock>) -> Arc<ProjectVault> {
    Arc::new(ProjectVault::new(Arc::new(MemoryStore::new()), EventBus::default()).with_clock(clock))
}

/// Record for `tool` created at `timestamp`
#[must_use]
pub fn record_at(tool: &str, title: &str, timestamp: i64) -> ProjectRecord {
    ProjectRecord::new(
        ToolId::new(tool),
        "test",
        title,
        serde_json::json!({ "masterPrompt": title }),
        timestamp,
    )
}
