//! Scene batch generator
//!
//! Drives sequential calls to a [`ScriptService`] until the target number of
//! scenes is reached:
//! - batch *i > 1* carries a [`ContinuityHint`] from the previous batch's last scene
//! - scenes are renumbered so the script is always `1..=n` without gaps
//! - accumulated scenes are published after every batch
//! - a newer run supersedes an older one through its epoch tag

use crate::error::{BatchFailure, ScriptError};
use crate::parse::parse_reply;
use crate::plan::{clamp_count, plan_batches, FidelityMode};
use crate::service::{BatchRequest, ContinuityHint, ScriptService};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use studio_core::{Epoch, Scene, ScriptConfig, ValidationError};
use tokio::sync::watch;

/// Input of one script run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequest {
    /// Concept text; must not be blank
    pub master_prompt: String,
    /// Requested scene count, clamped to the configured range
    pub target_count: u32,
    /// Opaque style / voice / consistency directives
    pub directives: Vec<String>,
    /// Batch sizing mode
    pub mode: FidelityMode,
    /// Explicit batch size, overrides `mode`
    pub batch_size: Option<u32>,
}

impl ScriptRequest {
    /// Create a request with standard fidelity and no directives
    #[must_use]
    pub fn new(master_prompt: impl Into<String>, target_count: u32) -> Self {
        Self {
            master_prompt: master_prompt.into(),
            target_count,
            directives: Vec::new(),
            mode: FidelityMode::default(),
            batch_size: None,
        }
    }

    /// With directives
    #[inline]
    #[must_use]
    pub fn with_directives(mut self, directives: Vec<String>) -> Self {
        self.directives = directives;
        self
    }

    /// With fidelity mode
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: FidelityMode) -> Self {
        self.mode = mode;
        self
    }

    /// With explicit batch size
    #[inline]
    #[must_use]
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Batch size in effect
    #[inline]
    #[must_use]
    pub fn effective_batch_size(&self) -> u32 {
        self.batch_size.unwrap_or_else(|| self.mode.batch_size())
    }
}

/// Lifecycle of the latest run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunStatus {
    /// No run started yet
    #[default]
    Idle,
    /// Batches still pending
    Running,
    /// All batches done
    Completed,
    /// Stopped at a failed batch
    Failed(String),
}

/// Snapshot published after every batch
#[derive(Debug, Clone, Default)]
pub struct ScriptProgress {
    /// Run the snapshot belongs to
    pub run: Epoch,
    /// Scenes accumulated so far
    pub scenes: Arc<Vec<Scene>>,
    /// Finished batches
    pub batches_completed: usize,
    /// Planned batches
    pub total_batches: usize,
    /// Run state
    pub status: RunStatus,
}

impl ScriptProgress {
    /// Completion ratio in `[0, 1]`
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total_batches == 0 {
            return 0.0;
        }
        self.batches_completed as f64 / self.total_batches as f64
    }

    /// Completion rounded to a whole percent
    #[must_use]
    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// True while batches are pending
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }
}

/// Result of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRun {
    /// Epoch of the run
    pub run: Epoch,
    /// Final script
    pub scenes: Vec<Scene>,
    /// Batches executed
    pub batches: usize,
}

/// Batched, continuity-preserving script generator
pub struct SceneBatchGenerator {
    service: Arc<dyn ScriptService>,
    config: ScriptConfig,
    epoch: AtomicU64,
    progress: watch::Sender<ScriptProgress>,
}

impl std::fmt::Debug for SceneBatchGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneBatchGenerator")
            .field("config", &self.config)
            .field("epoch", &self.current_epoch())
            .finish_non_exhaustive()
    }
}

impl SceneBatchGenerator {
    /// Create a generator over `service`
    #[must_use]
    pub fn new(service: Arc<dyn ScriptService>, config: ScriptConfig) -> Self {
        let (progress, _rx) = watch::channel(ScriptProgress::default());
        Self {
            service,
            config,
            epoch: AtomicU64::new(0),
            progress,
        }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    /// Epoch of the most recently started run
    #[inline]
    #[must_use]
    pub fn current_epoch(&self) -> Epoch {
        Epoch(self.epoch.load(Ordering::SeqCst))
    }

    /// Watch the published progress
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ScriptProgress> {
        self.progress.subscribe()
    }

    /// Latest published progress
    #[must_use]
    pub fn latest(&self) -> ScriptProgress {
        self.progress.borrow().clone()
    }

    /// Run a script generation, publishing progress on the watch channel only
    pub async fn generate(&self, request: ScriptRequest) -> Result<ScriptRun, ScriptError> {
        self.generate_observed(request, |_| {}).await
    }

    /// Run a script generation and report every published snapshot to `observer`
    ///
    /// # Errors
    /// - `ScriptError::Validation` for a blank prompt or zero batch size; the
    ///   service is never called and no run is started
    /// - `ScriptError::BatchFailed` when a batch fails; earlier scenes are kept
    /// - `ScriptError::Superseded` when a newer run started meanwhile
    pub async fn generate_observed<F>(
        &self,
        request: ScriptRequest,
        mut observer: F,
    ) -> Result<ScriptRun, ScriptError>
    where
        F: FnMut(&ScriptProgress),
    {
        let prompt = request.master_prompt.trim();
        if prompt.is_empty() {
            return Err(ValidationError::EmptyPrompt.into());
        }
        let target = clamp_count(
            request.target_count,
            self.config.min_scenes,
            self.config.max_scenes,
        );
        let plans = plan_batches(target, request.effective_batch_size())?;
        let total_batches = plans.len();

        let run = Epoch(self.epoch.fetch_add(1, Ordering::SeqCst) + 1);
        tracing::info!(
            "Script run {} started: {} scenes in {} batches",
            run,
            target,
            total_batches
        );

        let mut scenes: Vec<Scene> = Vec::with_capacity(target as usize);
        self.publish(
            run,
            ScriptProgress {
                run,
                scenes: Arc::new(Vec::new()),
                batches_completed: 0,
                total_batches,
                status: RunStatus::Running,
            },
            &mut observer,
        );

        for plan in &plans {
            if plan.index > 0 && self.config.batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
            if self.is_superseded(run) {
                tracing::debug!("Script run {} superseded before batch {}", run, plan.index + 1);
                return Err(ScriptError::Superseded(run));
            }

            let start_number = scenes.last().map_or(1, |s| s.scene_number + 1);
            let batch_request = BatchRequest {
                context: prompt.to_string(),
                desired_count: plan.count,
                start_number,
                batch_index: plan.index,
                total_batches,
                continuity: scenes.last().map(ContinuityHint::from_scene),
                directives: request.directives.clone(),
            };

            let reply = self.service.generate_batch(batch_request).await;
            if self.is_superseded(run) {
                tracing::debug!("Script run {} superseded during batch {}", run, plan.index + 1);
                return Err(ScriptError::Superseded(run));
            }

            let batch = match reply
                .map_err(BatchFailure::from)
                .and_then(|text| parse_reply(&text).map_err(BatchFailure::from))
            {
                Ok(batch) => batch,
                Err(source) => {
                    tracing::warn!(
                        "Script run {} failed at batch {}/{}: {}",
                        run,
                        plan.index + 1,
                        total_batches,
                        source
                    );
                    self.publish(
                        run,
                        ScriptProgress {
                            run,
                            scenes: Arc::new(scenes.clone()),
                            batches_completed: plan.index,
                            total_batches,
                            status: RunStatus::Failed(source.to_string()),
                        },
                        &mut observer,
                    );
                    return Err(ScriptError::BatchFailed {
                        batch: plan.index + 1,
                        total_batches,
                        source,
                        partial: scenes,
                    });
                }
            };

            let received = batch.len();
            if received < plan.count as usize {
                tracing::warn!(
                    "Batch {}/{} returned {} of {} scenes",
                    plan.index + 1,
                    total_batches,
                    received,
                    plan.count
                );
            }
            scenes.extend(
                batch
                    .into_iter()
                    .take(plan.count as usize)
                    .zip(start_number..)
                    .map(|(scene, number)| Scene {
                        scene_number: number,
                        ..scene
                    }),
            );

            let completed = plan.index + 1;
            tracing::debug!(
                "Script run {} batch {}/{} done, {} scenes so far",
                run,
                completed,
                total_batches,
                scenes.len()
            );
            self.publish(
                run,
                ScriptProgress {
                    run,
                    scenes: Arc::new(scenes.clone()),
                    batches_completed: completed,
                    total_batches,
                    status: if completed == total_batches {
                        RunStatus::Completed
                    } else {
                        RunStatus::Running
                    },
                },
                &mut observer,
            );
        }

        tracing::info!("Script run {} completed with {} scenes", run, scenes.len());
        Ok(ScriptRun {
            run,
            scenes,
            batches: total_batches,
        })
    }

    fn is_superseded(&self, run: Epoch) -> bool {
        self.current_epoch() != run
    }

    fn publish<F>(&self, run: Epoch, progress: ScriptProgress, observer: &mut F)
    where
        F: FnMut(&ScriptProgress),
    {
        let epoch = &self.epoch;
        let accepted = self.progress.send_if_modified(|current| {
            if epoch.load(Ordering::SeqCst) != run.0 {
                return false;
            }
            *current = progress.clone();
            true
        });
        if accepted {
            observer(&progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MockScriptService;
    use pretty_assertions::assert_eq;
    use studio_core::ServiceError;

    fn reply_for(request: &BatchRequest) -> String {
        let scenes: Vec<serde_json::Value> = (0..request.desired_count)
            .map(|i| {
                serde_json::json!({
                    // deliberately restart numbering at 1 every batch
                    "sceneNumber": i + 1,
                    "action": format!("action b{} s{}", request.batch_index, i),
                    "consistentContext": format!("context b{} s{}", request.batch_index, i),
                })
            })
            .collect();
        serde_json::Value::Array(scenes).to_string()
    }

    fn config() -> ScriptConfig {
        ScriptConfig {
            batch_delay_ms: 0,
            ..ScriptConfig::default()
        }
    }

    #[tokio::test]
    async fn blank_prompt_never_calls_service() {
        let mut mock = MockScriptService::new();
        mock.expect_generate_batch().never();
        let generator = SceneBatchGenerator::new(Arc::new(mock), config());

        let err = generator
            .generate(ScriptRequest::new("   ", 5))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(generator.current_epoch(), Epoch::ZERO);
    }

    #[tokio::test]
    async fn renumbers_and_passes_continuity() {
        let mut mock = MockScriptService::new();
        mock.expect_generate_batch()
            .times(3)
            .returning(|request| {
                if request.batch_index == 0 {
                    assert!(request.continuity.is_none());
                } else {
                    let hint = request.continuity.clone().unwrap();
                    assert_eq!(hint.last_scene_number + 1, request.start_number);
                    assert_eq!(
                        hint.action,
                        format!("action b{} s9", request.batch_index - 1)
                    );
                }
                Ok(reply_for(&request))
            });
        let generator = SceneBatchGenerator::new(Arc::new(mock), config());

        let mut percents = Vec::new();
        let run = generator
            .generate_observed(
                ScriptRequest::new("A winter survival story", 25).with_batch_size(10),
                |p| {
                    if p.batches_completed > 0 {
                        percents.push(p.percent());
                    }
                },
            )
            .await
            .unwrap();

        assert_eq!(run.batches, 3);
        assert_eq!(percents, vec![33, 67, 100]);
        let numbers: Vec<u32> = run.scenes.iter().map(|s| s.scene_number).collect();
        assert_eq!(numbers, (1..=25).collect::<Vec<_>>());
        assert_eq!(generator.latest().status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn failure_keeps_partial_scenes() {
        let mut mock = MockScriptService::new();
        mock.expect_generate_batch().returning(|request| {
            if request.batch_index == 1 {
                Err(ServiceError::new("quota exceeded"))
            } else {
                Ok(reply_for(&request))
            }
        });
        let generator = SceneBatchGenerator::new(Arc::new(mock), config());

        let err = generator
            .generate(ScriptRequest::new("story", 30).with_batch_size(10))
            .await
            .unwrap_err();
        assert_eq!(err.partial_scenes().len(), 10);
        assert!(matches!(err, ScriptError::BatchFailed { batch: 2, total_batches: 3, .. }));
        assert!(err.is_retryable());

        let latest = generator.latest();
        assert_eq!(latest.scenes.len(), 10);
        assert_eq!(latest.status, RunStatus::Failed("quota exceeded".into()));
    }

    #[tokio::test]
    async fn malformed_reply_is_batch_failure() {
        let mut mock = MockScriptService::new();
        mock.expect_generate_batch()
            .times(1)
            .returning(|_| Ok("[{\"action\": \"cut off".to_string()));
        let generator = SceneBatchGenerator::new(Arc::new(mock), config());

        let err = generator
            .generate(ScriptRequest::new("story", 5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScriptError::BatchFailed {
                source: BatchFailure::Reply(_),
                ..
            }
        ));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn oversized_batches_are_truncated_and_count_clamped() {
        let mut mock = MockScriptService::new();
        mock.expect_generate_batch().returning(|request| {
            let bigger = BatchRequest {
                desired_count: request.desired_count + 3,
                ..request
            };
            Ok(reply_for(&bigger))
        });
        let generator = SceneBatchGenerator::new(
            Arc::new(mock),
            ScriptConfig {
                max_scenes: 12,
                ..config()
            },
        );

        let run = generator
            .generate(ScriptRequest::new("story", 40).with_mode(FidelityMode::HighFidelity))
            .await
            .unwrap();
        assert_eq!(run.scenes.len(), 12);
        assert_eq!(run.scenes.last().unwrap().scene_number, 12);
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_delay_does_not_hide_progress() {
        let mut mock = MockScriptService::new();
        mock.expect_generate_batch()
            .returning(|request| Ok(reply_for(&request)));
        let generator = Arc::new(SceneBatchGenerator::new(
            Arc::new(mock),
            ScriptConfig {
                batch_delay_ms: 60_000,
                ..ScriptConfig::default()
            },
        ));
        let mut rx = generator.subscribe();

        let worker = {
            let generator = Arc::clone(&generator);
            tokio::spawn(async move {
                generator
                    .generate(ScriptRequest::new("story", 20).with_batch_size(10))
                    .await
            })
        };

        // first batch lands before the pacing delay elapses
        loop {
            rx.changed().await.unwrap();
            if rx.borrow().batches_completed == 1 {
                break;
            }
        }
        assert_eq!(generator.latest().scenes.len(), 10);
        assert!(generator.latest().is_running());

        let run = worker.await.unwrap().unwrap();
        assert_eq!(run.scenes.len(), 20);
    }
}
