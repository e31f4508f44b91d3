//! Panel controller
//!
//! Owns one [`GenerationSession`] and wires it to:
//! - a [`SceneBatchGenerator`] for script runs
//! - a [`SceneAssetOrchestrator`] for per-scene assets
//! - the shared [`ProjectVault`] and event bus for save/load
//!
//! Events addressed to other tools are ignored.

use crate::error::SessionError;
use crate::profile::PanelProfile;
use crate::session::{GenerationSession, RestoreReport};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use studio_assets::{
    scene_to_json, script_to_json, synthesize_prompt, AssetService, RequestOutcome,
    SceneAssetOrchestrator,
};
use studio_core::{
    AssetKind, Notification, ProjectRecord, Scene, StudioConfig, StudioEvent, ToolId,
    ValidationError,
};
use studio_script::{clamp_count, SceneBatchGenerator, ScriptRequest, ScriptRun, ScriptService};
use studio_vault::ProjectVault;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// What a panel did with an event
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Addressed elsewhere or not actionable
    Ignored,
    /// Session saved as a new record
    Saved(ProjectRecord),
    /// Record restored into the session
    Loaded(RestoreReport),
}

/// One panel instance
pub struct PanelController<P: PanelProfile> {
    profile: P,
    tool: ToolId,
    session: RwLock<GenerationSession<P::Settings>>,
    generator: SceneBatchGenerator,
    assets: Arc<SceneAssetOrchestrator>,
    vault: Arc<ProjectVault>,
    run_epoch: AtomicU64,
}

impl<P: PanelProfile> std::fmt::Debug for PanelController<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelController")
            .field("tool", &self.tool)
            .field("run_epoch", &self.run_epoch)
            .field("assets", &self.assets)
            .finish_non_exhaustive()
    }
}

impl<P: PanelProfile> PanelController<P> {
    /// Create a panel from ready-made parts
    #[must_use]
    pub fn new(
        profile: P,
        generator: SceneBatchGenerator,
        assets: SceneAssetOrchestrator,
        vault: Arc<ProjectVault>,
    ) -> Self {
        let settings = P::Settings::default();
        let count = clamp_to(&profile, profile.default_count());
        let assets = assets.with_style(profile.style(&settings));
        Self {
            tool: profile.tool_id(),
            profile,
            session: RwLock::new(GenerationSession::new(settings, count)),
            generator,
            assets: Arc::new(assets),
            vault,
            run_epoch: AtomicU64::new(0),
        }
    }

    /// Create a panel over the given services using `config`
    #[must_use]
    pub fn with_services(
        profile: P,
        script: Arc<dyn ScriptService>,
        assets: Arc<dyn AssetService>,
        vault: Arc<ProjectVault>,
        config: &StudioConfig,
    ) -> Self {
        Self::new(
            profile,
            SceneBatchGenerator::new(script, config.script),
            SceneAssetOrchestrator::new(assets, &config.assets),
            vault,
        )
    }

    /// Panel profile
    #[inline]
    #[must_use]
    pub fn profile(&self) -> &P {
        &self.profile
    }

    /// Tool id of this panel
    #[inline]
    #[must_use]
    pub fn tool(&self) -> &ToolId {
        &self.tool
    }

    /// Script generator
    #[inline]
    #[must_use]
    pub fn generator(&self) -> &SceneBatchGenerator {
        &self.generator
    }

    /// Asset orchestrator
    #[inline]
    #[must_use]
    pub fn assets(&self) -> &Arc<SceneAssetOrchestrator> {
        &self.assets
    }

    /// Copy of the current session
    #[must_use]
    pub fn session(&self) -> GenerationSession<P::Settings> {
        self.session.read().clone()
    }

    /// Current scenes
    #[must_use]
    pub fn scenes(&self) -> Vec<Scene> {
        self.session.read().scenes.clone()
    }

    /// Set the master prompt
    pub fn set_master_prompt(&self, prompt: impl Into<String>) {
        self.session.write().master_prompt = prompt.into();
    }

    /// Set the target scene count, clamped to the panel range; returns the
    /// stored value
    pub fn set_scene_count(&self, count: u32) -> u32 {
        let count = clamp_to(&self.profile, count);
        self.session.write().scene_count = count;
        count
    }

    /// Edit settings in place; the asset style follows
    pub fn update_settings<F>(&self, edit: F)
    where
        F: FnOnce(&mut P::Settings),
    {
        let style = {
            let mut session = self.session.write();
            edit(&mut session.settings);
            self.profile.style(&session.settings)
        };
        self.assets.set_style(style);
    }

    /// Attach derived metadata (titles, hashtags, ...) to the session
    pub fn set_derived_metadata(&self, metadata: Option<serde_json::Value>) {
        self.session.write().derived_metadata = metadata;
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.run_epoch.load(Ordering::SeqCst) == epoch
    }

    // Epoch is checked under the session lock; restore bumps it under the same lock.
    fn mirror_scenes(&self, epoch: u64, scenes: &[Scene]) -> bool {
        let mut session = self.session.write();
        if !self.is_current(epoch) {
            return false;
        }
        session.scenes = scenes.to_vec();
        true
    }

    fn notify(&self, notification: Notification) {
        self.vault.bus().publish(StudioEvent::Notification(notification));
    }

    /// Generate a fresh script for the current prompt.
    ///
    /// Asset slots are cleared first. Progress is mirrored into the session
    /// while this run is the newest; a failed run keeps its partial scenes.
    ///
    /// # Errors
    /// - `SessionError::Validation` for a blank prompt; nothing is cleared
    /// - `SessionError::Script` when a batch fails or a newer run superseded
    ///   this one
    pub async fn generate_script(&self) -> Result<ScriptRun, SessionError> {
        let (request, prompt_blank) = {
            let session = self.session.read();
            let request = ScriptRequest::new(session.master_prompt.clone(), session.scene_count)
                .with_directives(self.profile.directives(&session.settings))
                .with_mode(self.profile.fidelity(&session.settings));
            (request, session.master_prompt.trim().is_empty())
        };
        if prompt_blank {
            return Err(ValidationError::EmptyPrompt.into());
        }

        let epoch = self.run_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.assets.clear();
        self.session.write().scenes.clear();
        tracing::info!("{} generating script (panel run {})", self.tool, epoch);

        let result = self
            .generator
            .generate_observed(request, |progress| {
                self.mirror_scenes(epoch, &progress.scenes);
            })
            .await;

        match result {
            Ok(run) => {
                if self.mirror_scenes(epoch, &run.scenes) {
                    self.notify(Notification::success(
                        &self.tool,
                        format!("Generated {} scenes", run.scenes.len()),
                    ));
                }
                Ok(run)
            }
            Err(e) => {
                let err = SessionError::from(e);
                if !err.is_superseded() && self.is_current(epoch) {
                    self.notify(Notification::error(&self.tool, err.to_string()));
                }
                Err(err)
            }
        }
    }

    /// Request one asset for the scene at `scene_index`.
    ///
    /// # Errors
    /// - `ValidationError::UnsupportedSlot` if the panel does not offer `kind`
    /// - `ValidationError::SceneOutOfRange` for an unknown scene
    pub async fn request_asset(
        &self,
        scene_index: usize,
        kind: AssetKind,
    ) -> Result<RequestOutcome, SessionError> {
        if !self.profile.slot_kinds().contains(&kind) {
            return Err(ValidationError::UnsupportedSlot(kind.to_string()).into());
        }
        let issued = self.assets.cache().epoch();
        let scenes = self.scenes();
        let outcome = self
            .assets
            .request_asset_at(issued, &scenes, scene_index, kind)
            .await?;
        if let RequestOutcome::Failed { message } = &outcome {
            self.notify(Notification::error(&self.tool, message.clone()));
        }
        Ok(outcome)
    }

    /// Copy one scene as structured JSON, with the image prompt built from the
    /// panel's current style.
    ///
    /// # Errors
    /// Returns `ValidationError::SceneOutOfRange` for an unknown scene.
    pub fn scene_json(&self, scene_index: usize) -> Result<String, SessionError> {
        let scenes = self.scenes();
        let scene = scenes.get(scene_index).ok_or(ValidationError::SceneOutOfRange {
            index: scene_index,
            len: scenes.len(),
        })?;
        let prompt = synthesize_prompt(scene, &AssetKind::Image, &self.assets.style());
        scene_to_json(scene, &prompt).map_err(|e| SessionError::InvalidSnapshot(e.to_string()))
    }

    /// Copy the whole script as a JSON array of scenes with image prompts
    ///
    /// # Errors
    /// Returns `SessionError::InvalidSnapshot` if serialization fails.
    pub fn script_json(&self) -> Result<String, SessionError> {
        script_to_json(&self.scenes(), &self.assets.style())
            .map_err(|e| SessionError::InvalidSnapshot(e.to_string()))
    }

    /// Serialize the session and finished asset slots.
    ///
    /// Taken while a run is in flight, the snapshot holds the scenes produced
    /// so far.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidSnapshot` if settings fail to serialize.
    pub fn snapshot(&self) -> Result<serde_json::Value, SessionError> {
        let assets = self.assets.cache().snapshot();
        self.session.read().to_snapshot(assets)
    }

    /// Apply a saved blob with additive-replace semantics.
    ///
    /// A run in flight stops updating the session. Asset slots are replaced
    /// only when the blob carries them.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidSnapshot` if `data` is not an object.
    pub fn restore(&self, data: &serde_json::Value) -> Result<RestoreReport, SessionError> {
        let report = {
            let mut session = self.session.write();
            let report = session.apply_snapshot(data)?;
            self.run_epoch.fetch_add(1, Ordering::SeqCst);
            session.scene_count = clamp_to(&self.profile, session.scene_count);
            report
        };
        if let Some(assets) = &report.assets {
            let epoch = self.assets.cache().restore(assets.iter().cloned());
            tracing::debug!("{} restored {} asset slots at {}", self.tool, assets.len(), epoch);
        }
        let style = self.profile.style(&self.session.read().settings);
        self.assets.set_style(style);
        Ok(report)
    }

    /// Save the current session as a new vault record
    ///
    /// # Errors
    /// Returns `SessionError::Vault` if the record cannot be persisted.
    pub fn save(&self) -> Result<ProjectRecord, SessionError> {
        let data = self.snapshot()?;
        let title = self.profile.title_hint(&self.session.read());
        let record = self
            .vault
            .save(&self.tool, self.profile.category(), &title, data)?;
        self.notify(Notification::success(
            &self.tool,
            format!("Saved \"{}\"", record.title),
        ));
        Ok(record)
    }

    /// Act on an event if it is addressed to this panel
    ///
    /// # Errors
    /// Propagates save or restore failures.
    pub fn handle_event(&self, event: &StudioEvent) -> Result<EventOutcome, SessionError> {
        if !event.is_for(&self.tool) {
            return Ok(EventOutcome::Ignored);
        }
        match event {
            StudioEvent::RequestSave { .. } => Ok(EventOutcome::Saved(self.save()?)),
            StudioEvent::LoadProject(record) => {
                let report = self.restore(&record.data)?;
                tracing::info!("{} loaded project {}", self.tool, record.id);
                Ok(EventOutcome::Loaded(report))
            }
            StudioEvent::HistoryUpdated | StudioEvent::Notification(_) => Ok(EventOutcome::Ignored),
        }
    }

    /// Listen on the vault's bus until it closes
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut rx = self.vault.bus().subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Err(e) = this.handle_event(&event) {
                            tracing::warn!("{} failed to handle event: {}", this.tool, e);
                            this.notify(Notification::error(&this.tool, e.to_string()));
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!("{} missed {} events", this.tool, missed);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

fn clamp_to<P: PanelProfile>(profile: &P, count: u32) -> u32 {
    let range = profile.count_range();
    clamp_count(count, *range.start(), *range.end())
}
