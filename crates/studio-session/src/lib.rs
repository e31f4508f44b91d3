//! Studio Session - panels and the studio shell
//!
//! Provides:
//! - [`GenerationSession`]: per-panel working state with additive-replace restore
//! - [`PanelProfile`] and the built-in [`StoryPanel`] / [`SurvivalPanel`]
//! - [`PanelController`]: script runs, asset requests, save and load
//! - [`Studio`]: the shell routing save/load events to the active panel
//!
//! # Example
//!
//! ```rust,ignore
//! use studio_session::{PanelController, Studio, StoryPanel};
//!
//! let studio = Studio::start(vault.clone())?;
//! let story = Arc::new(PanelController::with_services(StoryPanel, script, assets, vault, &config));
//! story.listen();
//! studio.activate(story.tool().clone());
//!
//! story.set_master_prompt("A lighthouse keeper's last night");
//! story.generate_script().await?;
//! studio.request_save();
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod panel;
pub mod panels;
pub mod profile;
pub mod session;
pub mod studio;

pub use error::SessionError;
pub use panel::{EventOutcome, PanelController};
pub use panels::{StoryPanel, StorySettings, SurvivalPanel, SurvivalSettings, STORY_TOOL, SURVIVAL_TOOL};
pub use profile::PanelProfile;
pub use session::{merge_settings, GenerationSession, RestoreReport, SessionSnapshot};
pub use studio::Studio;
