//! Studio Script - batched scene generation
//!
//! Turns a master prompt into a numbered, continuity-consistent list of
//! scenes by calling an external [`ScriptService`] in sequential batches.
//!
//! # Example
//!
//! ```rust,ignore
//! use studio_script::{SceneBatchGenerator, ScriptRequest};
//!
//! let generator = SceneBatchGenerator::new(service, config.script);
//! let run = generator
//!     .generate(ScriptRequest::new("A lighthouse keeper's last night", 25).with_batch_size(10))
//!     .await?;
//! assert_eq!(run.scenes.len(), 25);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod generator;
pub mod parse;
pub mod plan;
pub mod service;

pub use error::{BatchFailure, ReplyError, ScriptError};
pub use generator::{RunStatus, SceneBatchGenerator, ScriptProgress, ScriptRequest, ScriptRun};
pub use parse::parse_reply;
pub use plan::{clamp_count, plan_batches, BatchPlan, FidelityMode};
pub use service::{BatchRequest, ContinuityHint, ScriptService};
