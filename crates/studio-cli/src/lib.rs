//! Studio CLI - command line access to the project vault
//!
//! Provides:
//! - [`build_cli`]: the `studio` command definition
//! - [`dispatch`]: history, audio and config handlers
//! - [`init_tracing`]: stderr logging filtered by `STUDIO_LOG`

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cli;
pub mod commands;
pub mod logging;

pub use cli::build_cli;
pub use commands::{
    dispatch, open_vault, resolve_config, run_history, wrap_pcm_file, StdinConfirmer,
};
pub use logging::{init_tracing, LOG_ENV};
