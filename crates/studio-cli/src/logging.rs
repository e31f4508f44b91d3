//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter; `RUST_LOG` is the fallback
pub const LOG_ENV: &str = "STUDIO_LOG";

/// Install the global subscriber, writing to stderr.
///
/// Filter comes from `STUDIO_LOG`, then `RUST_LOG`, then `info`.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
