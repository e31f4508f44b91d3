use anyhow::Result;
use studio_cli::{build_cli, dispatch, init_tracing, resolve_config, StdinConfirmer};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = resolve_config(&matches)?;
    let mut stdout = std::io::stdout().lock();
    dispatch(&matches, &config, &StdinConfirmer, &mut stdout).await
}
