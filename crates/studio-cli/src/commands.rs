//! Command handlers
//!
//! Handlers write their report to a caller-supplied writer so they can be
//! driven from tests without a terminal.

use anyhow::{bail, Context, Result};
use chrono::{Local, TimeZone};
use clap::ArgMatches;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use studio_assets::{is_wav, pcm_to_wav, PcmFormat};
use studio_core::{EventBus, ProjectRecord, StorageBackend, StudioConfig};
use studio_vault::{open_store, AlwaysConfirm, Confirmer, ProjectVault, Removal};
use tracing::{debug, info};
use uuid::Uuid;

/// Resolve the effective configuration from `--config`, the environment and
/// the global override flags
pub fn resolve_config(matches: &ArgMatches) -> Result<StudioConfig> {
    let path = matches.get_one::<PathBuf>("config");
    let mut config = StudioConfig::load(path.map(PathBuf::as_path))?;
    if let Some(dir) = matches.get_one::<PathBuf>("data-dir") {
        config = config.with_data_dir(dir.clone());
    }
    if let Some(backend) = matches.get_one::<String>("backend") {
        config = config.with_backend(backend.parse::<StorageBackend>()?);
    }
    config.validate()?;
    Ok(config)
}

/// Open the project vault described by `config`
pub fn open_vault(config: &StudioConfig) -> Result<ProjectVault> {
    let store = open_store(&config.storage).with_context(|| {
        format!(
            "opening {:?} storage in {}",
            config.storage.backend,
            config.storage.data_dir.display()
        )
    })?;
    Ok(ProjectVault::new(store, EventBus::default())
        .with_key(config.storage.history_key.clone())
        .with_config(&config.vault))
}

/// Asks on stderr and reads the answer from stdin
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Run the selected subcommand
pub async fn dispatch(
    matches: &ArgMatches,
    config: &StudioConfig,
    confirmer: &dyn Confirmer,
    out: &mut dyn Write,
) -> Result<()> {
    match matches.subcommand() {
        Some(("history", args)) => {
            let vault = open_vault(config)?;
            if args.subcommand_name() != Some("sweep") {
                let removed = vault.expiry_sweep()?;
                if removed > 0 {
                    info!("Removed {} expired projects on open", removed);
                }
            }
            run_history(args, &vault, confirmer, out)
        }
        Some(("audio", args)) => match args.subcommand() {
            Some(("wrap", wrap)) => {
                let input = required_path(wrap, "input")?;
                let output = required_path(wrap, "output")?;
                let format = PcmFormat::new(
                    wrap.get_one::<u32>("rate")
                        .copied()
                        .unwrap_or(config.assets.voice_sample_rate),
                    wrap.get_one::<u16>("channels")
                        .copied()
                        .unwrap_or(config.assets.voice_channels),
                );
                let written = wrap_pcm_file(input, output, format).await?;
                writeln!(out, "Wrote {written} bytes to {}", output.display())?;
                Ok(())
            }
            _ => bail!("unknown audio command"),
        },
        Some(("config", args)) => match args.subcommand() {
            Some(("show", _)) => {
                let text = toml::to_string_pretty(config).context("rendering configuration")?;
                write!(out, "{text}")?;
                Ok(())
            }
            _ => bail!("unknown config command"),
        },
        _ => bail!("no command given; see --help"),
    }
}

/// Run a `history` subcommand against `vault`
pub fn run_history(
    args: &ArgMatches,
    vault: &ProjectVault,
    confirmer: &dyn Confirmer,
    out: &mut dyn Write,
) -> Result<()> {
    match args.subcommand() {
        Some(("list", list)) => {
            let query = list.get_one::<String>("query").map(String::as_str).unwrap_or("");
            let records = vault.search(query)?;
            if list.get_flag("grouped") {
                let groups = studio_vault::group_by_recency(&records, &Local::now());
                if list.get_flag("json") {
                    let value = serde_json::json!({
                        "today": groups.today,
                        "yesterday": groups.yesterday,
                        "older": groups.older,
                    });
                    writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
                } else {
                    for (label, group) in groups.labeled() {
                        if group.is_empty() {
                            continue;
                        }
                        writeln!(out, "{label}")?;
                        for record in group {
                            write_record_line(out, record)?;
                        }
                    }
                }
            } else if list.get_flag("json") {
                writeln!(out, "{}", serde_json::to_string_pretty(&records)?)?;
            } else {
                for record in &records {
                    write_record_line(out, record)?;
                }
            }
            if records.is_empty() && !list.get_flag("json") {
                writeln!(out, "No saved projects")?;
            }
            Ok(())
        }
        Some(("export", export)) => {
            let path = required_path(export, "file")?;
            let count = vault.export_to_file(path)?;
            writeln!(out, "Exported {count} projects to {}", path.display())?;
            Ok(())
        }
        Some(("import", import)) => {
            let path = required_path(import, "file")?;
            let summary = vault.import_from_file(path)?;
            writeln!(
                out,
                "Imported {} projects ({} already present)",
                summary.added, summary.skipped
            )?;
            Ok(())
        }
        Some(("sweep", _)) => {
            let removed = vault.expiry_sweep()?;
            writeln!(out, "Removed {removed} expired projects")?;
            Ok(())
        }
        Some(("delete", delete)) => {
            let raw = delete
                .get_one::<String>("id")
                .context("missing project id")?;
            let id = Uuid::parse_str(raw).with_context(|| format!("invalid project id {raw:?}"))?;
            let removal = vault.delete(id, pick_confirmer(delete, confirmer))?;
            report_removal(out, removal, "project")
        }
        Some(("clear", clear)) => {
            let removal = vault.delete_all(pick_confirmer(clear, confirmer))?;
            report_removal(out, removal, "projects")
        }
        _ => bail!("unknown history command"),
    }
}

/// Wrap the PCM at `input` into a WAV at `output`; returns bytes written.
///
/// Input that is already a WAV is copied through unchanged.
pub async fn wrap_pcm_file(input: &Path, output: &Path, format: PcmFormat) -> Result<usize> {
    let pcm = tokio::fs::read(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    let wav = if is_wav(&pcm) {
        info!("{} already has a WAV header, copying", input.display());
        pcm
    } else {
        pcm_to_wav(&pcm, format)?
    };
    tokio::fs::write(output, &wav)
        .await
        .with_context(|| format!("writing {}", output.display()))?;
    debug!("Wrapped {} pcm bytes at {} Hz", wav.len(), format.sample_rate);
    Ok(wav.len())
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .with_context(|| format!("missing <{name}>"))
}

fn pick_confirmer<'a>(args: &ArgMatches, fallback: &'a dyn Confirmer) -> &'a dyn Confirmer {
    if args.get_flag("yes") {
        &AlwaysConfirm
    } else {
        fallback
    }
}

fn report_removal(out: &mut dyn Write, removal: Removal, noun: &str) -> Result<()> {
    match removal {
        Removal::Removed(n) => writeln!(out, "Deleted {n} {noun}")?,
        Removal::Cancelled => writeln!(out, "Cancelled")?,
        Removal::Nothing => writeln!(out, "Nothing to delete")?,
    }
    Ok(())
}

fn write_record_line(out: &mut dyn Write, record: &ProjectRecord) -> Result<()> {
    let when = Local
        .timestamp_millis_opt(record.timestamp)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| record.timestamp.to_string());
    writeln!(
        out,
        "{}  {}  {:<16} {}",
        record.id,
        when,
        record.tool.as_str(),
        record.title
    )?;
    Ok(())
}
