//! Command line definition

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

/// Build the `studio` command
#[must_use]
pub fn build_cli() -> Command {
    Command::new("studio")
        .version(studio_core::VERSION)
        .about("Media studio project history and audio tools")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to studio.toml"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Override the storage directory"),
        )
        .arg(
            Arg::new("backend")
                .long("backend")
                .global(true)
                .value_parser(["memory", "file", "sled"])
                .help("Override the storage backend"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(history_command())
        .subcommand(
            Command::new("audio")
                .about("Audio utilities")
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("wrap")
                        .about("Wrap headerless 16-bit PCM in a WAV header")
                        .arg(
                            Arg::new("input")
                                .required(true)
                                .value_parser(value_parser!(PathBuf))
                                .help("Raw PCM file"),
                        )
                        .arg(
                            Arg::new("output")
                                .required(true)
                                .value_parser(value_parser!(PathBuf))
                                .help("WAV file to write"),
                        )
                        .arg(
                            Arg::new("rate")
                                .long("rate")
                                .value_parser(value_parser!(u32))
                                .help("Sample rate in Hz (default from config)"),
                        )
                        .arg(
                            Arg::new("channels")
                                .long("channels")
                                .value_parser(value_parser!(u16))
                                .help("Channel count (default from config)"),
                        ),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Configuration")
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print the effective configuration")),
        )
}

fn history_command() -> Command {
    Command::new("history")
        .about("Saved project history; expired projects are swept on open")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("list")
                .about("List saved projects, newest first")
                .arg(
                    Arg::new("query")
                        .long("query")
                        .short('q')
                        .help("Case-insensitive filter over title and tool"),
                )
                .arg(
                    Arg::new("grouped")
                        .long("grouped")
                        .action(ArgAction::SetTrue)
                        .help("Group into Today / Yesterday / Older"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Write the full history to a JSON file")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Merge an exported JSON file into the history")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(Command::new("sweep").about("Remove projects past the retention window"))
        .subcommand(
            Command::new("delete")
                .about("Delete one project")
                .arg(Arg::new("id").required(true).help("Project id"))
                .arg(yes_arg()),
        )
        .subcommand(
            Command::new("clear")
                .about("Delete every project")
                .arg(yes_arg()),
        )
}

fn yes_arg() -> Arg {
    Arg::new("yes")
        .long("yes")
        .short('y')
        .action(ArgAction::SetTrue)
        .help("Do not ask for confirmation")
}
