use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use earshot_config::{Config, ConfigManager};
use std::path::PathBuf;

mod catalog;
mod commands;
mod player;

fn build_cli() -> Command {
    Command::new("earshot")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Audiobook player with resume, chapters and sleep timer")
        .arg(
            Arg::new("config-dir")
                .short('c')
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml (defaults to the platform config dir)")
                .global(true),
        )
        .arg(
            Arg::new("catalog")
                .long("catalog")
                .value_name("FILE")
                .help("Path to the catalog file, overriding the config")
                .global(true),
        )
        .subcommand(Command::new("list").about("List all books in the catalog"))
        .subcommand(
            Command::new("add")
                .about("Add an audiobook file to the catalog")
                .arg(Arg::new("path").required(true).value_name("FILE").help("Path to the audiobook file"))
                .arg(Arg::new("title").short('t').long("title").value_name("TITLE").help("Book title (optional)"))
                .arg(Arg::new("author").short('a').long("author").value_name("AUTHOR").help("Book author (optional)"))
                .arg(Arg::new("artwork").long("artwork").value_name("IMAGE").help("Cover art file (optional)"))
                .arg(
                    Arg::new("chapter")
                        .long("chapter")
                        .value_name("START=TITLE")
                        .help("Chapter marker, e.g. 1:05:00=Part Two (repeatable)")
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("play")
                .about("Play an audiobook")
                .arg(Arg::new("id").required(true).value_name("BOOK_ID").help("Book ID or unique ID prefix"))
                .arg(
                    Arg::new("sleep")
                        .long("sleep")
                        .value_name("MINUTES")
                        .help("Pause after this many minutes")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("rate")
                        .short('r')
                        .long("rate")
                        .value_name("RATE")
                        .help("Playback rate between 0.5 and 3.0")
                        .value_parser(value_parser!(f32)),
                ),
        )
        .subcommand(
            Command::new("reset")
                .about("Clear the saved position of a book")
                .arg(Arg::new("id").required(true).value_name("BOOK_ID").help("Book ID or unique ID prefix")),
        )
        .subcommand(
            Command::new("config")
                .about("Inspect or change settings")
                .subcommand_required(true)
                .subcommand(Command::new("path").about("Show where the config and catalog files live"))
                .subcommand(Command::new("show").about("Print the settings in effect, including EARSHOT_* overrides"))
                .subcommand(Command::new("init").about("Write a config file with default settings if there is none"))
                .subcommand(Command::new("reset").about("Replace the config file with defaults, keeping a backup"))
                .subcommand(Command::new("validate").about("Check the config file for out-of-range values"))
                .subcommand(
                    Command::new("set")
                        .about("Change one setting, e.g. player.skip_forward_secs 45")
                        .arg(Arg::new("key").required(true).value_name("SECTION.FIELD").help("Setting to change"))
                        .arg(Arg::new("value").required(true).value_name("VALUE").help("New value")),
                ),
        )
}

fn load_config(manager: &ConfigManager) -> Config {
    match manager.load_with_env_overrides() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {}; using default settings", e);
            Config::default()
        }
    }
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let manager = match matches.get_one::<String>("config-dir") {
        Some(dir) => ConfigManager::with_directory(PathBuf::from(dir)),
        None => ConfigManager::new(),
    }
    .context("Failed to locate configuration")?;
    let config = load_config(&manager);

    // RUST_LOG takes precedence over the configured level.
    env_logger::Builder::new()
        .filter_level(config.app.log_level.as_filter())
        .parse_default_env()
        .init();

    let catalog_path = matches
        .get_one::<String>("catalog")
        .map(PathBuf::from)
        .unwrap_or_else(|| manager.catalog_path(&config));
    log::debug!("Using catalog {}", catalog_path.display());

    match matches.subcommand() {
        Some(("list", _)) => commands::list_books(&catalog_path),
        Some(("add", sub_matches)) => commands::add_book(&catalog_path, &config, sub_matches),
        Some(("play", sub_matches)) => commands::play_book(&catalog_path, &config, sub_matches),
        Some(("reset", sub_matches)) => commands::reset_book(&catalog_path, sub_matches),
        Some(("config", sub_matches)) => commands::config_command(&manager, &config, sub_matches),
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
