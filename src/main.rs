//! boardid - Board identification EEPROM tool
//!
//! Detects, reads, programs and clears the identity EEPROM carried by each
//! board of an assembly.
//!
//! # Architecture
//!
//! The assembly topology (which boards sit at which bus address, which are
//! optional) and the write/clear gates come from a deploy-time TOML
//! configuration. Board type and model names come from a JSON table. Both
//! are loaded here and handed to `boardid_core::BoardCollection`, which
//! does the actual work over the buses opened by the selected transport.

mod cli;
mod commands;
mod prompt;
mod transports;

use clap::Parser;
use cli::{Cli, Commands};

use boardid_core::{BoardCollection, BoardTypeTable, Config};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration files tried when `--config` is not given
const DEFAULT_CONFIG_PATHS: &[&str] = &["boardid.toml", "/etc/boardid/config.toml"];

/// Board type tables tried when neither `--board-types` nor the
/// configuration names one
const DEFAULT_TABLE_PATHS: &[&str] = &["board_types.json", "/usr/share/boardid/board_types.json"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::ListTransports => {
            commands::list_transports();
            return Ok(());
        }
        Commands::ListTypes => {
            // The configuration is only consulted for its table path here
            let table_from_config = find_config(cli.config.as_deref())
                .and_then(|path| Config::from_toml_file(path).ok())
                .and_then(|config| config.board_types);
            let table = load_board_types(cli.board_types.as_deref(), table_from_config.as_deref())?;
            commands::list_types(&table);
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(cli.config.as_deref())?;
    let table = load_board_types(cli.board_types.as_deref(), config.board_types.as_deref())?;
    log::info!(
        "Loaded {} slots and {} board types",
        config.slots.len(),
        table.len()
    );

    let mut buses = transports::open_buses(&cli.transport, &config)?;
    let mut collection = BoardCollection::new(&config, Arc::new(table), &mut buses)?;

    match cli.command {
        Commands::Probe => commands::probe::run_probe(&collection),
        Commands::Read => commands::read::run_read(&mut collection, &mut buses),
        Commands::Write { from_device } => commands::write::run_write(
            &mut collection,
            &mut buses,
            cli.script.as_deref(),
            from_device,
        ),
        Commands::Clear { half } => commands::clear::run_clear(&mut collection, &mut buses, half),
        Commands::ListTypes | Commands::ListTransports => Ok(()),
    }
}

/// First configuration file that exists, explicit path first
fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    DEFAULT_CONFIG_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}

/// Load the configuration from the specified path or default locations
fn load_config(explicit: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = find_config(explicit).ok_or_else(|| {
        format!(
            "No configuration found (tried {}); use --config",
            DEFAULT_CONFIG_PATHS.join(", ")
        )
    })?;

    let config = Config::from_toml_file(&path)
        .map_err(|e| format!("Failed to load configuration {}: {}", path.display(), e))?;
    log::debug!("Loaded configuration from {}", path.display());

    if !config.protection.write_enable {
        log::debug!("write_enable is off in {}", path.display());
    }
    if !config.protection.clear_enable {
        log::debug!("clear_enable is off in {}", path.display());
    }
    Ok(config)
}

/// Load the board type table
///
/// Order: `--board-types`, the configuration's `board_types`, then the
/// default locations.
fn load_board_types(
    explicit: Option<&Path>,
    from_config: Option<&Path>,
) -> Result<BoardTypeTable, Box<dyn std::error::Error>> {
    if let Some(path) = explicit.or(from_config) {
        if !path.is_file() {
            return Err(format!("Board type table not found: {}", path.display()).into());
        }
        return Ok(BoardTypeTable::load_file(path)?);
    }

    for path in DEFAULT_TABLE_PATHS.iter().map(Path::new) {
        if path.is_file() {
            match BoardTypeTable::load_file(path) {
                Ok(table) => {
                    log::debug!("Loaded {} board types from {}", table.len(), path.display());
                    return Ok(table);
                }
                Err(e) => {
                    log::warn!("Failed to load board types from {}: {}", path.display(), e);
                }
            }
        }
    }

    Err(format!(
        "No board type table found (tried {}); use --board-types",
        DEFAULT_TABLE_PATHS.join(", ")
    )
    .into())
}
