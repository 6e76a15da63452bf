use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::{ConfigLoader, ConfigPaths};
use crate::storage;

pub mod commands;

use self::commands::{
    BulkEditArgs, ExportArgs, FolderArgs, IdsArgs, ImportArgs, ListArgs, MoveArgs, PrefsArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "checklist",
    version,
    about = "Terminal dashboard for uptime checks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over CHECKLIST_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over CHECKLIST_DATA)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Preference profile to read and write (defaults to the one in config)
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive dashboard (default)
    Tui,
    /// Load check records from a JSON array (file or stdin)
    Import(ImportArgs),
    /// Write every stored check as JSON
    Export(ExportArgs),
    /// Print checks using the saved sort and grouping
    List(ListArgs),
    /// Apply the same settings to several checks at once
    BulkEdit(BulkEditArgs),
    /// Move a check into a folder, or out of every folder
    Folder(FolderArgs),
    /// Pause checks
    Pause(IdsArgs),
    /// Resume paused checks
    Resume(IdsArgs),
    /// Delete checks
    Delete(IdsArgs),
    /// Schedule an immediate run of a check
    CheckNow(IdsArgs),
    /// Move a check within the custom order
    Move(MoveArgs),
    /// Inspect or change saved view preferences
    Prefs(PrefsArgs),
}

/// Where log lines go. The dashboard owns the terminal, so it logs to a file.
enum LogTarget {
    Stderr,
    File(PathBuf),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut paths = ConfigPaths::discover()?;
    if let Some(file) = cli.config.clone() {
        paths = paths.with_config_file(file);
    }
    if let Some(dir) = cli.data_dir.clone() {
        paths = paths.with_data_dir(dir);
    }
    paths.ensure_directories()?;
    let loader = ConfigLoader::from_paths(paths.clone());

    let command = cli.command.unwrap_or(Commands::Tui);
    let target = if matches!(command, Commands::Tui) {
        LogTarget::File(paths.log_file())
    } else {
        LogTarget::Stderr
    };
    init_tracing(&cli.log_level, target)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let mut config = loader.load_or_init()?;
    if let Some(profile) = cli.profile.filter(|p| !p.trim().is_empty()) {
        config.profile = profile;
    }
    let storage = storage::init(&paths, &config.storage)?;
    let config = Arc::new(config);

    match command {
        Commands::Tui => {
            let mut app = App::new(config, storage)?;
            commands::run_tui(&mut app)
        }
        Commands::Import(args) => commands::import_checks(&storage, args),
        Commands::Export(args) => commands::export_checks(&storage, args),
        Commands::List(args) => commands::list_checks(config, storage, args),
        Commands::BulkEdit(args) => commands::bulk_edit(config, &storage, args),
        Commands::Folder(args) => commands::set_folder(&storage, args),
        Commands::Pause(args) => commands::set_paused(&storage, args, true),
        Commands::Resume(args) => commands::set_paused(&storage, args, false),
        Commands::Delete(args) => commands::delete_checks(&storage, args),
        Commands::CheckNow(args) => commands::check_now(&storage, args),
        Commands::Move(args) => commands::move_check(&storage, args),
        Commands::Prefs(args) => commands::handle_prefs_command(config, storage, args),
    }
}

fn init_tracing(level: &str, target: LogTarget) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match target {
            LogTarget::Stderr => fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init(),
            LogTarget::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init()
            }
        }
        Ok::<(), anyhow::Error>(())
    })
    .map(|_| ())
}
