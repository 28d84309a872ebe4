//! TileVault CLI - Command-line interface
//!
//! This binary provides a command-line interface to the TileVault library:
//! fetch single tiles through the cache, seed whole regions, and inspect or
//! clear the on-disk store.

mod commands;
mod error;

use std::future::Future;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tilevault::config::ConfigFile;
use tilevault::logging::{init_logging, LoggingGuard, DEFAULT_LOG_FILE};
use tracing::info;

use commands::cache::CacheAction;
use commands::common::{load_config, GlobalArgs};
use commands::config::ConfigCommands;
use commands::get::GetArgs;
use commands::inspect::InspectArgs;
use commands::seed::SeedArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "tilevault")]
#[command(version = tilevault::VERSION)]
#[command(about = "Persistent map tile cache with offline seeding", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.tilevault/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serve tiles from the store only, never from the network
    #[arg(long, global = true)]
    offline: bool,

    /// Do not write fetched tiles to the store
    #[arg(long, global = true)]
    no_save: bool,

    /// Override the source URL template
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one tile through the cache
    Get(GetArgs),

    /// Prefetch every tile of a region
    Seed(SeedArgs),

    /// Show what the store holds for one tile
    Inspect(InspectArgs),

    /// Manage the tile store
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// View or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let globals = GlobalArgs {
        config: cli.config,
        offline: cli.offline,
        no_save: cli.no_save,
        url: cli.url,
    };

    match cli.command {
        Commands::Config { command } => commands::config::run(command, &globals),
        Commands::Cache { action } => {
            let (config, _logging) = start(&globals, "cache")?;
            commands::cache::run(&config, action)
        }
        Commands::Get(args) => {
            let (config, _logging) = start(&globals, "get")?;
            block_on(commands::get::run(&config, args))
        }
        Commands::Seed(args) => {
            let (config, _logging) = start(&globals, "seed")?;
            block_on(commands::seed::run(&config, args))
        }
        Commands::Inspect(args) => {
            let (config, _logging) = start(&globals, "inspect")?;
            block_on(commands::inspect::run(&config, args))
        }
    }
}

/// Load configuration and start logging. Keep the guard alive until exit.
fn start(globals: &GlobalArgs, command: &str) -> Result<(ConfigFile, LoggingGuard), CliError> {
    let config = load_config(globals)?;
    let guard = init_logging(&config.logging.directory, DEFAULT_LOG_FILE)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    info!(
        version = tilevault::VERSION,
        command,
        store = %config.store.directory.display(),
        offline = config.cache.offline,
        "TileVault starting"
    );

    Ok((config, guard))
}

fn block_on<F>(future: F) -> Result<(), CliError>
where
    F: Future<Output = Result<(), CliError>>,
{
    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    runtime.block_on(future)
}
