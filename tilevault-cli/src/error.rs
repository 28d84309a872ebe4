//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use tilevault::config::ConfigFileError;
use tilevault::coord::CoordError;
use tilevault::engine::ResolveError;
use tilevault::fetch::FetchError;
use tilevault::seed::SeedError;
use tilevault::store::StoreError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Tile store could not be opened or queried
    Store(StoreError),
    /// HTTP client could not be built
    Http(FetchError),
    /// Requested tile is not on the grid
    InvalidTile(CoordError),
    /// Tile could not be resolved
    Resolve(ResolveError),
    /// Seed job could not be planned
    Seed(SeedError),
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
    /// Async runtime could not be started
    Runtime(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Seed(SeedError::SizeLimitExceeded { .. }) => {
                eprintln!();
                eprintln!("Narrow the region, lower --max-zoom, or raise size_limit");
                eprintln!("in the [cache] section of config.ini.");
            }
            CliError::Resolve(ResolveError::Fetch { .. }) => {
                eprintln!();
                eprintln!("The tile is not cached and the server could not be reached.");
                eprintln!("Check the source url and your network connection.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Store(e) => write!(f, "Tile store error: {}", e),
            CliError::Http(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::InvalidTile(e) => write!(f, "{}", e),
            CliError::Resolve(e) => write!(f, "Failed to load tile: {}", e),
            CliError::Seed(e) => write!(f, "Failed to seed region: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Store(e) => Some(e),
            CliError::Http(e) => Some(e),
            CliError::InvalidTile(e) => Some(e),
            CliError::Resolve(e) => Some(e),
            CliError::Seed(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<ResolveError> for CliError {
    fn from(e: ResolveError) -> Self {
        CliError::Resolve(e)
    }
}

impl From<SeedError> for CliError {
    fn from(e: SeedError) -> Self {
        CliError::Seed(e)
    }
}
