mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::debug;

use modhost_core::storage::config::default_config_path;

/// modhost: sandboxed game extensions and mod management
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Configuration file (JSON, YAML or TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage game extensions
    Extensions {
        #[command(subcommand)]
        command: ExtensionCommand,
    },
    /// Detect, manage and unmanage games
    Game {
        #[command(subcommand)]
        command: GameCommand,
    },
    /// Install and toggle mods
    Mods {
        #[command(subcommand)]
        command: ModCommand,
    },
    /// Guess name, external id and version from an archive file name
    ParseName {
        /// File name, with or without its extension
        filename: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExtensionCommand {
    /// List loaded extensions
    List,
    /// Enable an extension (takes effect on next start)
    Enable { name: String },
    /// Disable an extension (takes effect on next start)
    Disable { name: String },
}

#[derive(Subcommand, Debug)]
pub enum GameCommand {
    /// Ask a game's extension which candidate directory is its install
    Detect {
        game: String,
        candidates: Vec<PathBuf>,
    },
    /// Start managing a game, optionally recording its install path
    Manage {
        game: String,
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Disable all mods and stop managing a game
    Unmanage { game: String },
}

#[derive(Subcommand, Debug)]
pub enum ModCommand {
    /// List installed mods of a game
    List { game: String },
    /// Stage an archive or directory as a mod
    Install(InstallArgs),
    Enable { game: String, id: String },
    Disable { game: String, id: String },
    /// Disable a mod and remove it from the manifest and staging
    Delete { game: String, id: String },
    DisableAll { game: String },
    /// Ask the game's extension whether a newer version exists
    CheckUpdate { game: String, id: String },
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    pub game: String,
    pub archive: PathBuf,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long = "type")]
    pub mod_type: Option<String>,
    #[arg(long)]
    pub version: Option<String>,
    #[arg(long)]
    pub external_id: Option<String>,
    #[arg(long)]
    pub note: Option<String>,
    /// Enable right after staging
    #[arg(long)]
    pub enable: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env = env_logger::Env::default().default_filter_or(default_level);
    // Ignore the error if a logger is already installed
    let _ = env_logger::Builder::from_env(env).format_timestamp(None).try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    let config_path = args.config.unwrap_or_else(default_config_path);
    debug!("Using configuration at {}", config_path.display());

    match cli::run(&config_path, args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
