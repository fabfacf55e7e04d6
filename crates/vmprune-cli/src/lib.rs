//! # vmprune CLI
//!
//! Command-line interface for vmprune.
//! This crate provides the CLI structure, argument parsing, and command routing.

pub mod commands;
pub mod config;
pub mod display;

// Re-export common types
pub use config::Config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

/// Application-level errors for the CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Cleanup error: {0}")]
    Core(#[from] vmprune_core::CleanupError),

    #[error("API error: {0}")]
    Api(#[from] vmprune_api::ApiError),

    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl From<dialoguer::Error> for CliError {
    fn from(err: dialoguer::Error) -> Self {
        CliError::OperationFailed(format!("Input error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Main CLI struct
#[derive(Parser, Debug)]
#[command(name = "vmprune")]
#[command(about = "Prune old versions of vSphere VM images")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Use this config file instead of the default one
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// All available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Delete old images, keeping the newest ones
    Clean(commands::clean::CleanArgs),
    /// Show what `clean` would delete without touching anything
    Plan(commands::clean::PolicyArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Print the config file location
    Path,
    /// Set configuration value
    Set {
        /// Configuration key, e.g. `cleanup.keep_images`
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get configuration value
    Get {
        /// Configuration key, e.g. `vcenter.server`
        key: String,
    },
}

/// Main CLI runner
pub async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::new()?,
    };

    match cli.command {
        Commands::Clean(args) => commands::clean::handle(args, &config).await,
        Commands::Plan(args) => commands::clean::handle_plan(args, &config).await,
        Commands::Config { action } => commands::config::handle(action, config).await,
    }
}
