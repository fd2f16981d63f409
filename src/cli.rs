// CLI module - command-line argument parsing and handlers
//
// Provides subcommands for configuration management:
// - config --show: Display effective configuration
// - config --path: Show config file path
// - config --init: Write a default config file if none exists

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{Config, VERSION};

/// a2o - Anthropic Messages to OpenAI Chat Completions proxy
#[derive(Parser)]
#[command(name = "a2o")]
#[command(version = VERSION)]
#[command(
    about = "Serve the Anthropic Messages API on top of OpenAI-compatible backends",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,

        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Handle CLI commands. Returns true if a command was handled (exit after).
pub fn handle_cli() -> Result<bool> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { show, path, init }) => {
            if path {
                handle_config_path()?;
            } else if show {
                handle_config_show()?;
            } else if init {
                handle_config_init()?;
            } else {
                // No flag provided, show help
                println!("Usage: a2o config [--show|--path|--init]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --path    Show config file path");
                println!("  --init    Write a default config file if none exists");
            }
            Ok(true)
        }
        None => Ok(false), // No subcommand, run normal proxy
    }
}

fn handle_config_path() -> Result<()> {
    let path = Config::config_path().context("Could not determine config path")?;
    println!("{}", path.display());
    Ok(())
}

fn handle_config_show() -> Result<()> {
    let config = Config::load_unchecked()?;

    println!("# Effective configuration (env > file > defaults)");
    println!();
    print!("{}", config.to_toml());

    // Show source info
    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
    if let Err(e) = config.validate() {
        println!("# Warning: {:#}", e);
    }
    Ok(())
}

fn handle_config_init() -> Result<()> {
    match Config::write_default_file()? {
        Some(path) => println!("Created config file: {}", path.display()),
        None => {
            if let Some(path) = Config::config_path() {
                println!("Config file already exists: {}", path.display());
            }
        }
    }
    Ok(())
}
