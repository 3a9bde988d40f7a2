//! MiniLabo CLI
//!
//! Host-side driver for the MiniLabo firmware core: runs the main loop
//! against a directory standing in for the flash filesystem, and edits
//! configuration areas and reads the device log offline.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use minilabo_core::Config;

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "minilabo")]
#[command(about = "MiniLabo - configuration areas and device log")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level tracing on stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the main loop until Ctrl-C
    Run {
        /// Stop after this many milliseconds
        #[arg(long)]
        duration_ms: Option<u64>,
        /// Scheduler tick period in milliseconds
        #[arg(long, default_value_t = 50)]
        tick_ms: u64,
    },
    /// List configuration areas
    Areas,
    /// Show or replace an area document
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Show the tail of the device log file
    Logs {
        /// Number of lines
        #[arg(short = 'n', long, default_value_t = 50)]
        lines: usize,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print an area document
    Show {
        /// Area name (general, network, io, dmm, scope, funcgen, math)
        area: String,
    },
    /// Replace an area document with the given JSON
    Set {
        /// Area name
        area: String,
        /// Complete JSON document
        json: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Run {
            duration_ms,
            tick_ms,
        } => commands::run::run(config, duration_ms, tick_ms, &output).await,
        Commands::Areas => commands::areas::list(&config, &output),
        Commands::Config { command } => handle_config_command(command, config, &output),
        Commands::Logs { lines } => commands::logs::show(&config, lines, &output),
    }
}

fn handle_config_command(command: ConfigCommands, config: Config, output: &Output) -> Result<()> {
    match command {
        ConfigCommands::Show { area } => commands::config::show(config, area, output),
        ConfigCommands::Set { area, json } => commands::config::set(config, area, json, output),
    }
}

/// Install the tracing subscriber
///
/// Writes to `config.log_file` when set, stderr otherwise.
fn init_logging(config: &Config, verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "minilabo_core={},minilabo_cli={}",
            default_level, default_level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    if let Some(log_path) = &config.log_file {
        match File::create(log_path) {
            Ok(file) => {
                let _ = builder.with_ansi(false).with_writer(file).try_init();
                return;
            }
            Err(e) => {
                eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            }
        }
    }

    let _ = builder.with_writer(std::io::stderr).try_init();
}
