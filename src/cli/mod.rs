//! CLI command handlers
//!
//! Each subcommand has its own module with handler functions.

pub mod config;
pub mod locate;
pub mod reverse;
pub mod search;
pub mod serve;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::{available_formats, get_formatter};
use crate::location::LocationSnapshot;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Property location resolution for solar estimates
#[derive(Parser)]
#[command(name = "solar-locate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for a location by name
    Search(search::SearchArgs),

    /// Look up the address of a coordinate
    Reverse(reverse::ReverseArgs),

    /// Find the current location by IP address
    Locate(locate::LocateArgs),

    /// Start web server (foreground)
    Serve(serve::ServeArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Search(args) => {
            init_logging("warn");
            search::run(args).await
        }
        Commands::Reverse(args) => {
            init_logging("warn");
            reverse::run(args).await
        }
        Commands::Locate(args) => {
            init_logging("warn");
            locate::run(args).await
        }
        Commands::Serve(args) => {
            init_logging("info");
            serve::run(args).await
        }
        Commands::Config(args) => config::run(args),
    }
}

/// Install the tracing subscriber; `RUST_LOG` overrides `default`
pub fn init_logging(default: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Format a snapshot and print it or write it to a file
pub(crate) fn emit(
    snapshot: &LocationSnapshot,
    format: &str,
    output: Option<&str>,
    config: &Config,
) -> Result<()> {
    let formatter =
        get_formatter(format).ok_or_else(|| Error::Config(format!("Unknown format: {}", format)))?;
    let text = formatter.format(snapshot, config)?;

    if let Some(path) = output {
        std::fs::write(path, &text)?;
        eprintln!("Output written to {}", path);
    } else {
        println!("{}", text.trim_end());
    }
    Ok(())
}

/// Print available output formats
pub(crate) fn list_formats() {
    println!("Available output formats:");
    for format in available_formats() {
        println!("  {:6} - {}", format.name, format.description);
    }
}
