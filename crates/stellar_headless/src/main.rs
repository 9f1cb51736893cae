//! Headless turn host.
//!
//! # Usage
//!
//! ```bash
//! # Generate one year, overwriting the game file
//! cargo run -p stellar_headless -- generate --game galaxy.ron
//!
//! # Generate five years into a new file, with debug logs
//! cargo run -p stellar_headless -- -v generate --game galaxy.ron --turns 5 --output galaxy-5.ron
//!
//! # Check a rules file
//! cargo run -p stellar_headless -- validate --rules rules.ron
//! ```
//!
//! Reports are printed to stdout as JSON. Logs go to stderr; `RUST_LOG`
//! overrides the level chosen by `-v`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stellar_headless::{HeadlessRunner, RunConfig, RunnerError};

#[derive(Parser)]
#[command(name = "stellar_headless")]
#[command(about = "Generate turns for saved games without a client")]
#[command(version)]
struct Cli {
    /// Enable debug logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate years for a saved game
    Generate {
        /// Game file (RON)
        #[arg(short, long)]
        game: PathBuf,

        /// Number of years to generate
        #[arg(short, long, default_value = "1")]
        turns: u32,

        /// Where to save the game (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that a rules file loads and is consistent
    Validate {
        /// Rules file (RON)
        #[arg(short, long)]
        rules: PathBuf,
    },
}

#[derive(Serialize)]
struct ValidationReport {
    path: String,
    valid: bool,
    seed: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs on stderr; stdout carries the JSON report.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Generate { game, turns, output } => cmd_generate(game, turns, output),
        Commands::Validate { rules } => cmd_validate(rules),
    };

    match result {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn cmd_generate(game: PathBuf, turns: u32, output: Option<PathBuf>) -> Result<String, RunnerError> {
    let mut config = RunConfig::new(game).with_turns(turns);
    config.output = output;
    let report = HeadlessRunner::new().run(&config)?;
    Ok(report.to_json()?)
}

fn cmd_validate(path: PathBuf) -> Result<String, RunnerError> {
    let rules = HeadlessRunner::validate_rules(&path)?;
    to_json(&ValidationReport {
        path: path.display().to_string(),
        valid: true,
        seed: rules.seed,
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String, RunnerError> {
    Ok(serde_json::to_string_pretty(value)?)
}
