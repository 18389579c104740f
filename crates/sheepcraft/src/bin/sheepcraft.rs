//! sheepcraft: run level scripts against the script guest from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Run a script on a level and report the solve state
//! sheepcraft run solution.goose --guest goose.wasm --level level1.toml
//!
//! # Inspect what the guest makes of a script
//! sheepcraft tokenize solution.goose --guest goose.wasm
//! sheepcraft parse solution.goose --guest goose.wasm
//!
//! # List the action functions scripts can call
//! sheepcraft docs
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info, warn};
use sheep_script::Instrumentor;
use sheep_wasm_engine::{BridgeConfig, GuestBridge, GuestRunner};
use sheepcraft::{load_board, Playthrough, RunFailure, RunOutcome, ENTRY_NAME};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

/// Run sheepcraft scripts against the script guest.
#[derive(Parser, Debug)]
#[command(name = "sheepcraft")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a script on a level and report the solve state
    Run {
        /// Script source file
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        #[command(flatten)]
        guest: GuestArgs,

        /// Level description (TOML)
        #[arg(short, long)]
        level: PathBuf,

        /// Pause between replayed actions, in milliseconds
        #[arg(long, default_value = "400")]
        delay_ms: u64,
    },

    /// Print the guest's token listing for a script
    Tokenize {
        /// Script source file
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        #[command(flatten)]
        guest: GuestArgs,
    },

    /// Print the guest's parse diagnostics for a script
    Parse {
        /// Script source file
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        #[command(flatten)]
        guest: GuestArgs,
    },

    /// List the action functions available to scripts
    Docs,
}

#[derive(clap::Args, Debug)]
struct GuestArgs {
    /// Guest module (.wasm or .wat)
    #[arg(short, long)]
    guest: PathBuf,

    /// Bridge configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl GuestArgs {
    async fn start(&self) -> anyhow::Result<GuestBridge> {
        let config = match &self.config {
            Some(path) => BridgeConfig::load(path)
                .with_context(|| format!("loading bridge config {}", path.display()))?,
            None => BridgeConfig::default(),
        };

        info!("Loading guest: {}", self.guest.display());
        let runner = GuestRunner::from_file(&self.guest, config)
            .with_context(|| format!("compiling guest {}", self.guest.display()))?;
        let bridge = GuestBridge::spawn(runner)?;
        bridge.init().await.context("starting guest")?;
        Ok(bridge)
    }
}

fn read_script(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading script {}", path.display()))
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run(args.command).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Run {
            script,
            guest,
            level,
            delay_ms,
        } => {
            let source = read_script(&script)?;
            let mut board = load_board(&level)
                .with_context(|| format!("loading level {}", level.display()))?;
            let bridge = guest.start().await?;

            let playthrough = Playthrough::new().with_delay(Duration::from_millis(delay_ms));
            let outcome = playthrough.run(&bridge, &mut board, &source).await?;

            for line in outcome.output() {
                println!("{line}");
            }
            if let RunOutcome::Failed { failure, .. } = &outcome {
                warn!("Run failed: {}", failure);
                if let RunFailure::Protocol { stderr, .. } = failure {
                    if !stderr.is_empty() {
                        warn!("Guest stderr: {}", stderr);
                    }
                }
            }
            println!("{}", serde_json::to_string_pretty(outcome.solve())?);

            if !outcome.solved() {
                bail!("level not solved");
            }
            info!("Level solved");
        }
        Command::Tokenize { script, guest } => {
            let source = read_script(&script)?;
            let bridge = guest.start().await?;
            println!("{}", bridge.tokenize(ENTRY_NAME, &source).await?);
        }
        Command::Parse { script, guest } => {
            let source = read_script(&script)?;
            let bridge = guest.start().await?;
            println!("{}", bridge.parse(ENTRY_NAME, &source).await?);
        }
        Command::Docs => {
            for (signature, description) in Instrumentor::documentation() {
                println!("{signature:<20} {description}");
            }
        }
    }
    Ok(())
}
