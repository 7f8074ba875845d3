//! Stitch CLI - build, sign and inspect Fabric protocol messages
//!
//! This CLI gives operators a terminal interface to:
//! - Parse, render and evaluate endorsement policies
//! - Build and inspect signed endorsement proposals
//! - Build signed `_lifecycle` proposals for install, approve and commit

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stitch_crypto::SoftwareCryptoProvider;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use commands::{lifecycle, policy, proposal};
use config::CliConfig;
use output::Output;

/// Stitch CLI application
#[derive(Parser)]
#[command(name = "stitchctl")]
#[command(about = "Stitch - Fabric protocol message toolkit", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "STITCH_CONFIG")]
    config: Option<String>,

    /// Log level (overrides the configured one)
    #[arg(long, env = "STITCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Endorsement policy tools
    Policy {
        #[command(subcommand)]
        command: policy::PolicyCommands,
    },

    /// Endorsement proposals and transactions
    Proposal {
        #[command(subcommand)]
        command: proposal::ProposalCommands,
    },

    /// Chaincode lifecycle proposals
    #[command(alias = "cc")]
    Lifecycle {
        #[command(subcommand)]
        command: lifecycle::LifecycleCommands,
    },

    /// Show the effective configuration
    Config,
}

fn init_tracing(level: &str, json: bool) {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());

    // Logs go to stderr so command output stays pipeable.
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<Output> {
    let config = CliConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let level = cli.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    init_tracing(&level, cli.json || config.logging.json);

    let crypto = SoftwareCryptoProvider::new();
    match cli.command {
        Commands::Policy { command } => policy::execute(command),
        Commands::Proposal { command } => proposal::execute(command, &config, &crypto).await,
        Commands::Lifecycle { command } => lifecycle::execute(command, &config, &crypto).await,
        Commands::Config => Output::json(&config),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await.and_then(|output| output.render()) {
        Ok(rendered) => {
            println!("{rendered}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
