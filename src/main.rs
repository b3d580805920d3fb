use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use diner::logging::{LogFormat, init_logging};

mod cmd;

#[derive(Parser)]
#[command(name = "diner")]
#[command(version, about = "Phase orchestrator for the VR diner ordering experiment")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// Path to diner.toml
    #[arg(long, global = true, default_value = diner::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one participant session
    Run {
        /// Answer every panel from a script instead of reading stdin
        #[arg(long)]
        autopilot: bool,

        /// Dish the autopilot orders
        #[arg(long, default_value = "Set1")]
        order: String,

        /// Survey answers the autopilot gives (comma-separated option indices)
        #[arg(long, value_delimiter = ',', default_value = "0,0,0,0,0")]
        answers: Vec<u32>,

        /// Advance simulated time this many times faster than the wall clock
        #[arg(long, default_value = "1.0")]
        time_scale: f64,
    },
    /// Set or show the next participant
    Participant {
        #[command(subcommand)]
        command: ParticipantCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ParticipantCommands {
    /// Assign the participant id and, optionally, the condition (1-4)
    Set {
        id: String,
        #[arg(short, long)]
        condition: Option<u8>,
    },
    /// Show the identity the next run will use
    Show,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a starter diner.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, if cli.verbose { "debug" } else { "info" });

    match &cli.command {
        Commands::Run {
            autopilot,
            order,
            answers,
            time_scale,
        } => {
            let options = cmd::RunOptions {
                autopilot: *autopilot,
                order: order.clone(),
                answers: answers.clone(),
                time_scale: *time_scale,
            };
            cmd::cmd_run(&cli.config, options).await?;
        }
        Commands::Participant { command } => cmd::cmd_participant(&cli.config, command.clone())?,
        Commands::Config { command } => cmd::cmd_config(&cli.config, command.clone())?,
    }

    Ok(())
}
