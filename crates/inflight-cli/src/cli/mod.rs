//! CLI for the inflight request coordinator.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use inflight_core::config;

use commands::{
    run_completions, run_man, run_schedule, run_show_config, run_simulate, SimulateArgs, Step,
};

/// Top-level CLI for the inflight request coordinator.
#[derive(Debug, Parser)]
#[command(name = "inflight")]
#[command(about = "inflight: single-flight request coordination with retry/backoff", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Print the backoff schedule of the configured retry policy.
    Schedule {
        /// Show this many attempts instead of the policy's max_attempts.
        #[arg(long, value_name = "N")]
        attempts: Option<u32>,
    },

    /// Run a scripted action through a coordinator and report every attempt.
    Simulate {
        /// Operation key to run under.
        #[arg(long, default_value = "simulated_operation")]
        key: String,

        /// Comma-separated attempt results: ok, an HTTP status (429, 503, 404...),
        /// reset, timeout or hang. The last entry repeats.
        #[arg(long, value_delimiter = ',', required = true)]
        script: Vec<Step>,

        /// Override the configured max_attempts.
        #[arg(long, value_name = "N")]
        max_attempts: Option<u32>,

        /// Override the configured base delay (milliseconds).
        #[arg(long, value_name = "MS")]
        base_delay_ms: Option<u64>,

        /// Override the configured per-attempt timeout (milliseconds).
        #[arg(long, value_name = "MS")]
        attempt_timeout_ms: Option<u64>,

        /// Also issue an overlapping call on the same key (it should be skipped).
        #[arg(long)]
        overlap: bool,

        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the config file path and the effective retry policy.
    Config,

    /// Generate shell completions on stdout.
    Completions {
        /// Target shell.
        shell: Shell,
    },

    /// Render the man page on stdout.
    Man,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Schedule { attempts } => {
                let cfg = config::load_or_init()?;
                run_schedule(&cfg, attempts)?;
            }
            CliCommand::Simulate {
                key,
                script,
                max_attempts,
                base_delay_ms,
                attempt_timeout_ms,
                overlap,
                json,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                let args = SimulateArgs {
                    key,
                    script,
                    max_attempts,
                    base_delay_ms,
                    attempt_timeout_ms,
                    overlap,
                    json,
                };
                run_simulate(&cfg, args).await?;
            }
            CliCommand::Config => run_show_config()?,
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Man => run_man()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
