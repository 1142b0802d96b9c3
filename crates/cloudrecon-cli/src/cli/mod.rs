//! CLI for inspecting and rehearsing cloudrecon retry behaviour.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use cloudrecon_core::config;
use std::path::Path;

use commands::{run_classify, run_config, run_schedule, run_simulate};

/// Top-level CLI for cloudrecon.
#[derive(Debug, Parser)]
#[command(name = "cloudrecon")]
#[command(about = "cloudrecon: retry, classification and polling for cloud reconciliation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Which call-site conversion to apply to an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CallKind {
    Read,
    Write,
    Delete,
    Poll,
}

/// Which configured retry budget to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    Read,
    Write,
    Poll,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Show how a vendor error code is classified by the configured table.
    Classify {
        /// Vendor error code, e.g. ResourceInUse.ActivityInProgress.
        code: String,
        /// Treat the call as unsafe to replay after a network failure.
        #[arg(long)]
        non_idempotent: bool,
        /// Call-site conversion to apply.
        #[arg(long, value_enum, default_value = "write")]
        mode: CallKind,
    },

    /// Print the nominal backoff schedule of a retry profile.
    Schedule {
        #[arg(long, value_enum, default_value = "write")]
        profile: Profile,
        /// Number of delays to list.
        #[arg(long, default_value = "10", value_name = "N")]
        count: usize,
    },

    /// Run a JSON scenario against scripted endpoints with the configured policies.
    Simulate {
        /// Path to the scenario JSON file.
        path: String,
    },

    /// Show the config file location and effective settings.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Classify {
                code,
                non_idempotent,
                mode,
            } => run_classify(&cfg, &code, non_idempotent, mode)?,
            CliCommand::Schedule { profile, count } => run_schedule(&cfg, profile, count)?,
            CliCommand::Simulate { path } => run_simulate(&cfg, Path::new(&path)).await?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
