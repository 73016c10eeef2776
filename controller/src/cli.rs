//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Controller for a fleet of remote work agents
#[derive(Parser)]
#[command(
    name = "fleetctl",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Config file (default: ~/.fleet/config.yaml)
    #[arg(long, global = true, env = "FLEET_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage agents
    #[command(subcommand)]
    Agents(commands::agents::AgentsCommand),

    /// Show agents available to a user
    Quota(commands::quota::QuotaArgs),

    /// Probe agents and update their state
    Reconcile(commands::reconcile::ReconcileArgs),

    /// Build agent packages
    #[command(subcommand)]
    Package(commands::package::PackageCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Log filter implied by `-v` when `RUST_LOG` is unset.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            config,
            yes,
            command,
            ..
        } = self;

        // Version needs no config or store.
        if matches!(command, Command::Version) {
            let ctx = OutputContext::new(no_color, quiet);
            let renderer = if json {
                Renderer::Json(JsonRenderer)
            } else {
                Renderer::Human(HumanRenderer::new(&ctx))
            };
            return commands::version::run(&renderer);
        }

        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes, config },
        })?;

        match command {
            Command::Agents(cmd) => commands::agents::run(&app, cmd).await,
            Command::Quota(args) => commands::quota::run(&app, &args).await,
            Command::Reconcile(args) => commands::reconcile::run(&app, &args).await,
            Command::Package(cmd) => commands::package::run(&app, cmd).await,
            Command::Version => commands::version::run(&app.renderer()),
        }
    }
}
