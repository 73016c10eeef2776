//! `fleetctl agents` — register, inspect, approve and remove agents.

use anyhow::Result;
use clap::{Args, Subcommand};
use fleet_common::{AgentId, AgentRecord, AgentState, WorkStatus};

use crate::app::AppContext;

/// Agents subcommands.
#[derive(Subcommand)]
pub enum AgentsCommand {
    /// List registered agents
    List,
    /// Show agent details
    Show {
        /// Agent id
        id: AgentId,
    },
    /// Register a new agent
    Register(RegisterArgs),
    /// Approve an agent for work
    Approve {
        /// Agent id
        id: AgentId,
    },
    /// Withdraw an agent's approval
    Disapprove {
        /// Agent id
        id: AgentId,
    },
    /// Record the work status an agent reports
    Report {
        /// Agent id
        id: AgentId,
        /// Reported status
        #[arg(value_enum)]
        status: ReportedStatus,
    },
    /// Remove an agent
    Remove {
        /// Agent id
        id: AgentId,
    },
}

/// Arguments for `agents register`.
#[derive(Args)]
pub struct RegisterArgs {
    /// Display name
    #[arg(long)]
    pub name: String,
    /// Address the agent listens on
    #[arg(long)]
    pub ip: String,
    /// Port the agent listens on
    #[arg(long)]
    pub port: u16,
    /// Region tag (defaults to the controller's region)
    #[arg(long)]
    pub region: Option<String>,
    /// Approve the agent immediately
    #[arg(long)]
    pub approve: bool,
    /// Initial state
    #[arg(long, value_enum, default_value_t = AgentState::Unknown)]
    pub state: AgentState,
}

/// Work status accepted by `agents report`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ReportedStatus {
    /// Idle and able to take work
    Ready,
    /// Working
    Busy,
}

impl From<ReportedStatus> for WorkStatus {
    fn from(s: ReportedStatus) -> Self {
        match s {
            ReportedStatus::Ready => Self::Ready,
            ReportedStatus::Busy => Self::Busy,
        }
    }
}

/// Run an agents subcommand.
///
/// # Errors
///
/// Returns an error if the agent is unknown, the record is invalid, or the
/// store cannot be read or written.
pub async fn run(app: &AppContext, cmd: AgentsCommand) -> Result<()> {
    match cmd {
        AgentsCommand::List => {
            let agents = app.registry.list_all().await?;
            app.renderer().render_agent_list(&agents)
        }
        AgentsCommand::Show { id } => {
            let agent = app.registry.get(id).await?;
            app.renderer().render_agent(&agent)
        }
        AgentsCommand::Register(args) => register(app, args).await,
        AgentsCommand::Approve { id } => {
            app.registry.approve(id, true).await?;
            app.output.success(&format!("Agent {id} approved"));
            Ok(())
        }
        AgentsCommand::Disapprove { id } => {
            app.registry.approve(id, false).await?;
            app.output.success(&format!("Agent {id} no longer approved"));
            Ok(())
        }
        AgentsCommand::Report { id, status } => {
            app.registry.report_status(id, status.into()).await?;
            let state = AgentState::from(WorkStatus::from(status));
            app.output.success(&format!("Agent {id} reported {state}"));
            Ok(())
        }
        AgentsCommand::Remove { id } => remove(app, id).await,
    }
}

async fn register(app: &AppContext, args: RegisterArgs) -> Result<()> {
    let region = args.region.unwrap_or_else(|| app.config.region.clone());
    let record = AgentRecord::new(args.name, args.ip, args.port, region)
        .with_state(args.state)
        .with_approved(args.approve);
    let name = record.name.clone();
    let id = app.registry.register(record).await?;
    app.renderer().render_registered(id, &name)
}

async fn remove(app: &AppContext, id: AgentId) -> Result<()> {
    let agent = app.registry.get(id).await?;
    let prompt = format!("Remove agent {id} ({})?", agent.record.name);
    if !app.confirm(&prompt, false)? {
        app.output.info("Cancelled.");
        return Ok(());
    }
    app.registry.remove(id).await?;
    app.output.success(&format!("Agent {id} removed"));
    Ok(())
}
