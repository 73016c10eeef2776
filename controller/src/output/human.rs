//! Human-readable terminal renderer.

use std::collections::BTreeMap;
use std::path::Path;

use fleet_common::{AgentId, AgentInfo, AgentState};
use owo_colors::OwoColorize as _;

use crate::application::services::ReconcileReport;
use crate::domain::{Delivery, PackagedArtifact};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        println!("fleetctl {version}");
    }

    /// Render the agent table.
    pub fn render_agent_list(&self, agents: &[AgentInfo]) {
        if self.ctx.quiet {
            return;
        }
        if agents.is_empty() {
            self.ctx.info("No agents registered.");
            self.ctx.info("Register one: fleetctl agents register --name <NAME> --ip <IP> --port <PORT>");
            return;
        }

        let name_w = agents
            .iter()
            .map(|a| a.record.name.len())
            .max()
            .unwrap_or(0)
            .max(4);
        let region_w = agents
            .iter()
            .map(|a| a.record.region.len())
            .max()
            .unwrap_or(0)
            .max(6);

        println!(
            "  {}",
            format!(
                "{:>4}  {:<name_w$}  {:<region_w$}  {:<9}  {:<8}  ADDRESS",
                "ID", "NAME", "REGION", "STATE", "APPROVED"
            )
            .style(self.ctx.styles.header)
        );
        for agent in agents {
            let r = &agent.record;
            let state = format!("{:<9}", r.state.to_string());
            let approved = if r.approved { "yes" } else { "no" };
            println!(
                "  {:>4}  {:<name_w$}  {:<region_w$}  {}  {:<8}  {}",
                agent.id.0,
                r.name,
                r.region,
                state.style(self.state_style(r.state)),
                approved,
                r.address().style(self.ctx.styles.dim),
            );
        }
    }

    /// Render one agent's details.
    pub fn render_agent(&self, agent: &AgentInfo) {
        if self.ctx.quiet {
            return;
        }
        let r = &agent.record;
        self.ctx.header(&format!("Agent {}", agent.id));
        self.ctx.kv("Name:    ", &r.name);
        self.ctx.kv("Address: ", &r.address());
        self.ctx.kv("Region:  ", &r.region);
        println!(
            "  {}  {}",
            "State:   ".style(self.ctx.styles.dim),
            r.state.style(self.state_style(r.state))
        );
        self.ctx.kv("Approved:", if r.approved { "yes" } else { "no" });
        self.ctx.kv("Reported:", &AgentState::from(r.reported).to_string());
        if r.is_available() {
            self.ctx.success("Available for work");
        }
    }

    /// Confirm a registration.
    pub fn render_registered(&self, id: AgentId, name: &str) {
        self.ctx.success(&format!("Registered agent '{name}' as {id}"));
    }

    /// Render per-region availability for a user.
    pub fn render_quota(&self, user: &str, counts: &BTreeMap<String, usize>) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.header(&format!("Available agents for {user}"));
        if counts.is_empty() {
            self.ctx.info("No agents available.");
            return;
        }
        let width = counts.keys().map(String::len).max().unwrap_or(0);
        for (region, count) in counts {
            self.ctx.kv(&format!("{region:<width$}"), &count.to_string());
        }
    }

    /// Render availability in a single region.
    pub fn render_region_quota(&self, user: &str, region: &str, count: usize) {
        if self.ctx.quiet {
            return;
        }
        self.ctx
            .info(&format!("{count} agent(s) available to {user} in {region}"));
    }

    /// Render the outcome of one reconciliation pass.
    pub fn render_reconcile(&self, report: &ReconcileReport) {
        self.ctx.success(&format!(
            "Reconciled {} agent(s): {} changed, {} unchanged",
            report.probed, report.changed, report.unchanged
        ));
        if report.unreachable > 0 {
            self.ctx
                .warn(&format!("{} agent(s) unreachable", report.unreachable));
        }
        if report.vanished > 0 {
            self.ctx
                .info(&format!("{} agent(s) removed during the pass", report.vanished));
        }
        if report.failed > 0 {
            self.ctx.error(&format!(
                "{} agent(s) could not be updated (see logs)",
                report.failed
            ));
        }
    }

    /// Render a built package.
    pub fn render_package(&self, artifact: &PackagedArtifact, path: &Path) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.kv("Package:", &path.display().to_string());
        self.ctx.kv("SHA-256:", &artifact.sha256);
        self.ctx
            .kv("Payload:", &format!("{} bytes", artifact.payload_bytes));
        match &artifact.delivery {
            Delivery::Manual => {
                self.ctx
                    .info("Copy the package to the agent host and run ./fleet-agent/run_agent.sh");
            }
            Delivery::Push { host, port } => {
                self.ctx.info(&format!("Ready to push to {host}:{port}"));
            }
        }
    }

    fn state_style(&self, state: AgentState) -> owo_colors::Style {
        match state {
            AgentState::Ready => self.ctx.styles.ready,
            AgentState::Busy => self.ctx.styles.busy,
            AgentState::Inactive => self.ctx.styles.inactive,
            AgentState::Unknown => self.ctx.styles.dim,
        }
    }
}
