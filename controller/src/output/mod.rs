//! Output formatting module

pub mod human;
pub mod json;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::OwoColorize as _;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use fleet_common::{AgentId, AgentInfo};

use crate::application::services::ReconcileReport;
use crate::domain::PackagedArtifact;

pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

/// Output renderer selected by `--json`.
pub enum Renderer<'a> {
    /// Human-readable terminal output.
    Human(HumanRenderer<'a>),
    /// Machine-readable JSON output.
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// Render the CLI version.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_version(version),
        }
    }

    /// Render the agent list.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_agent_list(&self, agents: &[AgentInfo]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_agent_list(agents);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_agent_list(agents),
        }
    }

    /// Render one agent.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_agent(&self, agent: &AgentInfo) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_agent(agent);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_agent(agent),
        }
    }

    /// Render a registration result.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_registered(&self, id: AgentId, name: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_registered(id, name);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_registered(id),
        }
    }

    /// Render per-region availability.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_quota(&self, user: &str, counts: &BTreeMap<String, usize>) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_quota(user, counts);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_quota(user, counts),
        }
    }

    /// Render availability in one region.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_region_quota(&self, user: &str, region: &str, count: usize) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_region_quota(user, region, count);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_region_quota(user, region, count),
        }
    }

    /// Render a reconciliation report.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_reconcile(&self, report: &ReconcileReport) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_reconcile(report);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_reconcile(report),
        }
    }

    /// Render a built package.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_package(&self, artifact: &PackagedArtifact, path: &Path) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_package(artifact, path);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_package(artifact, path),
        }
    }
}

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}
