//! JSON output helpers.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use fleet_common::{AgentId, AgentInfo};
use serde::Serialize;

use crate::application::services::ReconcileReport;
use crate::domain::{AccessError, AgentError, BuildError, ConfigError, PackagedArtifact};

/// Renders domain types as pretty JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// Render the CLI version information.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(version: &str) -> Result<()> {
        print(&serde_json::json!({ "version": version }))
    }

    /// Render the agent list as an array.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_agent_list(agents: &[AgentInfo]) -> Result<()> {
        print(agents)
    }

    /// Render one agent.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_agent(agent: &AgentInfo) -> Result<()> {
        print(agent)
    }

    /// Render a registration result.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_registered(id: AgentId) -> Result<()> {
        print(&serde_json::json!({ "id": id }))
    }

    /// Render per-region availability.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_quota(user: &str, counts: &BTreeMap<String, usize>) -> Result<()> {
        print(&serde_json::json!({ "user": user, "regions": counts }))
    }

    /// Render availability in one region.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_region_quota(user: &str, region: &str, count: usize) -> Result<()> {
        print(&serde_json::json!({ "user": user, "region": region, "available": count }))
    }

    /// Render a reconciliation report.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_reconcile(report: &ReconcileReport) -> Result<()> {
        print(report)
    }

    /// Render a built package.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_package(artifact: &PackagedArtifact, path: &Path) -> Result<()> {
        print(&serde_json::json!({
            "path": path.display().to_string(),
            "artifact": artifact,
        }))
    }
}

/// Format a JSON error object:
///
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable machine-readable code for an error, taken from the first typed
/// domain error in its chain.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<AgentError>() {
            return match e {
                AgentError::NotFound(_) => "not_found",
                AgentError::Invalid(_) => "invalid_record",
            };
        }
        if let Some(e) = cause.downcast_ref::<AccessError>() {
            return match e {
                AccessError::UnknownUser(_) => "unknown_user",
                AccessError::Denied { .. } => "access_denied",
            };
        }
        if cause.downcast_ref::<BuildError>().is_some() {
            return "build_failed";
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return "invalid_config";
        }
    }
    "error"
}

/// Print `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
    println!("{out}");
    Ok(())
}
