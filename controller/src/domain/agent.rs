//! Agent state rules. Pure functions, no I/O, no async.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.

use std::sync::LazyLock;

use anyhow::Result;
use fleet_common::{AgentRecord, AgentState, WorkStatus};
use regex::Regex;

use crate::domain::error::AgentError;

/// Region tags end up in file names and config keys, so keep them plain.
pub static REGION_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern, cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,63}$").expect("valid regex")
});

/// Maximum agent name length accepted at registration.
pub const MAX_NAME_LEN: usize = 255;

/// Result of one liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable,
    TimedOut,
}

impl ProbeOutcome {
    #[must_use]
    pub fn is_reachable(self) -> bool {
        self == Self::Reachable
    }
}

/// Returns `true` if `region` is a valid region tag.
#[must_use]
pub fn is_valid_region(region: &str) -> bool {
    REGION_RE.is_match(region)
}

/// State an agent should be stored in after a probe.
///
/// Reachable agents take their last reported work status; anything else is
/// `Inactive`.
#[must_use]
pub fn reconciled_state(record: &AgentRecord, outcome: ProbeOutcome) -> AgentState {
    if outcome.is_reachable() {
        record.reported.into()
    } else {
        AgentState::Inactive
    }
}

/// State after the agent reports a work status.
///
/// Only live agents change state; an inactive or unknown agent keeps its
/// state until the next successful probe.
#[must_use]
pub fn reported_state(current: AgentState, status: WorkStatus) -> AgentState {
    if current.is_live() {
        status.into()
    } else {
        current
    }
}

/// Validate a record before registration. Collects every violation.
///
/// # Errors
///
/// Returns `AgentError::Invalid` listing all problems found.
pub fn validate_record(record: &AgentRecord) -> Result<()> {
    let mut errors = Vec::new();

    let name = record.name.trim();
    if name.is_empty() {
        errors.push("name must not be empty".to_string());
    } else if name.len() > MAX_NAME_LEN {
        errors.push(format!("name longer than {MAX_NAME_LEN} characters"));
    } else if name.chars().any(char::is_control) {
        errors.push("name must not contain control characters".to_string());
    }

    if record.ip.trim().is_empty() {
        errors.push("ip must not be empty".to_string());
    } else if record.ip.chars().any(char::is_whitespace) {
        errors.push(format!("ip '{}' contains whitespace", record.ip));
    }

    if record.port == 0 {
        errors.push("port must be non-zero".to_string());
    }

    if !is_valid_region(&record.region) {
        errors.push(format!(
            "region '{}' must match {}",
            record.region,
            REGION_RE.as_str()
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AgentError::Invalid(errors.join("\n")).into())
    }
}
