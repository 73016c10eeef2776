// lib/crates/fleet-common/src/agent.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store-assigned agent identity. Unique and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AgentId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(AgentId)
            .map_err(|_| ParseError::AgentId(s.to_string()))
    }
}

/// Connectivity state of an agent as stored by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentState {
    /// Registered but never probed. Not live.
    #[default]
    Unknown,
    /// Reachable and idle.
    Ready,
    /// Reachable and executing work.
    Busy,
    /// Last liveness probe failed or timed out.
    Inactive,
}

impl AgentState {
    /// Reachable states. Only `Ready` counts towards availability.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Ready | Self::Busy)
    }

    /// The work status this state reflects, if it is a live state.
    #[must_use]
    pub fn work_status(self) -> Option<WorkStatus> {
        match self {
            Self::Ready => Some(WorkStatus::Ready),
            Self::Busy => Some(WorkStatus::Busy),
            Self::Unknown | Self::Inactive => None,
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "UNKNOWN",
            Self::Ready => "READY",
            Self::Busy => "BUSY",
            Self::Inactive => "INACTIVE",
        };
        f.write_str(s)
    }
}

impl FromStr for AgentState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UNKNOWN" => Ok(Self::Unknown),
            "READY" => Ok(Self::Ready),
            "BUSY" => Ok(Self::Busy),
            "INACTIVE" => Ok(Self::Inactive),
            _ => Err(ParseError::State(s.to_string())),
        }
    }
}

/// Work status signalled by the agent itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkStatus {
    #[default]
    Ready,
    Busy,
}

impl From<WorkStatus> for AgentState {
    fn from(status: WorkStatus) -> Self {
        match status {
            WorkStatus::Ready => Self::Ready,
            WorkStatus::Busy => Self::Busy,
        }
    }
}

/// Agent fields owned by the caller. Everything except the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    pub ip: String,
    pub port: u16,
    pub region: String,
    #[serde(default)]
    pub state: AgentState,
    #[serde(default)]
    pub approved: bool,
    /// Last work status reported by the agent. The reconciler restores this
    /// state when an inactive agent becomes reachable again.
    #[serde(default)]
    pub reported: WorkStatus,
}

impl AgentRecord {
    /// A new, unapproved record in the `Unknown` state.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        ip: impl Into<String>,
        port: u16,
        region: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
            port,
            region: region.into(),
            state: AgentState::Unknown,
            approved: false,
            reported: WorkStatus::Ready,
        }
    }

    /// Set the state. A live state also becomes the reported work status.
    #[must_use]
    pub fn with_state(mut self, state: AgentState) -> Self {
        self.state = state;
        if let Some(status) = state.work_status() {
            self.reported = status;
        }
        self
    }

    #[must_use]
    pub fn with_approved(mut self, approved: bool) -> Self {
        self.approved = approved;
        self
    }

    /// `ip:port` as used by liveness probes.
    #[must_use]
    pub fn address(&self) -> String {
        if self.ip.contains(':') {
            format!("[{}]:{}", self.ip, self.port)
        } else {
            format!("{}:{}", self.ip, self.port)
        }
    }

    /// Approved and idle.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.approved && self.state == AgentState::Ready
    }
}

/// A stored agent: identity plus record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: AgentId,
    #[serde(flatten)]
    pub record: AgentRecord,
}

/// Errors parsing agent identifiers and enums from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid agent id: '{0}'")]
    AgentId(String),
    #[error("invalid agent state: '{0}' (expected READY, BUSY, INACTIVE or UNKNOWN)")]
    State(String),
}
