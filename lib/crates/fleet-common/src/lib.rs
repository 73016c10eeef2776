//! Shared agent record types for the fleet controller and its tooling.

pub mod agent;

pub use agent::{AgentId, AgentInfo, AgentRecord, AgentState, ParseError, WorkStatus};
