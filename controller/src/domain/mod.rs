//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod agent;
pub mod availability;
pub mod config;
pub mod error;
pub mod package;

pub use agent::{ProbeOutcome, reconciled_state, reported_state, validate_record};
pub use availability::{RegionCounts, RegionGrant, available_for};
pub use config::{AccessConfig, ControllerConfig, PackageConfig, ReconcileConfig, StoreConfig};
pub use error::{AccessError, AgentError, BuildError, ConfigError};
pub use package::{
    Delivery, PackageBound, PackageRequest, PackagedArtifact, PushTarget,
};
