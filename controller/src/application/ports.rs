//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `fleet_common`, never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::Path;

use anyhow::Result;
use fleet_common::{AgentId, AgentInfo, AgentRecord};

use crate::domain::RegionGrant;

// ── Agent Record Store Port ───────────────────────────────────────────────────

/// Durable CRUD on agent records, keyed by store-assigned id.
///
/// Only `RegistryService` holds a store; nothing else may mutate it, so cache
/// invalidation can follow every write.
#[allow(async_fn_in_trait)]
pub trait AgentStore {
    /// Persist a new record and return its freshly assigned id.
    async fn create(&self, record: &AgentRecord) -> Result<AgentId>;
    /// Fetch a record, `None` if the id has no backing record.
    async fn get(&self, id: AgentId) -> Result<Option<AgentInfo>>;
    /// Replace a stored record. Returns `false` if the id does not exist.
    async fn update(&self, agent: &AgentInfo) -> Result<bool>;
    /// Delete a record. Returns `false` if the id does not exist.
    async fn delete(&self, id: AgentId) -> Result<bool>;
    /// Snapshot of every record. Order is not significant.
    async fn list_all(&self) -> Result<Vec<AgentInfo>>;
}

// ── Authorization Port ────────────────────────────────────────────────────────

/// Source of per-user region entitlements.
#[allow(async_fn_in_trait)]
pub trait AuthorizationSource {
    /// Regions `user` may draw agents from, or `None` for an unknown user.
    async fn regions_for(&self, user: &str) -> Result<Option<RegionGrant>>;
}

// ── Liveness Probe Port ───────────────────────────────────────────────────────

/// Checks whether an agent answers at its address.
///
/// The reconciler wraps every call in its own timeout; implementations may
/// still apply a shorter one.
#[allow(async_fn_in_trait)]
pub trait LivenessProbe {
    /// `Ok(true)` if the agent is reachable.
    async fn probe(&self, ip: &str, port: u16) -> Result<bool>;
}

// ── Artifact Port ─────────────────────────────────────────────────────────────

/// Reads package source artifacts.
#[allow(async_fn_in_trait)]
pub trait ArtifactReader {
    /// Size of the artifact at `location` in bytes, without reading it.
    async fn size(&self, location: &Path) -> Result<u64>;

    /// Read the whole artifact at `location`.
    async fn read(&self, location: &Path) -> Result<Vec<u8>>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait; no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

/// Reporter that drops every message.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn step(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warn(&self, _: &str) {}
}
