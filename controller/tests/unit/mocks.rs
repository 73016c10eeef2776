//! Shared fakes for unit tests.
//!
//! Each fake keeps its state behind an `Arc` so a test can hand one clone to
//! the service under test and keep another to inspect calls afterwards.

#![allow(clippy::expect_used)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use fleet_common::{AgentId, AgentInfo, AgentRecord};
use fleet_controller::application::ports::{
    AgentStore, ArtifactReader, AuthorizationSource, LivenessProbe,
};
use fleet_controller::application::services::{Reconciler, RegistryService};
use fleet_controller::domain::{ReconcileConfig, RegionGrant};

// ── Store ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct StoreState {
    next_id: Mutex<u64>,
    records: Mutex<BTreeMap<AgentId, AgentRecord>>,
    failing_updates: Mutex<HashSet<AgentId>>,
    scan_delay: Mutex<Option<Duration>>,
    scans: AtomicUsize,
    writes: AtomicUsize,
}

/// In-memory `AgentStore` counting scans and writes.
#[derive(Clone, Default)]
pub struct MemoryStore(Arc<StoreState>);

impl MemoryStore {
    /// Seed a record without counting it as a write.
    pub fn seed(&self, record: AgentRecord) -> AgentId {
        let id = self.next_id();
        self.0.records.lock().expect("records").insert(id, record);
        id
    }

    pub fn record(&self, id: AgentId) -> Option<AgentRecord> {
        self.0.records.lock().expect("records").get(&id).cloned()
    }

    /// Make every `update` of `id` fail.
    pub fn fail_updates_for(&self, id: AgentId) {
        self.0.failing_updates.lock().expect("failing").insert(id);
    }

    /// Delay every `list_all` by `delay`. The snapshot is taken before the
    /// delay, so a slow scan can return stale data.
    pub fn set_scan_delay(&self, delay: Duration) {
        *self.0.scan_delay.lock().expect("delay") = Some(delay);
    }

    pub fn scans(&self) -> usize {
        self.0.scans.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.0.writes.load(Ordering::SeqCst)
    }

    fn next_id(&self) -> AgentId {
        let mut next = self.0.next_id.lock().expect("next id");
        *next += 1;
        AgentId(*next)
    }
}

impl AgentStore for MemoryStore {
    async fn create(&self, record: &AgentRecord) -> Result<AgentId> {
        self.0.writes.fetch_add(1, Ordering::SeqCst);
        Ok(self.seed(record.clone()))
    }

    async fn get(&self, id: AgentId) -> Result<Option<AgentInfo>> {
        Ok(self.record(id).map(|record| AgentInfo { id, record }))
    }

    async fn update(&self, agent: &AgentInfo) -> Result<bool> {
        if self
            .0
            .failing_updates
            .lock()
            .expect("failing")
            .contains(&agent.id)
        {
            anyhow::bail!("disk full");
        }
        self.0.writes.fetch_add(1, Ordering::SeqCst);
        let mut records = self.0.records.lock().expect("records");
        match records.get_mut(&agent.id) {
            Some(slot) => {
                *slot = agent.record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: AgentId) -> Result<bool> {
        self.0.writes.fetch_add(1, Ordering::SeqCst);
        Ok(self.0.records.lock().expect("records").remove(&id).is_some())
    }

    async fn list_all(&self) -> Result<Vec<AgentInfo>> {
        self.0.scans.fetch_add(1, Ordering::SeqCst);
        let snapshot: Vec<AgentInfo> = self
            .0
            .records
            .lock()
            .expect("records")
            .iter()
            .map(|(id, record)| AgentInfo {
                id: *id,
                record: record.clone(),
            })
            .collect();
        let delay = *self.0.scan_delay.lock().expect("delay");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(snapshot)
    }
}

// ── Authorization ─────────────────────────────────────────────────────────────

/// Fixed user → grant table.
#[derive(Default)]
pub struct FakeAuthorization {
    grants: HashMap<String, RegionGrant>,
}

impl FakeAuthorization {
    pub fn with(mut self, user: &str, grant: RegionGrant) -> Self {
        self.grants.insert(user.to_string(), grant);
        self
    }

    /// `user` may use `regions`, uncapped.
    pub fn regions(self, user: &str, regions: &[&str]) -> Self {
        let only = regions.iter().map(|r| ((*r).to_string(), None)).collect();
        self.with(user, RegionGrant::Only(only))
    }
}

impl AuthorizationSource for FakeAuthorization {
    async fn regions_for(&self, user: &str) -> Result<Option<RegionGrant>> {
        Ok(self.grants.get(user).cloned())
    }
}

// ── Probe ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ProbeState {
    down: Mutex<HashSet<String>>,
    erroring: Mutex<HashSet<String>>,
    latency: Mutex<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Probe whose answers are scripted per IP. Every IP is reachable unless
/// marked down.
#[derive(Clone, Default)]
pub struct ScriptedProbe(Arc<ProbeState>);

impl ScriptedProbe {
    pub fn set_down(&self, ip: &str, down: bool) {
        let mut set = self.0.down.lock().expect("down");
        if down {
            set.insert(ip.to_string());
        } else {
            set.remove(ip);
        }
    }

    /// Make probes of `ip` return an error instead of an answer.
    pub fn set_erroring(&self, ip: &str) {
        self.0.erroring.lock().expect("erroring").insert(ip.to_string());
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.0.latency.lock().expect("latency") = latency;
    }

    pub fn calls(&self) -> usize {
        self.0.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.0.max_in_flight.load(Ordering::SeqCst)
    }
}

impl LivenessProbe for ScriptedProbe {
    async fn probe(&self, ip: &str, _port: u16) -> Result<bool> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.0.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = *self.0.latency.lock().expect("latency");
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.0.erroring.lock().expect("erroring").contains(ip) {
            anyhow::bail!("connection reset");
        }
        Ok(!self.0.down.lock().expect("down").contains(ip))
    }
}

// ── Artifacts ─────────────────────────────────────────────────────────────────

/// Artifact files held in memory.
#[derive(Default)]
pub struct MemoryReader {
    files: HashMap<PathBuf, Vec<u8>>,
    reads: Mutex<Vec<PathBuf>>,
}

impl MemoryReader {
    pub fn with(mut self, path: &str, data: &[u8]) -> Self {
        self.files.insert(PathBuf::from(path), data.to_vec());
        self
    }

    /// Locations whose contents were read, in order.
    pub fn reads(&self) -> Vec<PathBuf> {
        self.reads.lock().expect("reads").clone()
    }
}

impl ArtifactReader for MemoryReader {
    async fn size(&self, location: &Path) -> Result<u64> {
        self.files
            .get(location)
            .map(|data| data.len() as u64)
            .ok_or_else(|| anyhow::anyhow!("no such file: {}", location.display()))
    }

    async fn read(&self, location: &Path) -> Result<Vec<u8>> {
        self.reads
            .lock()
            .expect("reads")
            .push(location.to_path_buf());
        self.files
            .get(location)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such file: {}", location.display()))
    }
}

// ── Wiring ────────────────────────────────────────────────────────────────────

pub type TestRegistry = RegistryService<MemoryStore, FakeAuthorization, ScriptedProbe>;

pub fn reconcile_config(concurrency: usize) -> ReconcileConfig {
    ReconcileConfig {
        interval_secs: 60,
        probe_timeout_ms: 3000,
        concurrency,
    }
}

pub fn registry(store: &MemoryStore, auth: FakeAuthorization, probe: &ScriptedProbe) -> TestRegistry {
    let reconciler = Reconciler::new(probe.clone(), &reconcile_config(16));
    RegistryService::new(store.clone(), auth, reconciler)
}

pub fn agent(name: &str, ip: &str, region: &str) -> AgentRecord {
    AgentRecord::new(name, ip, 7000, region)
}
