//! Application service — the agent registry façade.
//!
//! `RegistryService` owns the record store, the availability cache and the
//! reconciler. Every mutation goes through it, and every mutation that
//! changes a stored record invalidates the cache after the write lands. The
//! store is never handed out.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use fleet_common::{AgentId, AgentInfo, AgentRecord, WorkStatus};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::application::ports::{AgentStore, AuthorizationSource, LivenessProbe};
use crate::application::services::availability_cache::AvailabilityCache;
use crate::application::services::reconciler::{ReconcileReport, Reconciler};
use crate::application::services::record_locks::RecordLocks;
use crate::domain::{
    AccessError, AgentError, RegionGrant, reported_state, validate_record,
};

/// Registry of agents, their approval and liveness, and per-user quotas.
pub struct RegistryService<S, A, P> {
    store: S,
    authorization: A,
    reconciler: Reconciler<P>,
    cache: AvailabilityCache,
    locks: RecordLocks,
}

impl<S, A, P> RegistryService<S, A, P>
where
    S: AgentStore,
    A: AuthorizationSource,
    P: LivenessProbe,
{
    #[must_use]
    pub fn new(store: S, authorization: A, reconciler: Reconciler<P>) -> Self {
        Self {
            store,
            authorization,
            reconciler,
            cache: AvailabilityCache::new(),
            locks: RecordLocks::new(),
        }
    }

    /// Register a new agent.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Invalid` for a malformed record, or the store's
    /// error if the record cannot be persisted.
    pub async fn register(&self, record: AgentRecord) -> Result<AgentId> {
        validate_record(&record)?;
        let id = self
            .store
            .create(&record)
            .await
            .with_context(|| format!("registering agent '{}'", record.name))?;
        self.cache.invalidate();
        info!(agent_id = %id, name = %record.name, region = %record.region, "agent registered");
        Ok(id)
    }

    /// Set or clear the approval flag.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::NotFound` if `id` is unknown.
    pub async fn approve(&self, id: AgentId, approved: bool) -> Result<()> {
        let changed = self
            .mutate(id, |record| record.approved = approved)
            .await?;
        if changed {
            info!(agent_id = %id, approved, "agent approval changed");
        }
        Ok(())
    }

    /// Record a work status reported by the agent itself.
    ///
    /// Live agents move to the reported state immediately; inactive agents
    /// take it on their next successful probe.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::NotFound` if `id` is unknown.
    pub async fn report_status(&self, id: AgentId, status: WorkStatus) -> Result<()> {
        let changed = self
            .mutate(id, |record| {
                record.reported = status;
                record.state = reported_state(record.state, status);
            })
            .await?;
        if changed {
            debug!(agent_id = %id, ?status, "agent work status reported");
        }
        Ok(())
    }

    /// Fetch one agent.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::NotFound` if `id` is unknown.
    pub async fn get(&self, id: AgentId) -> Result<AgentInfo> {
        self.store
            .get(id)
            .await
            .with_context(|| format!("reading agent {id}"))?
            .ok_or_else(|| AgentError::NotFound(id).into())
    }

    /// Every registered agent, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the listing fails.
    pub async fn list_all(&self) -> Result<Vec<AgentInfo>> {
        let mut agents = self.store.list_all().await.context("listing agents")?;
        agents.sort_by_key(|a| a.id);
        Ok(agents)
    }

    /// Delete an agent.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::NotFound` if `id` is unknown.
    pub async fn remove(&self, id: AgentId) -> Result<()> {
        let guard = self.locks.lock(id).await;
        let deleted = self
            .store
            .delete(id)
            .await
            .with_context(|| format!("deleting agent {id}"))?;
        if !deleted {
            return Err(AgentError::NotFound(id).into());
        }
        self.cache.invalidate();
        drop(guard);
        self.locks.forget(id);
        info!(agent_id = %id, "agent removed");
        Ok(())
    }

    /// Agents available to `user`, per authorized region.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::UnknownUser` if the authorization source does
    /// not know `user`, or the store's error if a cache rebuild fails.
    pub async fn available_count_by_region(&self, user: &str) -> Result<BTreeMap<String, usize>> {
        let grant = self.grant_for(user).await?;
        self.cache
            .available_count_by_region(&self.store, &grant)
            .await
    }

    /// Agents available to `user` in one region.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::Denied` if `user` may not use `region`.
    pub async fn available_count(&self, user: &str, region: &str) -> Result<usize> {
        let grant = self.grant_for(user).await?;
        if !grant.allows(region) {
            return Err(AccessError::Denied {
                user: user.to_string(),
                region: region.to_string(),
            }
            .into());
        }
        let counts = self.cache.counts(&self.store).await?;
        let count = counts.get(region);
        Ok(grant.cap(region).map_or(count, |cap| count.min(cap)))
    }

    /// Run one reconciliation pass now.
    ///
    /// # Errors
    ///
    /// Returns an error only if the agent listing fails.
    pub async fn reconcile_now(&self) -> Result<ReconcileReport> {
        self.reconciler
            .reconcile(&self.store, &self.locks, &self.cache)
            .await
    }

    /// Reconcile every `interval` until `shutdown` resolves. The first pass
    /// runs immediately. Returns the number of passes run.
    ///
    /// A failed pass is logged and the schedule continues.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible for callers that `?` it.
    pub async fn run_reconciler(
        &self,
        interval: Duration,
        shutdown: impl Future<Output = ()>,
    ) -> Result<u64> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut passes = 0;
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!(passes, "reconciler stopped");
                    return Ok(passes);
                }
                _ = ticker.tick() => {
                    passes += 1;
                    if let Err(e) = self.reconcile_now().await {
                        warn!(error = %format!("{e:#}"), "reconciliation pass failed");
                    }
                }
            }
        }
    }

    /// Drop the memoized availability counts.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Whether availability counts are currently memoized.
    #[must_use]
    pub fn is_cache_warm(&self) -> bool {
        self.cache.is_warm()
    }

    async fn grant_for(&self, user: &str) -> Result<RegionGrant> {
        self.authorization
            .regions_for(user)
            .await
            .with_context(|| format!("looking up agent access for '{user}'"))?
            .ok_or_else(|| AccessError::UnknownUser(user.to_string()).into())
    }

    /// Read-modify-write one record under its lock. Returns whether the
    /// record changed; unchanged records are not written.
    async fn mutate(&self, id: AgentId, f: impl FnOnce(&mut AgentRecord)) -> Result<bool> {
        let _guard = self.locks.lock(id).await;
        let mut agent = self
            .store
            .get(id)
            .await
            .with_context(|| format!("reading agent {id}"))?
            .ok_or(AgentError::NotFound(id))?;

        let before = agent.record.clone();
        f(&mut agent.record);
        if agent.record == before {
            return Ok(false);
        }

        let updated = self
            .store
            .update(&agent)
            .await
            .with_context(|| format!("updating agent {id}"))?;
        if !updated {
            return Err(AgentError::NotFound(id).into());
        }
        self.cache.invalidate();
        Ok(true)
    }
}
