//! Application service — liveness reconciliation sweep.
//!
//! Probes every stored agent with bounded fan-out and moves each record to
//! the state its probe implies. One agent's probe or store failure never
//! aborts the sweep over the others.

use std::time::Duration;

use anyhow::{Context, Result};
use fleet_common::{AgentId, AgentInfo, AgentRecord};
use futures_util::StreamExt as _;
use futures_util::stream;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::ports::{AgentStore, LivenessProbe};
use crate::application::services::availability_cache::AvailabilityCache;
use crate::application::services::record_locks::RecordLocks;
use crate::domain::{ProbeOutcome, ReconcileConfig, reconciled_state};

/// Tally of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Agents probed.
    pub probed: usize,
    /// Probes that failed or timed out.
    pub unreachable: usize,
    /// Records whose stored state was rewritten.
    pub changed: usize,
    /// Records already in the right state.
    pub unchanged: usize,
    /// Records deleted while the pass was running.
    pub vanished: usize,
    /// Records that could not be read or written.
    pub failed: usize,
}

enum Step {
    Changed,
    Unchanged,
    Vanished,
    Failed,
}

/// Re-derives agent liveness and persists the resulting state.
pub struct Reconciler<P> {
    probe: P,
    timeout: Duration,
    concurrency: usize,
}

impl<P: LivenessProbe> Reconciler<P> {
    #[must_use]
    pub fn new(probe: P, config: &ReconcileConfig) -> Self {
        Self {
            probe,
            timeout: config.probe_timeout(),
            concurrency: config.concurrency.max(1),
        }
    }

    /// Probe one agent. Errors and timeouts are outcomes, not failures.
    pub async fn probe_agent(&self, record: &AgentRecord) -> ProbeOutcome {
        match tokio::time::timeout(self.timeout, self.probe.probe(&record.ip, record.port)).await
        {
            Ok(Ok(true)) => ProbeOutcome::Reachable,
            Ok(Ok(false)) => ProbeOutcome::Unreachable,
            Ok(Err(e)) => {
                debug!(address = %record.address(), error = %e, "probe failed");
                ProbeOutcome::Unreachable
            }
            Err(_) => {
                debug!(address = %record.address(), timeout = ?self.timeout, "probe timed out");
                ProbeOutcome::TimedOut
            }
        }
    }

    /// Run one pass over every stored agent.
    ///
    /// Every write that changes a stored state invalidates `cache`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the initial listing of agents fails.
    pub async fn reconcile(
        &self,
        store: &impl AgentStore,
        locks: &RecordLocks,
        cache: &AvailabilityCache,
    ) -> Result<ReconcileReport> {
        let agents = store
            .list_all()
            .await
            .context("listing agents for reconciliation")?;

        let steps: Vec<(ProbeOutcome, Step)> = stream::iter(agents.iter())
            .map(|agent| async move {
                let outcome = self.probe_agent(&agent.record).await;
                let step = Self::apply(store, locks, cache, agent, outcome).await;
                (outcome, step)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = ReconcileReport {
            probed: steps.len(),
            ..ReconcileReport::default()
        };
        for (outcome, step) in steps {
            if !outcome.is_reachable() {
                report.unreachable += 1;
            }
            match step {
                Step::Changed => report.changed += 1,
                Step::Unchanged => report.unchanged += 1,
                Step::Vanished => report.vanished += 1,
                Step::Failed => report.failed += 1,
            }
        }

        info!(
            probed = report.probed,
            unreachable = report.unreachable,
            changed = report.changed,
            failed = report.failed,
            "reconciliation pass finished"
        );
        Ok(report)
    }

    /// Persist the probe result for one agent under its record lock.
    ///
    /// The record is re-read so concurrent approvals or status reports made
    /// while the probe was in flight are kept.
    async fn apply(
        store: &impl AgentStore,
        locks: &RecordLocks,
        cache: &AvailabilityCache,
        agent: &AgentInfo,
        outcome: ProbeOutcome,
    ) -> Step {
        let id: AgentId = agent.id;
        let _guard = locks.lock(id).await;

        let mut current = match store.get(id).await {
            Ok(Some(current)) => current,
            Ok(None) => return Step::Vanished,
            Err(e) => {
                warn!(agent_id = %id, error = %format!("{e:#}"), "cannot read agent during reconciliation");
                return Step::Failed;
            }
        };

        let next = reconciled_state(&current.record, outcome);
        if next == current.record.state {
            return Step::Unchanged;
        }

        let previous = current.record.state;
        current.record.state = next;
        match store.update(&current).await {
            Ok(true) => {
                cache.invalidate();
                debug!(agent_id = %id, from = %previous, to = %next, "agent state reconciled");
                Step::Changed
            }
            Ok(false) => Step::Vanished,
            Err(e) => {
                warn!(agent_id = %id, error = %format!("{e:#}"), "cannot persist reconciled state");
                Step::Failed
            }
        }
    }
}
