//! Application service — memoized per-region availability counts.
//!
//! Counting available agents needs a full store scan, so the result is kept
//! in memory until a mutation invalidates it. The scan result is published as
//! an immutable `Arc` snapshot: readers either see the previous complete
//! snapshot or the next complete one, never a half-built map.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use tracing::debug;

use crate::application::ports::AgentStore;
use crate::domain::{RegionCounts, RegionGrant, available_for};

/// Scans retried when invalidations keep landing mid-scan.
const MAX_REBUILD_ATTEMPTS: usize = 3;

#[derive(Default)]
struct Memo {
    /// Bumped by every invalidation.
    generation: u64,
    counts: Option<Arc<RegionCounts>>,
}

/// Lazily rebuilt cache of available-agent counts per region.
#[derive(Default)]
pub struct AvailabilityCache {
    memo: RwLock<Memo>,
    /// Held for the duration of a rebuild so only one scan runs at a time.
    rebuild: tokio::sync::Mutex<()>,
}

impl AvailabilityCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the memoized snapshot. The next read rescans the store.
    pub fn invalidate(&self) {
        let mut memo = self.memo.write().unwrap_or_else(PoisonError::into_inner);
        memo.generation += 1;
        memo.counts = None;
    }

    /// Whether a snapshot is currently memoized.
    #[must_use]
    pub fn is_warm(&self) -> bool {
        self.cached().is_some()
    }

    fn cached(&self) -> Option<Arc<RegionCounts>> {
        self.memo
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .counts
            .clone()
    }

    /// Fleet-wide counts of approved, ready agents per region.
    ///
    /// Served from memory when warm. Otherwise one caller scans the store
    /// while concurrent callers wait for its result.
    ///
    /// # Errors
    ///
    /// Returns an error if the store scan fails. The cache stays cold.
    pub async fn counts(&self, store: &impl AgentStore) -> Result<Arc<RegionCounts>> {
        if let Some(counts) = self.cached() {
            return Ok(counts);
        }

        let _flight = self.rebuild.lock().await;
        let mut attempt = 0;
        loop {
            let generation = {
                let memo = self.memo.read().unwrap_or_else(PoisonError::into_inner);
                if let Some(counts) = &memo.counts {
                    return Ok(Arc::clone(counts));
                }
                memo.generation
            };

            let agents = store
                .list_all()
                .await
                .context("scanning agent records for availability")?;
            let counts = Arc::new(RegionCounts::from_agents(&agents));
            attempt += 1;

            let mut memo = self.memo.write().unwrap_or_else(PoisonError::into_inner);
            if memo.generation == generation {
                memo.counts = Some(Arc::clone(&counts));
                debug!(
                    agents = agents.len(),
                    available = counts.total(),
                    "availability snapshot rebuilt"
                );
                return Ok(counts);
            }
            if attempt >= MAX_REBUILD_ATTEMPTS {
                // Invalidated during every scan; hand back the freshest
                // result without memoizing it.
                debug!(attempt, "availability snapshot not published");
                return Ok(counts);
            }
        }
    }

    /// Counts of agents available to a user holding `grant`, per region.
    ///
    /// # Errors
    ///
    /// Returns an error if a rebuild is needed and the store scan fails.
    pub async fn available_count_by_region(
        &self,
        store: &impl AgentStore,
        grant: &RegionGrant,
    ) -> Result<BTreeMap<String, usize>> {
        let counts = self.counts(store).await?;
        Ok(available_for(&counts, grant))
    }
}
