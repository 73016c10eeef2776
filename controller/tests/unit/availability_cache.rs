//! Tests for `AvailabilityCache` memoization and single-flight rebuilds.

#![allow(clippy::expect_used)]

use std::time::Duration;

use fleet_common::AgentState;
use fleet_controller::application::services::AvailabilityCache;
use fleet_controller::domain::RegionGrant;
use futures_util::future::join_all;

use crate::mocks::{MemoryStore, agent};

fn seeded() -> MemoryStore {
    let store = MemoryStore::default();
    store.seed(
        agent("a", "10.0.0.1", "east")
            .with_state(AgentState::Ready)
            .with_approved(true),
    );
    store.seed(
        agent("b", "10.0.0.2", "west")
            .with_state(AgentState::Ready)
            .with_approved(true),
    );
    store.seed(agent("c", "10.0.0.3", "west").with_state(AgentState::Busy).with_approved(true));
    store
}

#[tokio::test]
async fn test_warm_cache_does_not_rescan() {
    let store = seeded();
    let cache = AvailabilityCache::new();
    assert!(!cache.is_warm());

    let first = cache.counts(&store).await.expect("counts");
    let second = cache.counts(&store).await.expect("counts");
    assert_eq!(first, second);
    assert_eq!(first.get("east"), 1);
    assert_eq!(first.get("west"), 1);
    assert_eq!(store.scans(), 1);
    assert!(cache.is_warm());
}

#[tokio::test]
async fn test_invalidate_forces_one_rescan() {
    let store = seeded();
    let cache = AvailabilityCache::new();
    cache.counts(&store).await.expect("counts");

    cache.invalidate();
    assert!(!cache.is_warm());
    cache.counts(&store).await.expect("counts");
    cache.counts(&store).await.expect("counts");
    assert_eq!(store.scans(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_cold_reads_share_one_scan() {
    let store = seeded();
    store.set_scan_delay(Duration::from_millis(20));
    let cache = AvailabilityCache::new();

    let results = join_all((0..8).map(|_| cache.counts(&store))).await;
    for counts in results {
        assert_eq!(counts.expect("counts").total(), 2);
    }
    assert_eq!(store.scans(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalidation_mid_scan_is_not_masked() {
    let store = seeded();
    store.set_scan_delay(Duration::from_millis(20));
    let cache = AvailabilityCache::new();

    let (counts, ()) = tokio::join!(cache.counts(&store), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.invalidate();
    });
    counts.expect("counts");
    assert_eq!(store.scans(), 2, "stale scan must be redone");
    assert!(cache.is_warm());
}

#[tokio::test]
async fn test_grant_applied_per_call() {
    let store = seeded();
    let cache = AvailabilityCache::new();

    let all = cache
        .available_count_by_region(&store, &RegionGrant::All)
        .await
        .expect("all");
    assert_eq!(all.get("east"), Some(&1));
    assert_eq!(all.get("west"), Some(&1));

    let only_north = cache
        .available_count_by_region(
            &store,
            &RegionGrant::Only([("north".to_string(), None)].into()),
        )
        .await
        .expect("north");
    assert_eq!(only_north.get("north"), Some(&0));
    assert_eq!(only_north.len(), 1);
    assert_eq!(store.scans(), 1, "one snapshot serves every user");
}
