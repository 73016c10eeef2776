//! Availability arithmetic over agent snapshots.

use std::collections::BTreeMap;

use fleet_common::AgentInfo;

/// Count of approved, ready agents per region. Built from a full store scan
/// and never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionCounts(BTreeMap<String, usize>);

impl RegionCounts {
    /// Count the available agents in `agents`, grouped by region.
    pub fn from_agents<'a>(agents: impl IntoIterator<Item = &'a AgentInfo>) -> Self {
        let mut counts = BTreeMap::new();
        for agent in agents {
            if agent.record.is_available() {
                *counts.entry(agent.record.region.clone()).or_insert(0) += 1;
            }
        }
        Self(counts)
    }

    #[must_use]
    pub fn get(&self, region: &str) -> usize {
        self.0.get(region).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(r, c)| (r.as_str(), *c))
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}

/// Regions a user may draw agents from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionGrant {
    /// Every region, uncapped (administrators).
    All,
    /// Listed regions, each with an optional per-region cap.
    Only(BTreeMap<String, Option<usize>>),
}

impl RegionGrant {
    #[must_use]
    pub fn allows(&self, region: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(regions) => regions.contains_key(region),
        }
    }

    /// The cap for `region`, if the grant sets one.
    #[must_use]
    pub fn cap(&self, region: &str) -> Option<usize> {
        match self {
            Self::All => None,
            Self::Only(regions) => regions.get(region).copied().flatten(),
        }
    }
}

/// Apply a user's grant to the fleet-wide counts.
///
/// Explicitly granted regions are always present, with zero when no agent is
/// available there. With `RegionGrant::All` only regions that have agents
/// appear.
#[must_use]
pub fn available_for(counts: &RegionCounts, grant: &RegionGrant) -> BTreeMap<String, usize> {
    match grant {
        RegionGrant::All => counts.iter().map(|(r, c)| (r.to_string(), c)).collect(),
        RegionGrant::Only(regions) => regions
            .iter()
            .map(|(region, cap)| {
                let count = counts.get(region);
                let count = cap.map_or(count, |cap| count.min(cap));
                (region.clone(), count)
            })
            .collect(),
    }
}
