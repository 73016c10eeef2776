//! Domain types and validators for controller configuration.
//!
//! Pure functions only, no I/O.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::agent::{REGION_RE, is_valid_region};
use crate::domain::availability::RegionGrant;
use crate::domain::error::ConfigError;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.fleet/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// The controller's own region. Default region for new registrations.
    pub region: String,
    pub store: StoreConfig,
    pub reconcile: ReconcileConfig,
    pub package: PackageConfig,
    pub access: AccessConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            store: StoreConfig::default(),
            reconcile: ReconcileConfig::default(),
            package: PackageConfig::default(),
            access: AccessConfig::default(),
        }
    }
}

fn default_region() -> String {
    "default".to_string()
}

/// Agent record store settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the JSON record file. `None` means `~/.fleet/agents.json`.
    pub path: Option<PathBuf>,
}

/// Reconciler schedule and fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub interval_secs: u64,
    pub probe_timeout_ms: u64,
    /// Maximum number of probes in flight.
    pub concurrency: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            probe_timeout_ms: 3000,
            concurrency: 16,
        }
    }
}

impl ReconcileConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Agent package layout and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Version stamped into the package manifest.
    pub version: String,
    /// Default maximum payload size in bytes.
    pub max_bytes: u64,
    pub runtime_prefix: String,
    pub launcher_prefix: String,
    /// File-name prefixes of dependency artifacts allowed into the package.
    pub dependencies: Vec<String>,
    /// Address deployed agents use to reach the controller.
    pub controller_host: String,
    pub controller_port: u16,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            max_bytes: 64 * 1024 * 1024,
            runtime_prefix: "fleet-agent-core".to_string(),
            launcher_prefix: "fleet-agent-launcher".to_string(),
            dependencies: Vec::new(),
            controller_host: "127.0.0.1".to_string(),
            controller_port: 16001,
        }
    }
}

/// Who may draw agents from which region.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AccessConfig {
    /// Users granted every region.
    pub admins: Vec<String>,
    /// user -> region -> optional cap.
    pub users: BTreeMap<String, BTreeMap<String, Option<usize>>>,
}

impl AccessConfig {
    /// The grant for `user`, or `None` when the user is not configured.
    #[must_use]
    pub fn grant_for(&self, user: &str) -> Option<RegionGrant> {
        if self.admins.iter().any(|a| a == user) {
            return Some(RegionGrant::All);
        }
        self.users
            .get(user)
            .map(|regions| RegionGrant::Only(regions.clone()))
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

fn invalid(key: &str, value: impl ToString, valid: &str) -> anyhow::Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        valid: valid.to_string(),
    }
    .into()
}

impl ControllerConfig {
    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_region(&self.region) {
            return Err(invalid("region", &self.region, REGION_RE.as_str()));
        }
        if self.reconcile.interval_secs == 0 {
            return Err(invalid("reconcile.interval_secs", 0, "1 or more"));
        }
        if self.reconcile.probe_timeout_ms == 0 {
            return Err(invalid("reconcile.probe_timeout_ms", 0, "1 or more"));
        }
        if self.reconcile.concurrency == 0 {
            return Err(invalid("reconcile.concurrency", 0, "1 or more"));
        }
        if self.package.max_bytes == 0 {
            return Err(invalid("package.max_bytes", 0, "1 or more"));
        }
        if semver::Version::parse(&self.package.version).is_err() {
            return Err(invalid(
                "package.version",
                &self.package.version,
                "a semantic version such as 1.2.3",
            ));
        }
        if self.package.runtime_prefix.is_empty() || self.package.launcher_prefix.is_empty() {
            return Err(invalid(
                "package.runtime_prefix / package.launcher_prefix",
                "\"\"",
                "a non-empty file-name prefix",
            ));
        }
        if self.package.runtime_prefix == self.package.launcher_prefix {
            return Err(invalid(
                "package.launcher_prefix",
                &self.package.launcher_prefix,
                "a prefix different from package.runtime_prefix",
            ));
        }
        let host = &self.package.controller_host;
        if host.is_empty()
            || host
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || c == '=')
        {
            return Err(invalid(
                "package.controller_host",
                format!("{host:?}"),
                "a host name or IP address",
            ));
        }
        if self.package.controller_port == 0 {
            return Err(invalid("package.controller_port", 0, "1-65535"));
        }
        for (user, regions) in &self.access.users {
            if let Some(bad) = regions.keys().find(|r| !is_valid_region(r)) {
                return Err(invalid(
                    &format!("access.users.{user}"),
                    bad,
                    REGION_RE.as_str(),
                ));
            }
        }
        Ok(())
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
