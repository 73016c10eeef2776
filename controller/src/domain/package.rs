//! Agent package layout: pure generators and in-memory archive assembly.
//!
//! Every function takes data in and returns data out. The caller reads the
//! source artifacts and decides where the finished archive goes.

#![allow(clippy::format_push_string)]

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::domain::config::PackageConfig;
use crate::domain::error::BuildError;

/// Top-level directory inside every package.
pub const PACKAGE_ROOT: &str = "fleet-agent";

/// Owner names that are safe to write into `agent.conf`.
pub static OWNER_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern, cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.@+-]{0,127}$").expect("valid regex")
});

// ── Request / result types ───────────────────────────────────────────────────

/// Size and version constraint for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageBound {
    /// Maximum total payload in bytes (all entries, generated files included).
    pub max_bytes: u64,
    /// Semantic version stamped into the manifest and file name.
    pub version: String,
}

/// Agent host the package will be pushed to directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushTarget {
    pub host: String,
    pub port: u16,
}

/// One package build request. Transient; nothing is persisted.
#[derive(Debug, Clone)]
pub struct PackageRequest {
    /// Artifact locations, in priority order.
    pub artifacts: Vec<PathBuf>,
    pub target: Option<PushTarget>,
    pub bound: PackageBound,
    /// Region the deployed agent registers into.
    pub region: Option<String>,
    /// User the deployed agent is dedicated to.
    pub owner: Option<String>,
}

/// How the finished package reaches the agent host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Delivery {
    /// Written out for an operator to copy and install.
    Manual,
    /// Ready to be pushed to the given agent host.
    Push { host: String, port: u16 },
}

/// A finished package. Owned by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PackagedArtifact {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of `bytes`.
    pub sha256: String,
    /// Sum of uncompressed entry sizes, as checked against the bound.
    pub payload_bytes: u64,
    pub delivery: Delivery,
}

/// Role of a source artifact inside the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Runtime,
    Launcher,
    Dependency,
}

/// A file to be written into the archive.
#[derive(Debug, Clone)]
pub struct PackageEntry {
    /// Path inside the archive, relative to the archive root.
    pub path: String,
    pub data: Vec<u8>,
    pub mode: u32,
}

impl PackageEntry {
    #[must_use]
    pub fn file(path: String, data: Vec<u8>) -> Self {
        Self {
            path,
            data,
            mode: 0o644,
        }
    }

    #[must_use]
    pub fn executable(path: String, data: Vec<u8>) -> Self {
        Self {
            path,
            data,
            mode: 0o755,
        }
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

// ── Classification ───────────────────────────────────────────────────────────

/// Decide what a source file is by its name. `None` means "not packaged".
///
/// The longest matching prefix decides, so a launcher prefix that extends
/// the runtime prefix still classifies launchers correctly.
#[must_use]
pub fn classify(file_name: &str, config: &PackageConfig) -> Option<ArtifactKind> {
    let candidates = [
        (config.runtime_prefix.as_str(), ArtifactKind::Runtime),
        (config.launcher_prefix.as_str(), ArtifactKind::Launcher),
    ]
    .into_iter()
    .chain(
        config
            .dependencies
            .iter()
            .map(|prefix| (prefix.as_str(), ArtifactKind::Dependency)),
    );

    let mut best: Option<(usize, ArtifactKind)> = None;
    for (prefix, kind) in candidates {
        if prefix.is_empty() || !file_name.starts_with(prefix) {
            continue;
        }
        if best.is_none_or(|(len, _)| prefix.len() > len) {
            best = Some((prefix.len(), kind));
        }
    }
    best.map(|(_, kind)| kind)
}

/// Artifact names end up in `run_agent.sh` and in archive paths, so only
/// `[A-Za-z0-9._-]` is accepted.
#[must_use]
pub fn is_safe_artifact_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Validate the owner a package is dedicated to.
///
/// # Errors
///
/// Returns `BuildError::InvalidOwner` unless `owner` matches [`OWNER_RE`].
pub fn validate_owner(owner: &str) -> Result<(), BuildError> {
    if OWNER_RE.is_match(owner) {
        Ok(())
    } else {
        Err(BuildError::InvalidOwner(owner.to_string()))
    }
}

/// Validate the push target of a request.
///
/// # Errors
///
/// Returns `BuildError::InvalidTarget` for an empty host or zero port.
pub fn validate_target(target: &PushTarget) -> Result<(), BuildError> {
    let host = target.host.trim();
    if host.is_empty() || host.chars().any(char::is_whitespace) || target.port == 0 {
        return Err(BuildError::InvalidTarget(format!(
            "{}:{}",
            target.host, target.port
        )));
    }
    Ok(())
}

/// Parse the version stamp.
///
/// # Errors
///
/// Returns `BuildError::InvalidVersion` when `version` is not semver.
pub fn parse_version(version: &str) -> Result<semver::Version, BuildError> {
    semver::Version::parse(version.trim_start_matches('v'))
        .map_err(|_| BuildError::InvalidVersion(version.to_string()))
}

// ── Generated files ──────────────────────────────────────────────────────────

/// Settings written to `agent.conf`.
pub struct AgentConf<'a> {
    pub controller_host: &'a str,
    pub controller_port: u16,
    pub region: Option<&'a str>,
    pub owner: Option<&'a str>,
    pub version: &'a semver::Version,
}

/// Generate `agent.conf`, read by the agent at startup to find the controller
/// and the region it registers into.
#[must_use]
pub fn agent_conf(conf: &AgentConf<'_>) -> String {
    let mut out = String::from("# Generated by fleetctl - DO NOT EDIT\n");
    let _ = writeln!(out, "agent.controller_host={}", conf.controller_host);
    let _ = writeln!(out, "agent.controller_port={}", conf.controller_port);
    if let Some(region) = conf.region {
        let _ = writeln!(out, "agent.region={region}");
    }
    if let Some(owner) = conf.owner {
        let _ = writeln!(out, "agent.owner={owner}");
    }
    let _ = writeln!(out, "agent.version={}", conf.version);
    out
}

/// Generate `run_agent.sh`, the entry point installed on the agent host.
#[must_use]
pub fn run_script(launcher: &str, runtime: &str) -> String {
    format!(
        "#!/bin/sh\n\
         # Generated by fleetctl - DO NOT EDIT\n\
         cd \"$(dirname \"$0\")\" || exit 1\n\
         FLEET_AGENT_RUNTIME=\"$PWD/lib/{runtime}\"\n\
         export FLEET_AGENT_RUNTIME\n\
         exec \"$PWD/lib/{launcher}\" --config \"$PWD/agent.conf\" \"$@\"\n"
    )
}

#[derive(Serialize)]
struct Manifest<'a> {
    name: &'static str,
    version: String,
    built_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<&'a str>,
    files: Vec<ManifestFile<'a>>,
}

#[derive(Serialize)]
struct ManifestFile<'a> {
    path: &'a str,
    size: u64,
    sha256: String,
}

/// Generate `MANIFEST.json` listing every other entry with its digest.
///
/// # Errors
///
/// Returns `BuildError::Archive` if serialization fails.
pub fn manifest_json(
    version: &semver::Version,
    built_at: DateTime<Utc>,
    region: Option<&str>,
    owner: Option<&str>,
    entries: &[PackageEntry],
) -> Result<String, BuildError> {
    let manifest = Manifest {
        name: PACKAGE_ROOT,
        version: version.to_string(),
        built_at,
        region,
        owner,
        files: entries
            .iter()
            .map(|e| ManifestFile {
                path: &e.path,
                size: e.size(),
                sha256: sha256_hex(&e.data),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&manifest).map_err(|e| BuildError::Archive(e.to_string()))
}

// ── Naming ───────────────────────────────────────────────────────────────────

/// Replace anything outside `[A-Za-z0-9._-]` with `_`.
#[must_use]
pub fn sanitize_token(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `fleet-agent-<version>[-<region>][-<owner>][-<host>_<port>].tar.gz`
#[must_use]
pub fn package_file_name(
    version: &semver::Version,
    region: Option<&str>,
    owner: Option<&str>,
    target: Option<&PushTarget>,
) -> String {
    let mut name = format!("{PACKAGE_ROOT}-{version}");
    for token in [region, owner].into_iter().flatten() {
        let _ = write!(name, "-{}", sanitize_token(token));
    }
    if let Some(t) = target {
        let _ = write!(name, "-{}_{}", sanitize_token(&t.host), t.port);
    }
    name.push_str(".tar.gz");
    name
}

// ── Archive ──────────────────────────────────────────────────────────────────

/// Hex-encode a byte slice.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex_encode(&Sha256::digest(data))
}

/// Write `entries` under [`PACKAGE_ROOT`] into a gzip-compressed tar held in
/// memory. Entry mtimes are zeroed so equal inputs give equal archives.
///
/// # Errors
///
/// Returns `BuildError::Archive` if an entry cannot be appended.
pub fn write_archive(entries: &[PackageEntry]) -> Result<Vec<u8>, BuildError> {
    let archive_err = |e: std::io::Error| BuildError::Archive(e.to_string());

    let enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(enc);
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(entry.size());
        header.set_mode(entry.mode);
        header.set_mtime(0);
        header.set_entry_type(tar::EntryType::Regular);
        builder
            .append_data(
                &mut header,
                format!("{PACKAGE_ROOT}/{}", entry.path),
                entry.data.as_slice(),
            )
            .map_err(archive_err)?;
    }
    let mut enc = builder.into_inner().map_err(archive_err)?;
    enc.flush().map_err(archive_err)?;
    enc.finish().map_err(archive_err)
}
