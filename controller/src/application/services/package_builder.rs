//! Application service — agent package assembly.
//!
//! Gathers the runtime core, the launcher and any allowed dependency
//! artifacts, generates the agent's configuration and entry script, and packs
//! everything into one gzip-compressed tar held in memory. Building a package
//! does not register anything; the deployed agent registers itself later.

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use tracing::debug;

use crate::application::ports::{ArtifactReader, ProgressReporter};
use crate::domain::agent::is_valid_region;
use crate::domain::package::{
    self, AgentConf, ArtifactKind, PackageEntry, agent_conf, classify, is_safe_artifact_name,
    manifest_json, package_file_name, parse_version, run_script, validate_owner,
    validate_target, write_archive,
};
use crate::domain::{
    BuildError, Delivery, PackageBound, PackageConfig, PackageRequest, PackagedArtifact,
};

struct Collected {
    runtime: Option<(String, Vec<u8>)>,
    launcher: Option<(String, Vec<u8>)>,
    dependencies: Vec<(String, Vec<u8>)>,
    /// Runtime and launcher bytes accepted so far.
    mandatory_bytes: u64,
    /// All artifact bytes accepted so far.
    artifact_bytes: u64,
}

impl Collected {
    /// Count `bytes` of a `kind` artifact against `bound`.
    fn charge(&mut self, kind: ArtifactKind, bytes: u64, bound: u64) -> Result<(), BuildError> {
        if kind != ArtifactKind::Dependency {
            self.mandatory_bytes += bytes;
            if self.mandatory_bytes > bound {
                return Err(BuildError::BoundExceeded {
                    what: "runtime and launcher alone",
                    required: self.mandatory_bytes,
                    bound,
                });
            }
        }
        self.artifact_bytes += bytes;
        if self.artifact_bytes > bound {
            return Err(BuildError::BoundExceeded {
                what: "collected artifacts",
                required: self.artifact_bytes,
                bound,
            });
        }
        Ok(())
    }
}

/// Builds agent packages according to a [`PackageConfig`].
pub struct PackageBuilder {
    config: PackageConfig,
}

impl PackageBuilder {
    #[must_use]
    pub fn new(config: PackageConfig) -> Self {
        Self { config }
    }

    /// The bound used when the caller does not supply one.
    #[must_use]
    pub fn default_bound(&self) -> PackageBound {
        PackageBound {
            max_bytes: self.config.max_bytes,
            version: self.config.version.clone(),
        }
    }

    /// Build one package.
    ///
    /// # Errors
    ///
    /// - `InvalidVersion`, `InvalidTarget`, `InvalidRegion` or `InvalidOwner`
    ///   for a malformed request
    /// - `InvalidArtifactName` if a packaged file name is not shell-safe
    /// - `Source` if a candidate artifact cannot be read
    /// - `MissingArtifact` if no runtime or no launcher was supplied
    /// - `BoundExceeded` if the payload would exceed `request.bound.max_bytes`;
    ///   artifacts are measured before they are read, so an oversized input
    ///   is never buffered
    /// - `Archive` if the archive cannot be written
    pub async fn build(
        &self,
        reader: &impl ArtifactReader,
        reporter: &impl ProgressReporter,
        request: &PackageRequest,
    ) -> Result<PackagedArtifact, BuildError> {
        let version = parse_version(&request.bound.version)?;
        if let Some(target) = &request.target {
            validate_target(target)?;
        }
        if let Some(region) = &request.region
            && !is_valid_region(region)
        {
            return Err(BuildError::InvalidRegion(region.clone()));
        }
        if let Some(owner) = &request.owner {
            validate_owner(owner)?;
        }

        let bound = request.bound.max_bytes;
        reporter.step("collecting agent artifacts...");
        let collected = self
            .collect(reader, reporter, &request.artifacts, bound)
            .await?;
        let (runtime_name, runtime) =
            collected
                .runtime
                .ok_or_else(|| BuildError::MissingArtifact {
                    kind: "runtime",
                    prefix: self.config.runtime_prefix.clone(),
                })?;
        let (launcher_name, launcher) =
            collected
                .launcher
                .ok_or_else(|| BuildError::MissingArtifact {
                    kind: "launcher",
                    prefix: self.config.launcher_prefix.clone(),
                })?;

        let conf = agent_conf(&AgentConf {
            controller_host: &self.config.controller_host,
            controller_port: self.config.controller_port,
            region: request.region.as_deref(),
            owner: request.owner.as_deref(),
            version: &version,
        });
        let script = run_script(&launcher_name, &runtime_name);

        let mut entries = vec![
            PackageEntry::file(format!("lib/{runtime_name}"), runtime),
            PackageEntry::executable(format!("lib/{launcher_name}"), launcher),
        ];
        entries.extend(
            collected
                .dependencies
                .into_iter()
                .map(|(name, data)| PackageEntry::file(format!("lib/{name}"), data)),
        );
        entries.push(PackageEntry::file("agent.conf".to_string(), conf.into_bytes()));
        entries.push(PackageEntry::executable(
            "run_agent.sh".to_string(),
            script.into_bytes(),
        ));
        let manifest = manifest_json(
            &version,
            Utc::now(),
            request.region.as_deref(),
            request.owner.as_deref(),
            &entries,
        )?;
        entries.push(PackageEntry::file(
            "MANIFEST.json".to_string(),
            manifest.into_bytes(),
        ));

        let payload_bytes: u64 = entries.iter().map(PackageEntry::size).sum();
        if payload_bytes > bound {
            return Err(BuildError::BoundExceeded {
                what: "full package",
                required: payload_bytes,
                bound,
            });
        }

        let file_name = package_file_name(
            &version,
            request.region.as_deref(),
            request.owner.as_deref(),
            request.target.as_ref(),
        );
        reporter.step(&format!("assembling {file_name}..."));
        let bytes = write_archive(&entries)?;
        let sha256 = package::sha256_hex(&bytes);

        let delivery = match &request.target {
            Some(t) => Delivery::Push {
                host: t.host.trim().to_string(),
                port: t.port,
            },
            None => Delivery::Manual,
        };

        reporter.success(&format!(
            "built {file_name} ({} files, {payload_bytes} bytes payload)",
            entries.len()
        ));
        Ok(PackagedArtifact {
            file_name,
            bytes,
            sha256,
            payload_bytes,
            delivery,
        })
    }

    /// Read the artifacts that belong in the package, in request order.
    /// The first file with a given name wins; unrelated files are skipped.
    /// Each artifact is charged against `bound` before it is read.
    async fn collect(
        &self,
        reader: &impl ArtifactReader,
        reporter: &impl ProgressReporter,
        locations: &[std::path::PathBuf],
        bound: u64,
    ) -> Result<Collected, BuildError> {
        let mut seen = HashSet::new();
        let mut collected = Collected {
            runtime: None,
            launcher: None,
            dependencies: Vec::new(),
            mandatory_bytes: 0,
            artifact_bytes: 0,
        };

        for location in locations {
            let Some(name) = file_name(location) else {
                reporter.warn(&format!("skipping {}: no file name", location.display()));
                continue;
            };
            let Some(kind) = classify(&name, &self.config) else {
                debug!(artifact = %location.display(), "not a package artifact, skipped");
                continue;
            };
            if !is_safe_artifact_name(&name) {
                return Err(BuildError::InvalidArtifactName(name));
            }
            if !seen.insert(name.clone()) {
                reporter.warn(&format!("skipping duplicate artifact {name}"));
                continue;
            }
            let slot_taken = match kind {
                ArtifactKind::Runtime => collected.runtime.is_some(),
                ArtifactKind::Launcher => collected.launcher.is_some(),
                ArtifactKind::Dependency => false,
            };
            if slot_taken {
                reporter.warn(&format!("skipping extra {kind:?} artifact {name}"));
                continue;
            }

            let source_error = |e: anyhow::Error| BuildError::Source {
                path: location.display().to_string(),
                reason: format!("{e:#}"),
            };
            let size = reader.size(location).await.map_err(source_error)?;
            collected.charge(kind, size, bound)?;
            let data = reader.read(location).await.map_err(source_error)?;
            // The file may have grown between measuring and reading.
            let grown = (data.len() as u64).saturating_sub(size);
            if grown > 0 {
                collected.charge(kind, grown, bound)?;
            }

            debug!(artifact = %name, ?kind, bytes = data.len(), "artifact collected");
            match kind {
                ArtifactKind::Runtime => collected.runtime = Some((name, data)),
                ArtifactKind::Launcher => collected.launcher = Some((name, data)),
                ArtifactKind::Dependency => collected.dependencies.push((name, data)),
            }
        }
        Ok(collected)
    }
}

fn file_name(location: &Path) -> Option<String> {
    location
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}
