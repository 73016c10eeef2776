//! Filesystem infrastructure: implements `ArtifactReader` and writes
//! finished packages.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ArtifactReader;
use crate::domain::PackagedArtifact;

/// Production filesystem implementation of `ArtifactReader`.
pub struct LocalFs;

impl ArtifactReader for LocalFs {
    async fn size(&self, location: &Path) -> Result<u64> {
        let path = location.to_path_buf();
        tokio::task::spawn_blocking(move || {
            std::fs::metadata(&path)
                .map(|m| m.len())
                .with_context(|| format!("reading artifact metadata {}", path.display()))
        })
        .await
        .context("spawn_blocking for artifact metadata")?
    }

    async fn read(&self, location: &Path) -> Result<Vec<u8>> {
        let path = location.to_path_buf();
        tokio::task::spawn_blocking(move || {
            std::fs::read(&path).with_context(|| format!("reading artifact {}", path.display()))
        })
        .await
        .context("spawn_blocking for artifact read")?
    }
}

impl LocalFs {
    /// Regular files directly inside `dir`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in
            std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))?
        {
            let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Write a package and its `.sha256` sidecar into `dir`.
    ///
    /// The archive is written to a temp file and renamed into place so a
    /// reader never sees a partial package.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or either file cannot be written.
    pub fn write_package(&self, dir: &Path, artifact: &PackagedArtifact) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating directory {}", dir.display()))?;
        let path = dir.join(&artifact.file_name);
        let temp_path = dir.join(format!(".{}.tmp", artifact.file_name));
        std::fs::write(&temp_path, &artifact.bytes)
            .with_context(|| format!("writing {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("finalizing {}", path.display()))?;

        let sidecar = dir.join(format!("{}.sha256", artifact.file_name));
        std::fs::write(
            &sidecar,
            format!("{}  {}\n", artifact.sha256, artifact.file_name),
        )
        .with_context(|| format!("writing {}", sidecar.display()))?;
        Ok(path)
    }
}
