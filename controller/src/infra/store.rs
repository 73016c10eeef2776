//! Infrastructure implementation of the `AgentStore` port.
//!
//! `JsonFileStore` keeps every record in one JSON document, loaded and saved
//! on `tokio::task::spawn_blocking`. Every read-modify-write cycle holds an
//! exclusive advisory lock on a sibling `.lock` file, so several `fleetctl`
//! processes can share one store. Saves go through a uniquely named temp file
//! in the same directory and are renamed into place.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use fleet_common::{AgentId, AgentInfo, AgentRecord};
use fs4::fs_std::FileExt as _;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::application::ports::AgentStore;

/// On-disk document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreFile {
    /// Next id to assign. Only ever grows, so ids are never reused.
    #[serde(default = "first_id")]
    next_id: u64,
    #[serde(default)]
    agents: Vec<AgentInfo>,
}

fn first_id() -> u64 {
    1
}

/// Agent records persisted in a single JSON file.
pub struct JsonFileStore {
    path: Arc<PathBuf>,
    /// Keeps this process from parking several blocking threads on the file lock.
    write: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store using the default path (`~/.fleet/agents.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::with_path(home.join(".fleet").join("agents.json")))
    }

    /// Create a store with an explicit path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
            write: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<StoreFile> {
        let path = Arc::clone(&self.path);
        tokio::task::spawn_blocking(move || load_sync(&path))
            .await
            .context("store load task panicked")?
    }

    /// Run `f` on the current document under the store lock. `f` returns its
    /// result and whether the document changed; only changed documents are
    /// saved.
    async fn modify<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut StoreFile) -> (T, bool) + Send + 'static,
    {
        let _write = self.write.lock().await;
        let path = Arc::clone(&self.path);
        tokio::task::spawn_blocking(move || {
            let _lock = lock_store(&path)?;
            let mut file = load_sync(&path)?;
            let (out, changed) = f(&mut file);
            if changed {
                save_sync(&path, &file)?;
            }
            Ok(out)
        })
        .await
        .context("store write task panicked")?
    }
}

/// `<store>.lock`, next to the store file.
fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Take the exclusive advisory lock. Released when the returned file drops.
fn lock_store(path: &Path) -> Result<File> {
    ensure_parent(path)?;
    let lock_path = lock_path(path);
    let lock = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("opening lock file {}", lock_path.display()))?;
    lock.lock_exclusive()
        .with_context(|| format!("locking agent store {}", path.display()))?;
    Ok(lock)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    Ok(())
}

fn load_sync(path: &Path) -> Result<StoreFile> {
    if !path.exists() {
        return Ok(StoreFile {
            next_id: first_id(),
            agents: Vec::new(),
        });
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading agent store {}", path.display()))?;
    let mut file: StoreFile = serde_json::from_str(&content)
        .with_context(|| format!("parsing agent store {}", path.display()))?;
    // Never hand out an id at or below one already stored.
    let max_id = file.agents.iter().map(|a| a.id.0).max().unwrap_or(0);
    file.next_id = file.next_id.max(max_id + 1);
    Ok(file)
}

fn save_sync(path: &Path, file: &StoreFile) -> Result<()> {
    ensure_parent(path)?;
    let content = serde_json::to_string_pretty(file).context("serializing agent store")?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    temp.write_all(content.as_bytes())
        .with_context(|| format!("writing temp file {}", temp.path().display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("setting permissions on {}", temp.path().display()))?;
    }

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("finalizing agent store {}", path.display()))?;
    Ok(())
}

impl AgentStore for JsonFileStore {
    async fn create(&self, record: &AgentRecord) -> Result<AgentId> {
        let record = record.clone();
        self.modify(move |file| {
            let id = AgentId(file.next_id);
            file.next_id += 1;
            file.agents.push(AgentInfo { id, record });
            (id, true)
        })
        .await
    }

    async fn get(&self, id: AgentId) -> Result<Option<AgentInfo>> {
        let file = self.load().await?;
        Ok(file.agents.into_iter().find(|a| a.id == id))
    }

    async fn update(&self, agent: &AgentInfo) -> Result<bool> {
        let agent = agent.clone();
        self.modify(move |file| {
            match file.agents.iter_mut().find(|a| a.id == agent.id) {
                Some(slot) => {
                    slot.record = agent.record;
                    (true, true)
                }
                None => (false, false),
            }
        })
        .await
    }

    async fn delete(&self, id: AgentId) -> Result<bool> {
        self.modify(move |file| {
            let before = file.agents.len();
            file.agents.retain(|a| a.id != id);
            let deleted = file.agents.len() != before;
            (deleted, deleted)
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<AgentInfo>> {
        Ok(self.load().await?.agents)
    }
}
