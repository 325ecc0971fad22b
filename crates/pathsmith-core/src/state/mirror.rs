//! Local mirror of per-module statuses for saved learning paths.
//!
//! Status changes are not written back to the database; they are kept on the
//! device under `learning-path-<id>` and reapplied when the path is reopened.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow, bail};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

use pathsmith_db::models::ModuleStatus;

/// Module id to status, as stored in the mirror.
pub type StatusMap = BTreeMap<String, ModuleStatus>;

/// Mirror key for a saved path.
pub fn mirror_key(path_id: Uuid) -> String {
    format!("learning-path-{path_id}")
}

/// Key-value storage for status maps.
pub trait StatusStore: Send + Sync {
    /// The stored map, or `None` when there is no usable entry.
    fn load(&self, key: &str) -> Result<Option<StatusMap>>;

    /// Replace the entry for `key`.
    fn store(&self, key: &str, statuses: &StatusMap) -> Result<()>;

    /// Drop the entry for `key`. Absent keys are fine.
    fn remove(&self, key: &str) -> Result<()>;

    /// Read-modify-write the entry for `key`. Updates through the same
    /// store are serialized, so concurrent callers never lose each other's
    /// changes. A missing entry starts empty. Returns the map as written.
    fn update(&self, key: &str, apply: &mut dyn FnMut(&mut StatusMap)) -> Result<StatusMap>;
}

impl<T: StatusStore + ?Sized> StatusStore for Arc<T> {
    fn load(&self, key: &str) -> Result<Option<StatusMap>> {
        (**self).load(key)
    }

    fn store(&self, key: &str, statuses: &StatusMap) -> Result<()> {
        (**self).store(key, statuses)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn update(&self, key: &str, apply: &mut dyn FnMut(&mut StatusMap)) -> Result<StatusMap> {
        (**self).update(key, apply)
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Default mirror directory.
///
/// Uses XDG layout: `$XDG_DATA_HOME/pathsmith/status` or
/// `~/.local/share/pathsmith/status`.
pub fn default_status_dir() -> PathBuf {
    let base = match std::env::var("XDG_DATA_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".local")
            .join("share"),
    };
    base.join("pathsmith").join("status")
}

/// One JSON file per key under a directory.
///
/// Files are replaced by rename, so readers never see a partial write.
/// Writers sharing one store (or its clones) are serialized.
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    dir: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileStatusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn write_lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| anyhow!("status mirror lock poisoned"))
    }

    fn write_file(&self, path: &Path, statuses: &StatusMap) -> Result<()> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create status directory {}", self.dir.display())
        })?;

        let contents =
            serde_json::to_string_pretty(statuses).context("failed to serialize statuses")?;
        let mut tmp = NamedTempFile::new_in(&self.dir).with_context(|| {
            format!("failed to create temp file in {}", self.dir.display())
        })?;
        tmp.write_all(contents.as_bytes())
            .context("failed to write status mirror temp file")?;
        tmp.persist(path)
            .with_context(|| format!("failed to write status mirror {}", path.display()))?;
        Ok(())
    }

    fn file_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            bail!("invalid status mirror key {key:?}");
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl StatusStore for FileStatusStore {
    fn load(&self, key: &str) -> Result<Option<StatusMap>> {
        let path = self.file_for(key)?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read status mirror {}", path.display()));
            }
        };

        match serde_json::from_str::<StatusMap>(&contents) {
            Ok(map) => Ok(Some(map)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt status mirror");
                Ok(None)
            }
        }
    }

    fn store(&self, key: &str, statuses: &StatusMap) -> Result<()> {
        let path = self.file_for(key)?;
        let _guard = self.write_lock()?;
        self.write_file(&path, statuses)?;

        debug!(key, entries = statuses.len(), "status mirror written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.file_for(key)?;
        let _guard = self.write_lock()?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("failed to remove status mirror {}", path.display())),
        }
    }

    fn update(&self, key: &str, apply: &mut dyn FnMut(&mut StatusMap)) -> Result<StatusMap> {
        let path = self.file_for(key)?;
        let _guard = self.write_lock()?;

        let mut statuses = self.load(key)?.unwrap_or_default();
        apply(&mut statuses);
        self.write_file(&path, &statuses)?;

        debug!(key, entries = statuses.len(), "status mirror updated");
        Ok(statuses)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    entries: Mutex<HashMap<String, StatusMap>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, StatusMap>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("status store lock poisoned"))
    }
}

impl StatusStore for MemoryStatusStore {
    fn load(&self, key: &str) -> Result<Option<StatusMap>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn store(&self, key: &str, statuses: &StatusMap) -> Result<()> {
        self.entries()?.insert(key.to_string(), statuses.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }

    fn update(&self, key: &str, apply: &mut dyn FnMut(&mut StatusMap)) -> Result<StatusMap> {
        let mut entries = self.entries()?;
        let statuses = entries.entry(key.to_string()).or_default();
        apply(statuses);
        Ok(statuses.clone())
    }
}
