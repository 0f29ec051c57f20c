//! Process-wide key-value storage for small JSON documents.
//!
//! Values are opaque strings; callers own the (de)serialization and decide how
//! to treat unreadable payloads. Every `put` replaces the whole document.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::global;

/// Well-known keys.
pub mod keys {
    pub const USER_PROFILE: &str = "user_profile";
    pub const MEETING_HISTORY: &str = "meeting_history";
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a directory.
///
/// Writes go through a temp file in the same directory and are renamed into
/// place under an advisory lock, so a reader never sees a half-written file.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the user's data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(global::store_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn acquire_lock(&self) -> Result<StoreLock> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create store directory {:?}", self.dir))?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.dir.join(".lock"))
            .context("Failed to open store lock file")?;
        FileExt::lock_exclusive(&file).context("Failed to acquire store lock")?;
        Ok(StoreLock { file })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Failed to read {:?}", path)),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let _lock = self.acquire_lock()?;
        let path = self.path_for(key);

        let mut tmp = NamedTempFile::new_in(&self.dir).context("Failed to create temp file")?;
        tmp.write_all(value.as_bytes())
            .context("Failed to write temp file")?;
        tmp.as_file().sync_all().context("Failed to flush temp file")?;
        tmp.persist(&path)
            .map_err(|err| err.error)
            .with_context(|| format!("Failed to move temp file into {:?}", path))?;

        debug!("Stored {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _lock = self.acquire_lock()?;
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("Failed to remove {:?}", path)),
        }
    }
}

struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            debug!("Failed to release store lock: {err:?}");
        }
    }
}

/// Volatile store, used in tests and for runs that must not touch disk.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}
