use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError}
};

use tracing::debug;

use crate::{auth::CredentialStore, web::Error};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, Error> {
        Ok(lock(&self.entries).remove(key).is_some())
    }

    fn apply(&self, set: &[(&str, &str)], remove: &[&str]) -> Result<bool, Error> {
        let mut entries = lock(&self.entries);
        for (key, value) in set {
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(remove.iter().fold(false, |removed, key| entries.remove(*key).is_some() || removed))
    }
}

/// Session storage backed by a JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|error| Error::Store(format!("Unable to parse credential file {} => {}", path.display(), error)))?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => return Err(Error::Store(format!("Unable to read credential file {} => {}", path.display(), error)))
        };

        debug!(path = %path.display(), keys = entries.len(), "Opened credential store");
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), Error> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|error| Error::Store(format!("Unable to serialize credential file {} => {}", self.path.display(), error)))?;
        let temporary = self.path.with_extension("tmp");
        fs::write(&temporary, content)
            .and_then(|_| fs::rename(&temporary, &self.path))
            .map_err(|error| Error::Store(format!("Unable to write credential file {} => {}", self.path.display(), error)))
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut entries = lock(&self.entries);
        if entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<bool, Error> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.persist(&entries)?;
        Ok(true)
    }

    fn apply(&self, set: &[(&str, &str)], remove: &[&str]) -> Result<bool, Error> {
        let mut entries = lock(&self.entries);
        let mut changed = false;
        for (key, value) in set {
            if entries.get(*key).map(String::as_str) != Some(*value) {
                entries.insert(key.to_string(), value.to_string());
                changed = true;
            }
        }
        let mut removed = false;
        for key in remove {
            removed |= entries.remove(*key).is_some();
        }

        if changed || removed {
            self.persist(&entries)?;
        }
        Ok(removed)
    }
}
