// libs/checkin-cell/src/services/version_store.rs
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CheckinError;

/// Storage key the data version is kept under.
pub const DATA_VERSION_KEY: &str = "dataVersion";

/// Local persistence for the last seen server data version.
pub trait VersionStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, CheckinError>;
    fn save(&self, version: &str) -> Result<(), CheckinError>;
}

#[derive(Default)]
pub struct MemoryVersionStore {
    value: Mutex<Option<String>>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(version: &str) -> Self {
        Self {
            value: Mutex::new(Some(version.to_string())),
        }
    }
}

impl VersionStore for MemoryVersionStore {
    fn load(&self) -> Result<Option<String>, CheckinError> {
        let guard = self
            .value
            .lock()
            .map_err(|_| CheckinError::Storage("version store lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, version: &str) -> Result<(), CheckinError> {
        let mut guard = self
            .value
            .lock()
            .map_err(|_| CheckinError::Storage("version store lock poisoned".to_string()))?;
        *guard = Some(version.to_string());
        Ok(())
    }
}

/// JSON key-value file. Other keys in the file are preserved on save.
pub struct FileVersionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileVersionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, Value>, CheckinError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(|b| b.is_ascii_whitespace()) => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl VersionStore for FileVersionStore {
    fn load(&self) -> Result<Option<String>, CheckinError> {
        let entries = self.read_entries()?;
        Ok(match entries.get(DATA_VERSION_KEY) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        })
    }

    fn save(&self, version: &str) -> Result<(), CheckinError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CheckinError::Storage("version file lock poisoned".to_string()))?;

        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(CheckinError::Serialization(e)) => {
                warn!("Overwriting unreadable version file {}: {}", self.path.display(), e);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        entries.insert(DATA_VERSION_KEY.to_string(), Value::String(version.to_string()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, serde_json::to_vec_pretty(&entries)?)?;
        fs::rename(&tmp_path, &self.path)?;

        debug!("Persisted data version {} to {}", version, self.path.display());
        Ok(())
    }
}
