use std::{
    collections::HashMap,
    fs, io,
    path::PathBuf,
    sync::Mutex,
};

use thiserror::Error;

use crate::expiry::Expiry;

/// Full record set: UID to expiration marker.
pub type Records = HashMap<String, Expiry>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
    #[error("storage file is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// File-backed record store. The file holds a single flat JSON object
/// mapping UID to marker string, and this struct is its only owner.
///
/// Every operation re-reads the file, so the file stays the single source
/// of truth across process restarts. The internal lock serializes whole
/// load-modify-save sequences; handlers and the sweep all go through it.
pub struct Store {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Store {
    /// Opens the store, eagerly creating an empty mapping if the file does
    /// not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Store, StoreError> {
        let store = Store {
            path: path.into(),
            lock: Mutex::new(()),
        };
        store.ensure_file()?;
        Ok(store)
    }

    fn ensure_file(&self) -> Result<(), StoreError> {
        if !self.path.exists() {
            fs::write(&self.path, "{}")?;
        }
        Ok(())
    }

    fn read_records(&self) -> Result<Records, StoreError> {
        self.ensure_file()?;
        let data = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn write_records(&self, records: &Records) -> Result<(), StoreError> {
        let data = serde_json::to_string(records)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    /// Returns the current record set. Fails if the file exists but does
    /// not parse; no recovery is attempted.
    pub fn load(&self) -> Result<Records, StoreError> {
        let _guard = self.lock.lock().expect("failed to get store lock");
        self.read_records()
    }

    /// Replaces the persisted mapping wholesale.
    pub fn save(&self, records: &Records) -> Result<(), StoreError> {
        let _guard = self.lock.lock().expect("failed to get store lock");
        self.write_records(records)
    }

    /// Runs `f` against the freshly loaded mapping and persists the result,
    /// all under the store lock. This is the only mutation path.
    pub fn update<T>(&self, f: impl FnOnce(&mut Records) -> T) -> Result<T, StoreError> {
        let _guard = self.lock.lock().expect("failed to get store lock");
        let mut records = self.read_records()?;
        let out = f(&mut records);
        self.write_records(&records)?;
        Ok(out)
    }
}
