use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::interface::record::{AveragedSpectrum, EpochKey, ExperimentRecord};
use crate::interface::store::{ResultStore, StoreError};
use crate::storage::{lock_for, write_atomically};

/// JSON result store `<result_dir>/<source>.json` plus averaged-spectrum
/// tables under `table_dir`.
#[derive(Debug, Clone)]
pub struct FileResultStore {
    store_path: PathBuf,
    table_dir: PathBuf,
}

impl FileResultStore {
    pub fn new(result_dir: &Path, table_dir: &Path, source: &str) -> Self {
        Self {
            store_path: result_dir.join(format!("{source}.json")),
            table_dir: table_dir.to_path_buf(),
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn table_path(&self, epoch: &EpochKey) -> PathBuf {
        self.table_dir.join(epoch.table_file_name())
    }

    /// Every recorded run; an absent store reads as empty.
    pub fn load(&self) -> Result<BTreeMap<String, ExperimentRecord>, StoreError> {
        if !self.store_path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(&self.store_path).map_err(|source| StoreError::Io {
            path: self.store_path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
            path: self.store_path.clone(),
            source,
        })
    }
}

impl ResultStore for FileResultStore {
    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.load()?.contains_key(key))
    }

    fn create_if_absent(&self) -> Result<(), StoreError> {
        let lock = lock_for(&self.store_path)?;
        let _guard = lock
            .lock()
            .map_err(|_| StoreError::LockPoisoned(self.store_path.clone()))?;
        if self.store_path.exists() {
            return Ok(());
        }
        info!("creating result store {}", self.store_path.display());
        write_atomically(&self.store_path, b"{}\n")
    }

    fn append(&self, key: &str, record: &ExperimentRecord) -> Result<(), StoreError> {
        let lock = lock_for(&self.store_path)?;
        let _guard = lock
            .lock()
            .map_err(|_| StoreError::LockPoisoned(self.store_path.clone()))?;

        let mut records = self.load()?;
        if records.insert(key.to_string(), record.clone()).is_some() {
            info!("replacing earlier result for {key}");
        }
        let json =
            serde_json::to_string_pretty(&records).map_err(|source| StoreError::Serialise {
                path: self.store_path.clone(),
                source,
            })?;
        write_atomically(&self.store_path, json.as_bytes())
    }

    fn write_spectrum(
        &self,
        epoch: &EpochKey,
        spectrum: &AveragedSpectrum,
    ) -> Result<(), StoreError> {
        let path = self.table_path(epoch);
        let lock = lock_for(&path)?;
        let _guard = lock
            .lock()
            .map_err(|_| StoreError::LockPoisoned(path.clone()))?;

        let mut table = String::with_capacity(spectrum.len() * 78);
        for ((v, a), b) in spectrum
            .velocity
            .iter()
            .zip(&spectrum.flux_a)
            .zip(&spectrum.flux_b)
        {
            // writing into a String cannot fail
            let _ = writeln!(table, "{v:.18e} {a:.18e} {b:.18e}");
        }
        info!("writing averaged spectrum to {}", path.display());
        write_atomically(&path, table.as_bytes())
    }
}
