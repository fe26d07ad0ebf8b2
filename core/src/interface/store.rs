use std::path::PathBuf;

use crate::interface::record::{AveragedSpectrum, EpochKey, ExperimentRecord};

/// Persistence faults. Fatal to the run.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("i/o failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("result store {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialise results for {path}: {source}")]
    Serialise {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("lock on {0} was poisoned by a failed writer")]
    LockPoisoned(PathBuf),
}

/// Where finished runs are recorded.
pub trait ResultStore {
    /// Whether a run is already recorded under `key`.
    fn exists(&self, key: &str) -> Result<bool, StoreError>;
    /// Creates an empty store (`{}`) if there is none yet.
    fn create_if_absent(&self) -> Result<(), StoreError>;
    /// Records `record` under `key`, replacing an earlier run with the same key.
    fn append(&self, key: &str, record: &ExperimentRecord) -> Result<(), StoreError>;
    /// Writes the averaged spectrum table for `epoch`.
    fn write_spectrum(&self, epoch: &EpochKey, spectrum: &AveragedSpectrum)
        -> Result<(), StoreError>;
}
