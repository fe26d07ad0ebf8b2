//! Result-store implementations.
//!
//! Every write goes to a temporary file in the destination directory that is
//! then renamed over the target, so a failed run never leaves a truncated
//! file behind. Writers to the same path within one process are serialised
//! through a per-path lock.

pub mod file;
pub mod memory;

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tempfile::NamedTempFile;

use crate::interface::store::StoreError;

pub use file::FileResultStore;
pub use memory::MemoryResultStore;

fn path_locks() -> &'static Mutex<HashMap<PathBuf, Arc<Mutex<()>>>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Advisory lock shared by every writer of `path` in this process.
pub(crate) fn lock_for(path: &Path) -> Result<Arc<Mutex<()>>, StoreError> {
    let mut locks = path_locks()
        .lock()
        .map_err(|_| StoreError::LockPoisoned(path.to_path_buf()))?;
    Ok(locks
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone())
}

/// Replaces `path` with `contents` via a temporary sibling file.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(io_err)?;

    let mut temp = NamedTempFile::new_in(&dir).map_err(io_err)?;
    temp.write_all(contents).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}
