use std::fs;
use std::path::Path;

use log::info;

use crate::scan::{RawScan, ScanError};

/// Signal and reference scans that were adjacent in the sorted listing.
#[derive(Debug, Clone)]
pub struct ScanPair {
    pub signal_file: String,
    pub reference_file: String,
    pub signal_number: u32,
    pub reference_number: u32,
    pub signal: RawScan,
    pub reference: RawScan,
}

/// Sorted names of the regular files in `dir`.
pub fn list_scan_files(dir: &Path) -> Result<Vec<String>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::MissingDirectory(dir.to_path_buf()));
    }
    let io_err = |source: std::io::Error| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Consecutive pairs `(files[2i], files[2i + 1])`; a trailing odd file is dropped.
pub fn bisect_pairs<T: Clone>(files: &[T]) -> Vec<(T, T)> {
    files
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}

/// Scan number embedded in a file name such as `cepa_ir0007.dat`: the last
/// `_`-separated token of the stem, minus its two-letter prefix and zero
/// padding.
pub fn scan_number(file_name: &str) -> Result<u32, ScanError> {
    let invalid = || ScanError::ScanNumber(file_name.to_string());
    let stem = file_name.split('.').next().unwrap_or(file_name);
    let token = stem.rsplit('_').next().unwrap_or(stem);
    let digits = token.get(2..).ok_or_else(invalid)?;
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return if digits.is_empty() { Err(invalid()) } else { Ok(0) };
    }
    trimmed.parse().map_err(|_| invalid())
}

/// Lists, pairs and parses every scan in `dir`.
pub fn load_pairs(dir: &Path) -> Result<Vec<ScanPair>, ScanError> {
    let files = list_scan_files(dir)?;
    let names = bisect_pairs(&files);
    if names.is_empty() {
        return Err(ScanError::NoPairs(dir.to_path_buf()));
    }
    if files.len() % 2 == 1 {
        info!("ignoring unpaired trailing scan {}", files[files.len() - 1]);
    }

    let mut pairs = Vec::with_capacity(names.len());
    for (signal_file, reference_file) in names {
        let signal = RawScan::load(&dir.join(&signal_file))?;
        let reference = RawScan::load(&dir.join(&reference_file))?;
        if signal.row_count() != reference.row_count() {
            return Err(ScanError::RowMismatch {
                signal: signal_file,
                reference: reference_file,
                signal_rows: signal.row_count(),
                reference_rows: reference.row_count(),
            });
        }
        pairs.push(ScanPair {
            signal_number: scan_number(&signal_file)?,
            reference_number: scan_number(&reference_file)?,
            signal_file,
            reference_file,
            signal,
            reference,
        });
    }

    info!("loaded {} scan pairs from {}", pairs.len(), dir.display());
    Ok(pairs)
}
