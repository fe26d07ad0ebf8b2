use std::path::PathBuf;

/// Input faults. Any of these stops a run before calibration starts.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("scan directory {0} does not exist")]
    MissingDirectory(PathBuf),
    #[error("scan directory {0} holds fewer than two scan files")]
    NoPairs(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot derive a scan number from file name {0}")]
    ScanNumber(String),
    #[error("{path}, line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("{path}, line {line}: {token:?} is not a number")]
    NotANumber {
        path: PathBuf,
        line: usize,
        token: String,
    },
    #[error("{0} has no data rows after the header")]
    Empty(PathBuf),
    #[error("pair {signal} / {reference} differs in row count ({signal_rows} vs {reference_rows})")]
    RowMismatch {
        signal: String,
        reference: String,
        signal_rows: usize,
        reference_rows: usize,
    },
    #[error("observation log {path} is not valid: {source}")]
    ObservationLog {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
