pub mod error;
pub mod pairs;
pub mod raw;

pub use error::ScanError;
pub use pairs::{bisect_pairs, list_scan_files, load_pairs, scan_number, ScanPair};
pub use raw::{RawScan, SCAN_COLUMNS};
