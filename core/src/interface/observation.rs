use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::prelude::Polarization;
use crate::scan::ScanError;

/// Epoch-wide fields of a parsed observation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogHeader {
    /// Observation date, `DD Mon YYYY`.
    pub dates: String,
    /// Observatory tag used to pick the calibration profile.
    pub location: String,
    /// Baseband converter offset added to the logged frequency (MHz).
    pub bbc_offset_mhz: f64,
}

/// Logged state of the telescope for one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub system_temperatures: Vec<f64>,
    pub elevation: f64,
    /// `HH:MM:SS`
    pub start_time: String,
    /// `DD Mon YYYY`
    pub date: String,
    /// Sexagesimal hours, minutes, seconds.
    pub right_ascension: Vec<String>,
    /// Sexagesimal degrees, arcminutes, arcseconds.
    pub declination: Vec<String>,
    pub frequency_mhz: f64,
}

impl ScanMetadata {
    pub fn system_temperature(&self, polarization: Polarization) -> Option<f64> {
        self.system_temperatures
            .get(polarization.tsys_index())
            .copied()
    }
}

/// Read-only access to a pre-parsed observation log.
pub trait ObservationLog {
    fn header(&self) -> &LogHeader;
    fn scan(&self, number: u32) -> Option<&ScanMetadata>;
}

/// Observation log stored as JSON:
/// `{"header": {...}, "scans": {"<number>": {...}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonObservationLog {
    pub header: LogHeader,
    pub scans: BTreeMap<u32, ScanMetadata>,
}

impl JsonObservationLog {
    pub fn load(path: &Path) -> Result<Self, ScanError> {
        let text = fs::read_to_string(path).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ScanError::ObservationLog {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ObservationLog for JsonObservationLog {
    fn header(&self) -> &LogHeader {
        &self.header
    }

    fn scan(&self, number: u32) -> Option<&ScanMetadata> {
        self.scans.get(&number)
    }
}
