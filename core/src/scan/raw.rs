use std::fs;
use std::path::Path;

use ndarray::{Array2, ArrayView1};

use crate::prelude::Polarization;
use crate::scan::ScanError;

/// Number of whitespace-separated columns in a raw scan table.
pub const SCAN_COLUMNS: usize = 9;

/// Parsed scan table: one row per channel, column 0 is the frequency axis
/// (MHz offset), columns 1 and 2 the two polarization amplitudes.
#[derive(Debug, Clone, PartialEq)]
pub struct RawScan {
    rows: Array2<f64>,
}

impl RawScan {
    pub fn from_rows(rows: Array2<f64>) -> Self {
        Self { rows }
    }

    pub fn load(path: &Path) -> Result<Self, ScanError> {
        let text = fs::read_to_string(path).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parses a scan table, discarding the first (header) line.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ScanError> {
        let mut values = Vec::new();
        let mut row_count = 0;

        for (index, line) in text.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let line_number = index + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != SCAN_COLUMNS {
                return Err(ScanError::ColumnCount {
                    path: path.to_path_buf(),
                    line: line_number,
                    expected: SCAN_COLUMNS,
                    found: tokens.len(),
                });
            }
            for token in tokens {
                let value = token.parse::<f64>().map_err(|_| ScanError::NotANumber {
                    path: path.to_path_buf(),
                    line: line_number,
                    token: token.to_string(),
                })?;
                values.push(value);
            }
            row_count += 1;
        }

        if row_count == 0 {
            return Err(ScanError::Empty(path.to_path_buf()));
        }

        let rows = Array2::from_shape_vec((row_count, SCAN_COLUMNS), values)
            .map_err(|_| ScanError::Empty(path.to_path_buf()))?;
        Ok(Self { rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.nrows()
    }

    pub fn frequency_axis(&self) -> Vec<f64> {
        self.column(0).to_vec()
    }

    pub fn channel(&self, polarization: Polarization) -> Vec<f64> {
        self.column(polarization.amplitude_column()).to_vec()
    }

    fn column(&self, index: usize) -> ArrayView1<'_, f64> {
        self.rows.column(index)
    }
}
