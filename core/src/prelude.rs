use std::fmt;

use serde::{Deserialize, Serialize};

pub use crate::interface::doppler::DopplerError;
pub use crate::interface::store::StoreError;
pub use crate::math::FilterError;
pub use crate::pipeline::ControllerState;
pub use crate::processing::calibration::CalibrationError;
pub use crate::scan::ScanError;

/// One of the two polarization channels carried by every raw scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    A,
    B,
}

impl Polarization {
    pub const ALL: [Polarization; 2] = [Polarization::A, Polarization::B];

    /// Column of the raw scan table holding this channel's amplitudes.
    pub fn amplitude_column(self) -> usize {
        match self {
            Polarization::A => 1,
            Polarization::B => 2,
        }
    }

    /// Position of this channel in a scan's system-temperature list.
    pub fn tsys_index(self) -> usize {
        match self {
            Polarization::A => 0,
            Polarization::B => 1,
        }
    }
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarization::A => write!(f, "polarization A"),
            Polarization::B => write!(f, "polarization B"),
        }
    }
}

/// Common error type for a pipeline run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Doppler(#[from] DopplerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cannot {action} while the controller is {state}")]
    InvalidTransition {
        action: &'static str,
        state: ControllerState,
    },
    #[error("no metadata logged for scan {0}")]
    MissingMetadata(u32),
    #[error("pair {index} has {actual} trimmed channels, expected {expected}")]
    AxisMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("no calibrated pairs left to average")]
    NoPairsToAverage,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
