use std::fmt;

use crate::pipeline::accumulator::PairSpectra;

/// Lifecycle of a [`PipelineController`](crate::pipeline::PipelineController).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    /// Pair `i` has been processed and is available for review.
    ProcessingPair(usize),
    Finalizing,
    Done,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::Idle => write!(f, "idle"),
            ControllerState::ProcessingPair(index) => write!(f, "processing pair {index}"),
            ControllerState::Finalizing => write!(f, "finalizing"),
            ControllerState::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Calibrated(PairSpectra),
    Rejected { reason: String },
}

/// What one `advance()` produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    pub index: usize,
    pub signal_file: String,
    pub reference_file: String,
    pub signal_number: u32,
    pub reference_number: u32,
    pub state: ControllerState,
    pub outcome: PairOutcome,
}

impl PairReport {
    pub fn spectra(&self) -> Option<&PairSpectra> {
        match &self.outcome {
            PairOutcome::Calibrated(spectra) => Some(spectra),
            PairOutcome::Rejected { .. } => None,
        }
    }
}

/// A calibrated pair dropped during finalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedPair {
    pub index: usize,
    pub reason: String,
}
