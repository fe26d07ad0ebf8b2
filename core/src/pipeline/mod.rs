pub mod accumulator;
pub mod controller;
pub mod state;

pub use accumulator::{Accumulator, PairSpectra};
pub use controller::{Collaborators, ControllerConfig, FinalReport, PipelineController};
pub use state::{ControllerState, ExcludedPair, PairOutcome, PairReport};
