//! Calibration and aggregation core for frequency-switched maser spectra.
//!
//! The modules follow the reduction chain of a single observing epoch: raw
//! scans are paired, cleaned of outliers, calibrated into flux density,
//! de-switched, and finally averaged onto a velocity axis by the pipeline
//! controller.

pub mod interface;
pub mod math;
pub mod monitoring;
pub mod pipeline;
pub mod prelude;
pub mod processing;
pub mod scan;
pub mod storage;
pub mod telemetry;

pub use pipeline::{ControllerState, PipelineController};
pub use prelude::{PipelineError, PipelineResult, Polarization};
