//! Long-term behaviour of maser components across recorded epochs.

pub mod indices;
pub mod series;

pub use indices::{fluctuation_index, measurement_error, variability_index, ComponentIndices};
pub use series::{component_series, ComponentSeries, EpochAmplitude};
