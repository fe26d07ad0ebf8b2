pub mod error;
pub mod outlier;
pub mod smoothing;
pub mod stats;

pub use error::FilterError;
pub use outlier::OutlierFilter;
pub use smoothing::{centered_rolling_mean, replacement_values};
pub use stats::StatsHelper;
