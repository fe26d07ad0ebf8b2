/// Parameter errors raised by the outlier filter and smoothing estimator.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("outlier threshold must be a positive number, got {0}")]
    InvalidThreshold(f64),
    #[error("smoothing window must be at least 1")]
    ZeroWindow,
}
