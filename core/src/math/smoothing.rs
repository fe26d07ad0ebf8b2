//! Centered moving average used to estimate replacement values for
//! flagged samples.

use crate::math::FilterError;

/// Centered rolling mean over `window` samples.
///
/// The window for index `i` spans `[i - window / 2, i - window / 2 + window)`.
/// Positions where that span leaves the series are NaN, as is any window
/// containing a NaN.
pub fn centered_rolling_mean(data: &[f64], window: usize) -> Result<Vec<f64>, FilterError> {
    if window == 0 {
        return Err(FilterError::ZeroWindow);
    }

    let n = data.len();
    let half = window / 2;
    let mut result = vec![f64::NAN; n];

    for (i, value) in result.iter_mut().enumerate() {
        let Some(start) = i.checked_sub(half) else {
            continue;
        };
        let end = start + window;
        if end > n {
            continue;
        }
        *value = data[start..end].iter().sum::<f64>() / window as f64;
    }

    Ok(result)
}

/// Rolling mean with every NaN normalized to zero, ready to be written over
/// flagged samples.
pub fn replacement_values(data: &[f64], window: usize) -> Result<Vec<f64>, FilterError> {
    let mut means = centered_rolling_mean(data, window)?;
    for value in means.iter_mut().filter(|v| v.is_nan()) {
        *value = 0.0;
    }
    Ok(means)
}
