use crate::math::StatsHelper;

/// Peak-to-noise ratio `max / (3 * sigma)` of a finished spectrum.
///
/// Returns `None` for an empty series and `f64::INFINITY` when the series
/// has no spread at all.
pub fn signal_to_noise(series: &[f64]) -> Option<f64> {
    let peak = StatsHelper::max(series)?;
    let sigma = StatsHelper::std_dev(series);
    if sigma == 0.0 {
        return Some(f64::INFINITY);
    }
    Some(peak / (3.0 * sigma))
}

/// Channel-wise mean of the two polarizations.
pub fn average_polarizations(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| (x + y) / 2.0).collect()
}
