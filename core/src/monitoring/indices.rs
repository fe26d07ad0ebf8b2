use serde::Serialize;

use crate::math::StatsHelper;
use crate::monitoring::series::ComponentSeries;

/// Uncertainty of one flux-density measurement (Jy): a 1.5 Jy floor plus
/// 5 % of the value.
pub fn measurement_error(flux: f64) -> f64 {
    1.5 + 0.05 * flux
}

fn clipped(series: &[f64]) -> Vec<f64> {
    series.iter().map(|&y| y.max(0.0)).collect()
}

/// `((max - s) - (min + s)) / ((max - s) + (min + s))` over the series
/// clipped at zero, with `s` its population standard deviation.
pub fn variability_index(series: &[f64]) -> Option<f64> {
    let y = clipped(series);
    let max = StatsHelper::max(&y)?;
    let min = StatsHelper::min(&y)?;
    let sigma = StatsHelper::std_dev(&y);
    let high = max - sigma;
    let low = min + sigma;
    let denominator = high + low;
    if denominator == 0.0 {
        return None;
    }
    Some((high - low) / denominator)
}

/// Error-weighted scatter of the series relative to its mean.
///
/// `None` for fewer than two points, a zero mean, or a negative radicand
/// (scatter below the measurement errors).
pub fn fluctuation_index(series: &[f64]) -> Option<f64> {
    let y = clipped(series);
    let n = y.len();
    if n < 2 {
        return None;
    }
    let mean = StatsHelper::mean(&y);
    if mean == 0.0 {
        return None;
    }

    let mut sum_e2 = 0.0;
    let mut sum_y2e2 = 0.0;
    let mut sum_ye2 = 0.0;
    for &value in &y {
        let e2 = measurement_error(value).powi(2);
        sum_e2 += e2;
        sum_y2e2 += value * value * e2;
        sum_ye2 += value * e2;
    }

    let n = n as f64;
    let radicand = (n / sum_e2) * ((sum_y2e2 - mean * sum_ye2) / (n - 1.0)) - 1.0;
    if radicand < 0.0 {
        return None;
    }
    Some(radicand.sqrt() / mean)
}

/// Indices of one component for both polarizations and their average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentIndices {
    pub velocity: f64,
    pub epochs: usize,
    pub variability_a: Option<f64>,
    pub variability_b: Option<f64>,
    pub variability_average: Option<f64>,
    pub fluctuation_a: Option<f64>,
    pub fluctuation_b: Option<f64>,
    pub fluctuation_average: Option<f64>,
}

impl ComponentIndices {
    pub fn from_series(series: &ComponentSeries) -> Self {
        let a = series.flux_a();
        let b = series.flux_b();
        let average = series.flux_average();
        Self {
            velocity: series.velocity,
            epochs: series.epochs.len(),
            variability_a: variability_index(&a),
            variability_b: variability_index(&b),
            variability_average: variability_index(&average),
            fluctuation_a: fluctuation_index(&a),
            fluctuation_b: fluctuation_index(&b),
            fluctuation_average: fluctuation_index(&average),
        }
    }
}
