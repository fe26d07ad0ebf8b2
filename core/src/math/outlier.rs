//! Robust outlier detection based on the modified z-score.

use ndarray::{ArrayView1, ArrayView2, Axis};

use crate::math::{FilterError, StatsHelper};

/// Scale factor turning a median absolute deviation into a z-score
/// comparable with a normal standard deviation.
pub const MODIFIED_Z_SCALE: f64 = 0.6745;

/// Flags points whose modified z-score is not below a threshold.
#[derive(Debug, Clone, Copy)]
pub struct OutlierFilter {
    threshold: f64,
}

impl OutlierFilter {
    pub fn new(threshold: f64) -> Result<Self, FilterError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(FilterError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Modified z-score of every row of `points`.
    ///
    /// Each row is one point; its distance is the Euclidean distance to the
    /// per-column median. When the median distance is zero the score is 0
    /// for points sitting on the median and infinite for everything else.
    pub fn scores(points: ArrayView2<f64>) -> Vec<f64> {
        let medians: Vec<f64> = points
            .axis_iter(Axis(1))
            .map(|column| StatsHelper::median(&column.to_vec()).unwrap_or(0.0))
            .collect();

        let distances: Vec<f64> = points
            .axis_iter(Axis(0))
            .map(|row| {
                row.iter()
                    .zip(&medians)
                    .map(|(&x, &m)| (x - m) * (x - m))
                    .sum::<f64>()
                    .sqrt()
            })
            .collect();

        let mad = StatsHelper::median(&distances).unwrap_or(0.0);
        distances
            .iter()
            .map(|&d| {
                if mad > 0.0 {
                    MODIFIED_Z_SCALE * d / mad
                } else if d == 0.0 {
                    0.0
                } else {
                    f64::INFINITY
                }
            })
            .collect()
    }

    /// `true` for good points, `false` for outliers.
    pub fn good_mask(&self, points: ArrayView2<f64>) -> Vec<bool> {
        Self::scores(points)
            .into_iter()
            .map(|score| score < self.threshold)
            .collect()
    }

    pub fn series_mask(&self, series: &[f64]) -> Vec<bool> {
        self.good_mask(ArrayView1::from(series).insert_axis(Axis(1)))
    }

    /// Indices of every flagged point, the last one included.
    pub fn outlier_indices(&self, series: &[f64]) -> Vec<usize> {
        self.series_mask(series)
            .iter()
            .enumerate()
            .filter_map(|(i, &good)| (!good).then_some(i))
            .collect()
    }
}
