use ndarray::Array1;

use crate::interface::record::AveragedSpectrum;
use crate::prelude::{PipelineError, PipelineResult};

/// Trimmed, calibrated spectra of one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairSpectra {
    pub index: usize,
    pub signal_number: u32,
    pub reference_number: u32,
    /// Trimmed frequency axis (MHz offsets).
    pub axis_mhz: Vec<f64>,
    /// Sky frequency of the axis origin (MHz).
    pub start_frequency_mhz: f64,
    pub flux_a: Vec<f64>,
    pub flux_b: Vec<f64>,
    pub snr_a: f64,
    pub snr_b: f64,
    pub snr_average: f64,
}

/// Per-pair results gathered over a run.
#[derive(Debug, Default)]
pub struct Accumulator {
    pairs: Vec<PairSpectra>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spectra: PairSpectra) {
        self.pairs.push(spectra);
    }

    pub fn pairs(&self) -> &[PairSpectra] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Trimmed axis shared by every pair so far.
    pub fn axis(&self) -> Option<&[f64]> {
        self.pairs.first().map(|pair| pair.axis_mhz.as_slice())
    }

    pub fn snr_a(&self) -> Vec<f64> {
        self.pairs.iter().map(|p| p.snr_a).collect()
    }

    pub fn snr_b(&self) -> Vec<f64> {
        self.pairs.iter().map(|p| p.snr_b).collect()
    }

    pub fn snr_average(&self) -> Vec<f64> {
        self.pairs.iter().map(|p| p.snr_average).collect()
    }
}

/// Running sums of velocity axes and both polarizations.
pub(crate) struct VelocitySum {
    velocity: Array1<f64>,
    flux_a: Array1<f64>,
    flux_b: Array1<f64>,
    count: usize,
}

impl VelocitySum {
    pub(crate) fn new(channels: usize) -> Self {
        Self {
            velocity: Array1::zeros(channels),
            flux_a: Array1::zeros(channels),
            flux_b: Array1::zeros(channels),
            count: 0,
        }
    }

    pub(crate) fn add(&mut self, pair: &PairSpectra, velocity: &[f64]) -> PipelineResult<()> {
        let expected = self.velocity.len();
        for actual in [velocity.len(), pair.flux_a.len(), pair.flux_b.len()] {
            if actual != expected {
                return Err(PipelineError::AxisMismatch {
                    index: pair.index,
                    expected,
                    actual,
                });
            }
        }
        self.velocity += &Array1::from(velocity.to_vec());
        self.flux_a += &Array1::from(pair.flux_a.clone());
        self.flux_b += &Array1::from(pair.flux_b.clone());
        self.count += 1;
        Ok(())
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn average(self) -> PipelineResult<AveragedSpectrum> {
        if self.count == 0 {
            return Err(PipelineError::NoPairsToAverage);
        }
        let n = self.count as f64;
        Ok(AveragedSpectrum {
            velocity: (self.velocity / n).to_vec(),
            flux_a: (self.flux_a / n).to_vec(),
            flux_b: (self.flux_b / n).to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(index: usize, flux: f64) -> PairSpectra {
        PairSpectra {
            index,
            signal_number: 1,
            reference_number: 2,
            axis_mhz: vec![0.0, 1.0],
            start_frequency_mhz: 6667.0,
            flux_a: vec![flux, flux],
            flux_b: vec![2.0 * flux, 2.0 * flux],
            snr_a: 5.0,
            snr_b: 6.0,
            snr_average: 7.0,
        }
    }

    #[test]
    fn sums_are_divided_by_included_pairs() {
        let mut sum = VelocitySum::new(2);
        sum.add(&pair(0, 1.0), &[-1.0, 1.0]).unwrap();
        sum.add(&pair(1, 3.0), &[-3.0, 3.0]).unwrap();
        assert_eq!(sum.count(), 2);

        let averaged = sum.average().unwrap();
        assert_eq!(averaged.velocity, vec![-2.0, 2.0]);
        assert_eq!(averaged.flux_a, vec![2.0, 2.0]);
        assert_eq!(averaged.flux_b, vec![4.0, 4.0]);
    }

    #[test]
    fn empty_sum_cannot_be_averaged() {
        assert!(matches!(
            VelocitySum::new(3).average(),
            Err(PipelineError::NoPairsToAverage)
        ));
    }

    #[test]
    fn mismatched_axis_is_rejected() {
        let mut sum = VelocitySum::new(3);
        assert!(matches!(
            sum.add(&pair(4, 1.0), &[0.0, 1.0]),
            Err(PipelineError::AxisMismatch { index: 4, .. })
        ));
    }

    #[test]
    fn accumulator_exposes_snr_lists() {
        let mut acc = Accumulator::new();
        acc.push(pair(0, 1.0));
        acc.push(pair(1, 2.0));
        assert_eq!(acc.snr_b(), vec![6.0, 6.0]);
        assert_eq!(acc.axis(), Some(&[0.0, 1.0][..]));
    }
}
