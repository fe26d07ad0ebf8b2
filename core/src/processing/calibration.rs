//! Antenna-temperature calibration and frequency-switch recombination.
//!
//! A frequency-switched pair carries the line twice, once in each phase,
//! offset by the switching frequency. Both antenna-temperature spectra are
//! rotated by the offset expressed in channels, averaged, and scaled to flux
//! density. The wrapped channels at both ends are trimmed afterwards.

use std::ops::Range;

use log::debug;

use crate::prelude::Polarization;
use crate::processing::params::CalibrationParameters;

const HZ_PER_MHZ: f64 = 1.0e6;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("system temperature is zero")]
    ZeroSystemTemperature,
    #[error("system temperature of scan {scan} ({polarization}) is zero and no correction was supplied")]
    UncorrectedSystemTemperature { scan: u32, polarization: Polarization },
    #[error("scan {scan} logs no system temperature for {polarization}")]
    MissingSystemTemperature { scan: u32, polarization: Polarization },
    #[error("amplitude at channel {index} is zero")]
    ZeroAmplitude { index: usize },
    #[error("channel lengths differ: axis {axis}, signal {signal}, reference {reference}")]
    LengthMismatch {
        axis: usize,
        signal: usize,
        reference: usize,
    },
    #[error("need at least two channels, got {0}")]
    TooFewChannels(usize),
    #[error("frequency axis has zero channel spacing")]
    ZeroFrequencyStep,
    #[error("gain at elevation {elevation:.2} deg is zero")]
    ZeroGain { elevation: f64 },
    #[error("shift of {bins} channels leaves nothing of a {channels}-channel spectrum")]
    ShiftTooLarge { bins: i64, channels: usize },
    #[error("no calibration profile for location {0}")]
    UnknownLocation(String),
    #[error("invalid calibration parameters: {0}")]
    InvalidParameters(String),
}

/// One polarization of a raw pair, ready for calibration.
#[derive(Debug, Clone, Copy)]
pub struct ChannelInput<'a> {
    pub signal: &'a [f64],
    pub reference: &'a [f64],
    pub tsys_signal: f64,
    pub tsys_reference: f64,
}

/// Trimmed flux-density spectrum of one polarization.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedChannel {
    pub axis: Vec<f64>,
    pub flux: Vec<f64>,
    pub shift_bins: i64,
}

pub struct Calibrator {
    params: CalibrationParameters,
}

impl Calibrator {
    pub fn new(params: CalibrationParameters) -> Result<Self, CalibrationError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &CalibrationParameters {
        &self.params
    }

    /// Signal- and reference-phase antenna temperatures.
    ///
    /// Both phases share the `(reference - signal)` numerator; the signal
    /// phase divides by the signal amplitude and the reference phase by the
    /// reference amplitude.
    pub fn antenna_temperatures(
        input: &ChannelInput<'_>,
    ) -> Result<(Vec<f64>, Vec<f64>), CalibrationError> {
        if input.signal.len() != input.reference.len() {
            return Err(CalibrationError::LengthMismatch {
                axis: input.signal.len(),
                signal: input.signal.len(),
                reference: input.reference.len(),
            });
        }
        if input.tsys_signal == 0.0 || input.tsys_reference == 0.0 {
            return Err(CalibrationError::ZeroSystemTemperature);
        }

        let mut ta_sig = Vec::with_capacity(input.signal.len());
        let mut ta_ref = Vec::with_capacity(input.signal.len());
        for (index, (&sig, &reference)) in input.signal.iter().zip(input.reference).enumerate() {
            if sig == 0.0 || reference == 0.0 {
                return Err(CalibrationError::ZeroAmplitude { index });
            }
            let difference = reference - sig;
            ta_sig.push(input.tsys_signal * difference / sig);
            ta_ref.push(input.tsys_reference * difference / reference);
        }
        Ok((ta_sig, ta_ref))
    }

    /// Switching offset in channels: `floor(shift / step)` with the step
    /// taken from the first and last axis values (MHz).
    pub fn shift_bins(&self, axis_mhz: &[f64]) -> Result<i64, CalibrationError> {
        let n = axis_mhz.len();
        if n < 2 {
            return Err(CalibrationError::TooFewChannels(n));
        }
        let step_hz = (axis_mhz[n - 1] - axis_mhz[0]) / (n - 1) as f64 * HZ_PER_MHZ;
        if step_hz == 0.0 || !step_hz.is_finite() {
            return Err(CalibrationError::ZeroFrequencyStep);
        }
        Ok((self.params.shift_hz / step_hz).floor() as i64)
    }

    /// Untrimmed flux density of one polarization.
    pub fn flux_density(
        &self,
        axis_mhz: &[f64],
        input: &ChannelInput<'_>,
        elevation_deg: f64,
    ) -> Result<(Vec<f64>, i64), CalibrationError> {
        if axis_mhz.len() != input.signal.len() || axis_mhz.len() != input.reference.len() {
            return Err(CalibrationError::LengthMismatch {
                axis: axis_mhz.len(),
                signal: input.signal.len(),
                reference: input.reference.len(),
            });
        }

        let dpfu = self.params.dpfu(elevation_deg);
        if dpfu == 0.0 || !dpfu.is_finite() {
            return Err(CalibrationError::ZeroGain {
                elevation: elevation_deg,
            });
        }

        let bins = self.shift_bins(axis_mhz)?;
        let (mut ta_sig, mut ta_ref) = Self::antenna_temperatures(input)?;
        circular_shift(&mut ta_sig, bins);
        circular_shift(&mut ta_ref, bins);

        let scale = dpfu * self.params.flux_constant;
        let flux = ta_sig
            .iter()
            .zip(&ta_ref)
            .map(|(s, r)| (s + r) / 2.0 / scale)
            .collect();

        debug!(
            "calibrated {} channels: dpfu {:.5} at el {:.2}, shift {} bins",
            axis_mhz.len(),
            dpfu,
            elevation_deg,
            bins
        );
        Ok((flux, bins))
    }

    /// Flux density trimmed to the channels untouched by the wrap-around.
    pub fn calibrate(
        &self,
        axis_mhz: &[f64],
        input: &ChannelInput<'_>,
        elevation_deg: f64,
    ) -> Result<CalibratedChannel, CalibrationError> {
        let (flux, bins) = self.flux_density(axis_mhz, input, elevation_deg)?;
        let valid = valid_range(axis_mhz.len(), bins)?;
        Ok(CalibratedChannel {
            axis: axis_mhz[valid.clone()].to_vec(),
            flux: flux[valid].to_vec(),
            shift_bins: bins,
        })
    }
}

/// Rotates `series` so that `out[i] = in[(i + bins) mod len]`.
pub fn circular_shift(series: &mut [f64], bins: i64) {
    if series.is_empty() {
        return;
    }
    let len = series.len() as i64;
    series.rotate_left(bins.rem_euclid(len) as usize);
}

/// Channels `[|bins| + 1, len - |bins| - 1)` survive the de-switching.
pub fn valid_range(len: usize, bins: i64) -> Result<Range<usize>, CalibrationError> {
    let margin = bins.unsigned_abs() as usize + 1;
    match len.checked_sub(margin) {
        Some(end) if end > margin => Ok(margin..end),
        _ => Err(CalibrationError::ShiftTooLarge {
            bins,
            channels: len,
        }),
    }
}
