use crate::prelude::{PipelineError, PipelineResult};

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Rest frequency of the 6.7 GHz methanol maser line (Hz).
pub const DEFAULT_REST_FREQUENCY_HZ: f64 = 6_668_519_200.0;

const HZ_PER_MHZ: f64 = 1.0e6;
const M_PER_KM: f64 = 1000.0;

/// Maps observed frequencies onto source velocities for one rest frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DopplerConverter {
    rest_frequency_hz: f64,
}

impl Default for DopplerConverter {
    fn default() -> Self {
        Self {
            rest_frequency_hz: DEFAULT_REST_FREQUENCY_HZ,
        }
    }
}

impl DopplerConverter {
    pub fn new(rest_frequency_hz: f64) -> PipelineResult<Self> {
        if !rest_frequency_hz.is_finite() || rest_frequency_hz <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "rest frequency must be positive, got {rest_frequency_hz}"
            )));
        }
        Ok(Self { rest_frequency_hz })
    }

    pub fn rest_frequency_hz(&self) -> f64 {
        self.rest_frequency_hz
    }

    /// Source velocity (km/s) for an observed frequency (Hz) and the
    /// receiver's radial velocity (km/s).
    pub fn source_velocity(&self, observed_hz: f64, receiver_velocity_kms: f64) -> f64 {
        (-((observed_hz / self.rest_frequency_hz) - 1.0) * SPEED_OF_LIGHT
            + receiver_velocity_kms * M_PER_KM)
            / M_PER_KM
    }

    /// Inverse of [`DopplerConverter::source_velocity`].
    pub fn observed_frequency(&self, source_velocity_kms: f64, receiver_velocity_kms: f64) -> f64 {
        self.rest_frequency_hz
            * (1.0 - (source_velocity_kms - receiver_velocity_kms) * M_PER_KM / SPEED_OF_LIGHT)
    }

    pub fn to_velocity(&self, observed_hz: &[f64], receiver_velocity_kms: f64) -> Vec<f64> {
        observed_hz
            .iter()
            .map(|&f| self.source_velocity(f, receiver_velocity_kms))
            .collect()
    }

    pub fn to_frequency(&self, velocities_kms: &[f64], receiver_velocity_kms: f64) -> Vec<f64> {
        velocities_kms
            .iter()
            .map(|&v| self.observed_frequency(v, receiver_velocity_kms))
            .collect()
    }

    /// Sky frequencies (Hz) of a channel axis given as MHz offsets from
    /// `start_mhz`.
    pub fn observed_frequencies(axis_mhz: &[f64], start_mhz: f64) -> Vec<f64> {
        axis_mhz
            .iter()
            .map(|&offset| (offset + start_mhz) * HZ_PER_MHZ)
            .collect()
    }
}
