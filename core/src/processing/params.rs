use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::StatsHelper;
use crate::processing::calibration::CalibrationError;

/// Per-observatory calibration constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParameters {
    /// Gain-curve polynomial in elevation (degrees), highest power first.
    pub gain_curve: Vec<f64>,
    /// Maximum point-source sensitivities (K/Jy); their mean scales the gain curve.
    pub dpfu_max: Vec<f64>,
    /// Noise-diode calibration temperature (K).
    pub tcal: f64,
    pub flux_constant: f64,
    /// Frequency-switching offset in Hz.
    pub shift_hz: f64,
}

impl CalibrationParameters {
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.gain_curve.is_empty() {
            return Err(CalibrationError::InvalidParameters(
                "gain curve has no coefficients".into(),
            ));
        }
        if self.dpfu_max.is_empty() {
            return Err(CalibrationError::InvalidParameters(
                "no DPFU maximum configured".into(),
            ));
        }
        if self.flux_constant == 0.0 || !self.flux_constant.is_finite() {
            return Err(CalibrationError::InvalidParameters(format!(
                "flux constant must be finite and non-zero, got {}",
                self.flux_constant
            )));
        }
        if self.shift_hz < 0.0 || !self.shift_hz.is_finite() {
            return Err(CalibrationError::InvalidParameters(format!(
                "frequency shift must be finite and non-negative, got {}",
                self.shift_hz
            )));
        }
        Ok(())
    }

    /// Degrees-per-flux-unit at the given elevation.
    pub fn dpfu(&self, elevation_deg: f64) -> f64 {
        StatsHelper::mean(&self.dpfu_max) * StatsHelper::polyval(&self.gain_curve, elevation_deg)
    }
}

/// Calibration profiles keyed by the location tag found in observation logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationProfiles(BTreeMap<String, CalibrationParameters>);

impl LocationProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, params: CalibrationParameters) {
        self.0.insert(location.into(), params);
    }

    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Picks and validates the profile for `location`.
    pub fn select(&self, location: &str) -> Result<CalibrationParameters, CalibrationError> {
        let params = self
            .0
            .get(location)
            .ok_or_else(|| CalibrationError::UnknownLocation(location.to_string()))?;
        params.validate()?;
        Ok(params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params() -> CalibrationParameters {
        CalibrationParameters {
            gain_curve: vec![0.0, 1.0],
            dpfu_max: vec![0.1, 0.3],
            tcal: 12.0,
            flux_constant: 1.0,
            shift_hz: 0.0,
        }
    }

    #[test]
    fn dpfu_scales_gain_curve_by_mean_sensitivity() {
        let params = CalibrationParameters {
            gain_curve: vec![0.01, 0.5],
            ..sample_params()
        };
        // mean(0.1, 0.3) * (0.01 * 50 + 0.5)
        assert!((params.dpfu(50.0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn profiles_are_selected_by_location() {
        let mut profiles = LocationProfiles::new();
        profiles.insert("IRBENE", sample_params());
        profiles.insert(
            "IRBENE16",
            CalibrationParameters {
                tcal: 3.5,
                ..sample_params()
            },
        );

        assert_eq!(profiles.select("IRBENE16").unwrap().tcal, 3.5);
        assert!(matches!(
            profiles.select("EFFELSBERG"),
            Err(CalibrationError::UnknownLocation(_))
        ));
    }

    #[test]
    fn invalid_profile_is_rejected_on_selection() {
        let mut profiles = LocationProfiles::new();
        profiles.insert(
            "IRBENE",
            CalibrationParameters {
                flux_constant: 0.0,
                ..sample_params()
            },
        );
        assert!(matches!(
            profiles.select("IRBENE"),
            Err(CalibrationError::InvalidParameters(_))
        ));
    }
}
