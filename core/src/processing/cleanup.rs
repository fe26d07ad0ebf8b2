use serde::{Deserialize, Serialize};

use crate::math::{replacement_values, FilterError, OutlierFilter, StatsHelper};
use crate::telemetry::log::LogManager;

/// Outlier cleanup settings shared by every channel of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub enabled: bool,
    pub threshold: f64,
    pub window: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 1.0,
            window: 5,
        }
    }
}

impl CleanupConfig {
    pub fn validate(&self) -> Result<(), FilterError> {
        OutlierFilter::new(self.threshold)?;
        if self.window == 0 {
            return Err(FilterError::ZeroWindow);
        }
        Ok(())
    }
}

/// Result of cleaning one amplitude channel.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedChannel {
    pub samples: Vec<f64>,
    /// Indices that were flagged and overwritten with the local mean.
    pub replaced: Vec<usize>,
    /// Number of zero samples overwritten with the channel mean.
    pub zero_filled: usize,
}

/// Two-pass outlier replacement: flagged samples take the centered rolling
/// mean, then any sample left at zero takes the raw channel mean.
pub struct CleanupStage {
    config: CleanupConfig,
    logger: LogManager,
}

impl CleanupStage {
    pub fn new(config: CleanupConfig) -> Result<Self, FilterError> {
        config.validate()?;
        Ok(Self {
            config,
            logger: LogManager::new(),
        })
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    pub fn clean(&self, channel: &[f64]) -> Result<CleanedChannel, FilterError> {
        if !self.config.enabled {
            return Ok(CleanedChannel {
                samples: channel.to_vec(),
                replaced: Vec::new(),
                zero_filled: 0,
            });
        }

        let filter = OutlierFilter::new(self.config.threshold)?;
        let replaced = filter.outlier_indices(channel);
        let local_means = replacement_values(channel, self.config.window)?;
        let channel_mean = StatsHelper::mean(channel);

        let mut samples = channel.to_vec();
        for &index in &replaced {
            samples[index] = local_means[index];
        }

        let mut zero_filled = 0;
        for sample in samples.iter_mut().filter(|s| **s == 0.0) {
            *sample = channel_mean;
            zero_filled += 1;
        }

        self.logger.detail(&format!(
            "cleanup replaced {} outliers, filled {} zeros",
            replaced.len(),
            zero_filled
        ));

        Ok(CleanedChannel {
            samples,
            replaced,
            zero_filled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(window: usize) -> CleanupStage {
        CleanupStage::new(CleanupConfig {
            enabled: true,
            threshold: 1.0,
            window,
        })
        .unwrap()
    }

    #[test]
    fn interior_spike_takes_local_mean() {
        let cleaned = stage(3).clean(&[10.0, 10.0, 100.0, 10.0, 10.0]).unwrap();
        assert_eq!(cleaned.replaced, vec![2]);
        assert_eq!(cleaned.samples, vec![10.0, 10.0, 40.0, 10.0, 10.0]);
        assert_eq!(cleaned.zero_filled, 0);
    }

    #[test]
    fn trailing_spike_is_replaced() {
        let cleaned = stage(3).clean(&[10.0, 10.0, 10.0, 10.0, 100.0]).unwrap();
        assert_eq!(cleaned.replaced, vec![4]);
        // no full window at the boundary, so the global mean steps in
        assert!((cleaned.samples[4] - 28.0).abs() < 1e-12);
        assert!(cleaned.samples[4] < 100.0);
        assert_eq!(cleaned.samples.len(), 5);
    }

    #[test]
    fn zero_samples_take_channel_mean() {
        let cleaned = stage(1).clean(&[2.0, 0.0, 2.0, 2.0, 4.0]).unwrap();
        assert_eq!(cleaned.zero_filled, 1);
        assert!((cleaned.samples[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn disabled_stage_passes_through() {
        let stage = CleanupStage::new(CleanupConfig {
            enabled: false,
            ..CleanupConfig::default()
        })
        .unwrap();
        let cleaned = stage.clean(&[0.0, 100.0]).unwrap();
        assert_eq!(cleaned.samples, vec![0.0, 100.0]);
        assert!(cleaned.replaced.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = CleanupConfig {
            threshold: 0.0,
            ..CleanupConfig::default()
        };
        assert!(CleanupStage::new(config).is_err());
    }
}
