use serde::{Deserialize, Serialize};

/// Source, observing date and observatory of one reduction run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpochKey {
    pub source: String,
    pub date: String,
    pub location: String,
}

impl EpochKey {
    pub fn new(
        source: impl Into<String>,
        date: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            date: date.into(),
            location: location.into(),
        }
    }

    /// Key of the run inside the per-source result store, e.g.
    /// `cepa27_Jan_2018_IRBENE`.
    pub fn experiment_key(&self) -> String {
        format!(
            "{}{}_{}",
            self.source,
            self.date.trim().replace(' ', "_"),
            self.location
        )
    }

    /// Name of the averaged-spectrum table for this epoch.
    pub fn table_file_name(&self) -> String {
        format!("{}.dat", self.experiment_key())
    }
}

/// Final product of a run: averaged velocity axis and both polarizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragedSpectrum {
    pub velocity: Vec<f64>,
    pub flux_a: Vec<f64>,
    pub flux_b: Vec<f64>,
}

impl AveragedSpectrum {
    pub fn len(&self) -> usize {
        self.velocity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.velocity.is_empty()
    }

    /// Flux densities at the channel closest to each requested velocity.
    pub fn component_amplitudes(&self, velocities: &[f64]) -> Vec<ComponentAmplitude> {
        velocities
            .iter()
            .filter_map(|&target| {
                let (index, _) = self
                    .velocity
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))?;
                let flux_a = self.flux_a[index];
                let flux_b = self.flux_b[index];
                Some(ComponentAmplitude {
                    velocity: target,
                    flux_a,
                    flux_b,
                    flux_average: (flux_a + flux_b) / 2.0,
                })
            })
            .collect()
    }
}

/// Flux density of one maser component in the averaged spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentAmplitude {
    pub velocity: f64,
    pub flux_a: f64,
    pub flux_b: f64,
    pub flux_average: f64,
}

/// Entry appended to the per-source result store after each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub date: String,
    pub start_time: String,
    pub location: String,
    pub pair_count: usize,
    pub averaged_pairs: usize,
    /// Per-pair signal-to-noise; `None` where the ratio was not finite.
    pub snr_a: Vec<Option<f64>>,
    pub snr_b: Vec<Option<f64>>,
    pub snr_average: Vec<Option<f64>>,
    #[serde(default)]
    pub components: Vec<ComponentAmplitude>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_key_joins_source_date_location() {
        let key = EpochKey::new("cepa", "27 Jan 2018", "IRBENE16");
        assert_eq!(key.experiment_key(), "cepa27_Jan_2018_IRBENE16");
        assert_eq!(key.table_file_name(), "cepa27_Jan_2018_IRBENE16.dat");
    }

    #[test]
    fn components_pick_nearest_channel() {
        let spectrum = AveragedSpectrum {
            velocity: vec![-3.0, -2.0, -1.0, 0.0],
            flux_a: vec![1.0, 5.0, 2.0, 0.5],
            flux_b: vec![1.0, 7.0, 4.0, 0.5],
        };
        let components = spectrum.component_amplitudes(&[-1.9, -0.8]);
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].flux_average, 6.0);
        assert_eq!(components[1].flux_a, 2.0);

        let empty = AveragedSpectrum {
            velocity: vec![],
            flux_a: vec![],
            flux_b: vec![],
        };
        assert!(empty.component_amplitudes(&[1.0]).is_empty());
    }
}
