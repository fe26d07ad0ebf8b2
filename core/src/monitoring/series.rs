use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use log::warn;

use crate::interface::record::ExperimentRecord;

const VELOCITY_TOLERANCE: f64 = 1e-6;

/// Amplitudes of one component at one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochAmplitude {
    pub observed_at: NaiveDateTime,
    pub flux_a: f64,
    pub flux_b: f64,
    pub flux_average: f64,
}

/// Time-ordered amplitudes of the component at `velocity` (km/s).
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSeries {
    pub velocity: f64,
    pub epochs: Vec<EpochAmplitude>,
}

impl ComponentSeries {
    pub fn flux_a(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.flux_a).collect()
    }

    pub fn flux_b(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.flux_b).collect()
    }

    pub fn flux_average(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.flux_average).collect()
    }
}

fn observed_at(record: &ExperimentRecord) -> Option<NaiveDateTime> {
    let stamp = format!("{} {}", record.date.trim(), record.start_time.trim());
    NaiveDateTime::parse_from_str(&stamp, "%d %b %Y %H:%M:%S").ok()
}

/// Regroups the per-epoch component amplitudes of a result store into one
/// series per velocity, ordered by observation time.
///
/// Records whose date or start time cannot be parsed are skipped.
pub fn component_series(records: &BTreeMap<String, ExperimentRecord>) -> Vec<ComponentSeries> {
    let mut series: Vec<ComponentSeries> = Vec::new();

    for (key, record) in records {
        let Some(observed_at) = observed_at(record) else {
            warn!(
                "skipping {key}: cannot read observation time from {:?} {:?}",
                record.date, record.start_time
            );
            continue;
        };
        for component in &record.components {
            let amplitude = EpochAmplitude {
                observed_at,
                flux_a: component.flux_a,
                flux_b: component.flux_b,
                flux_average: component.flux_average,
            };
            match series
                .iter_mut()
                .find(|s| (s.velocity - component.velocity).abs() < VELOCITY_TOLERANCE)
            {
                Some(existing) => existing.epochs.push(amplitude),
                None => series.push(ComponentSeries {
                    velocity: component.velocity,
                    epochs: vec![amplitude],
                }),
            }
        }
    }

    for component in &mut series {
        component.epochs.sort_by_key(|e| e.observed_at);
    }
    series.sort_by(|a, b| a.velocity.total_cmp(&b.velocity));
    series
}
