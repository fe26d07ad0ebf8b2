use anyhow::{ensure, Context};
use masercore::interface::{JsonObservationLog, LogHeader, ScanMetadata};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::template::{bandpass, gaussian_line};

/// Configuration for generating a synthetic frequency-switched epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub pairs: usize,
    pub channels: usize,
    pub bandwidth_mhz: f64,
    /// Switching offset between the signal and reference phases.
    pub shift_hz: f64,
    pub line_channel: usize,
    pub line_width: f64,
    pub line_peak: f64,
    pub bandpass_level: f64,
    pub noise: f64,
    pub tsys: [f64; 2],
    pub seed: u64,
    pub date: String,
    pub start_time: String,
    pub location: String,
    pub sky_frequency_mhz: f64,
    pub bbc_offset_mhz: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            pairs: 4,
            channels: 512,
            bandwidth_mhz: 16.0,
            shift_hz: 1_562_500.0,
            line_channel: 300,
            line_width: 3.0,
            line_peak: 8.0,
            bandpass_level: 100.0,
            noise: 0.05,
            tsys: [38.0, 41.0],
            seed: 0,
            date: "27 Jan 2018".into(),
            start_time: "10:15:00".into(),
            location: "IRBENE".into(),
            sky_frequency_mhz: 6660.0,
            bbc_offset_mhz: 1.0,
        }
    }
}

impl GeneratorConfig {
    fn step_mhz(&self) -> f64 {
        self.bandwidth_mhz / self.channels as f64
    }

    fn shift_bins(&self) -> usize {
        (self.shift_hz / (self.step_mhz() * 1.0e6)).floor() as usize
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.pairs > 0, "generator needs at least one pair");
        ensure!(self.channels >= 4, "generator needs at least four channels");
        ensure!(
            self.bandwidth_mhz > 0.0,
            "bandwidth must be positive, got {}",
            self.bandwidth_mhz
        );
        ensure!(
            self.noise >= 0.0 && self.noise < self.bandpass_level,
            "noise {} must stay below the bandpass level {}",
            self.noise,
            self.bandpass_level
        );
        Ok(())
    }
}

/// Files written for one synthetic epoch.
#[derive(Debug, Clone)]
pub struct SyntheticEpoch {
    pub scan_dir: PathBuf,
    pub log_path: PathBuf,
    pub scan_files: Vec<PathBuf>,
}

/// Amplitudes of one phase: the bandpass with the line on top, plus noise.
fn phase_amplitudes(config: &GeneratorConfig, line_channel: usize, rng: &mut StdRng) -> Vec<f64> {
    let shape = bandpass(config.channels, config.bandpass_level);
    let line = gaussian_line(
        config.channels,
        line_channel as f64,
        config.line_width,
        config.line_peak,
    );
    shape
        .iter()
        .zip(&line)
        .map(|(b, l)| {
            let jitter = if config.noise > 0.0 {
                rng.gen_range(-config.noise..config.noise)
            } else {
                0.0
            };
            b + l + jitter
        })
        .collect()
}

fn render_scan(config: &GeneratorConfig, amplitudes: [&[f64]; 2]) -> String {
    let step = config.step_mhz();
    let mut text = String::from("# channel amplitudes, polarizations A and B\n");
    for i in 0..config.channels {
        let _ = writeln!(
            text,
            "{:.6} {:.6} {:.6} 0 0 0 0 0 0",
            i as f64 * step,
            amplitudes[0][i],
            amplitudes[1][i]
        );
    }
    text
}

fn scan_metadata(config: &GeneratorConfig, elevation: f64) -> ScanMetadata {
    ScanMetadata {
        system_temperatures: config.tsys.to_vec(),
        elevation,
        start_time: config.start_time.clone(),
        date: config.date.clone(),
        right_ascension: vec!["22".into(), "56".into(), "17.90".into()],
        declination: vec!["62".into(), "01".into(), "49.7".into()],
        frequency_mhz: config.sky_frequency_mhz,
    }
}

/// Writes `2 * pairs` scan files named `<source>_no<NNNN>.dat` into
/// `scan_dir` and the matching observation log to `log_path`.
///
/// The reference phase carries the line `shift_hz` higher in channel index,
/// as a frequency-switched receiver would record it.
pub fn write_synthetic_epoch(
    config: &GeneratorConfig,
    source: &str,
    scan_dir: &Path,
    log_path: &Path,
) -> anyhow::Result<SyntheticEpoch> {
    config.validate()?;
    fs::create_dir_all(scan_dir)
        .with_context(|| format!("creating scan directory {}", scan_dir.display()))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let reference_channel = (config.line_channel + config.shift_bins()) % config.channels;
    let mut scans = BTreeMap::new();
    let mut scan_files = Vec::with_capacity(2 * config.pairs);

    for number in 1..=(2 * config.pairs as u32) {
        let line_channel = if number % 2 == 1 {
            config.line_channel
        } else {
            reference_channel
        };
        let a = phase_amplitudes(config, line_channel, &mut rng);
        let b = phase_amplitudes(config, line_channel, &mut rng);

        let path = scan_dir.join(format!("{source}_no{number:04}.dat"));
        fs::write(&path, render_scan(config, [&a, &b]))
            .with_context(|| format!("writing synthetic scan {}", path.display()))?;
        scan_files.push(path);

        let elevation = 35.0 + rng.gen_range(0.0..10.0);
        scans.insert(number, scan_metadata(config, elevation));
    }

    let log = JsonObservationLog {
        header: LogHeader {
            dates: config.date.clone(),
            location: config.location.clone(),
            bbc_offset_mhz: config.bbc_offset_mhz,
        },
        scans,
    };
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&log).context("serialising synthetic log")?;
    fs::write(log_path, json)
        .with_context(|| format!("writing synthetic log {}", log_path.display()))?;

    Ok(SyntheticEpoch {
        scan_dir: scan_dir.to_path_buf(),
        log_path: log_path.to_path_buf(),
        scan_files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use masercore::scan::{load_pairs, RawScan};
    use masercore::Polarization;
    use tempfile::tempdir;

    #[test]
    fn generator_writes_loadable_pairs_and_log() {
        let dir = tempdir().unwrap();
        let config = GeneratorConfig {
            pairs: 3,
            channels: 64,
            ..Default::default()
        };
        let epoch = write_synthetic_epoch(
            &config,
            "cepa",
            &dir.path().join("cepa/1"),
            &dir.path().join("logs/cepa.json"),
        )
        .unwrap();
        assert_eq!(epoch.scan_files.len(), 6);

        let pairs = load_pairs(&epoch.scan_dir).unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[2].signal_number, 5);
        assert_eq!(pairs[2].reference_number, 6);
        assert_eq!(pairs[0].signal.row_count(), 64);

        let log = JsonObservationLog::load(&epoch.log_path).unwrap();
        assert_eq!(log.scans.len(), 6);
        assert_eq!(log.header.location, "IRBENE");
    }

    #[test]
    fn line_moves_between_phases() {
        let dir = tempdir().unwrap();
        let config = GeneratorConfig {
            pairs: 1,
            channels: 128,
            bandwidth_mhz: 16.0,
            line_channel: 40,
            noise: 0.0,
            ..Default::default()
        };
        // 125 kHz channels, 1.5625 MHz switch => 12 bins
        assert_eq!(config.shift_bins(), 12);
        let epoch = write_synthetic_epoch(
            &config,
            "w3oh",
            &dir.path().join("scans"),
            &dir.path().join("log.json"),
        )
        .unwrap();

        let peak = |path: &Path| {
            let scan = RawScan::load(path).unwrap();
            let channel = scan.channel(Polarization::A);
            let max = channel.iter().cloned().fold(f64::MIN, f64::max);
            channel.iter().position(|&v| v == max).unwrap()
        };
        assert_eq!(peak(&epoch.scan_files[0]), 40);
        assert_eq!(peak(&epoch.scan_files[1]), 52);
    }

    #[test]
    fn same_seed_reproduces_scans() {
        let dir = tempdir().unwrap();
        let config = GeneratorConfig {
            pairs: 1,
            channels: 32,
            seed: 17,
            ..Default::default()
        };
        let write = |name: &str| {
            let scans = dir.path().join(name);
            let log = dir.path().join(format!("{name}.json"));
            write_synthetic_epoch(&config, "s", &scans, &log).unwrap()
        };
        let first = write("a");
        let second = write("b");
        assert_eq!(
            fs::read_to_string(&first.scan_files[0]).unwrap(),
            fs::read_to_string(&second.scan_files[0]).unwrap()
        );
    }
}
