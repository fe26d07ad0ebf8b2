//! Pair-by-pair reduction of one observing epoch.
//!
//! The controller is driven from outside: each `advance()` processes exactly
//! one scan pair so that a reviewer can inspect it, and `finalize()` turns
//! the accumulated pairs into the averaged velocity spectrum once the last
//! pair has been seen.

use std::path::Path;

use crate::interface::doppler::{DopplerCorrector, DopplerQuery};
use crate::interface::observation::{ObservationLog, ScanMetadata};
use crate::interface::record::{AveragedSpectrum, EpochKey, ExperimentRecord};
use crate::interface::store::ResultStore;
use crate::interface::tsys::TsysSource;
use crate::pipeline::accumulator::{Accumulator, PairSpectra, VelocitySum};
use crate::pipeline::state::{ControllerState, ExcludedPair, PairOutcome, PairReport};
use crate::prelude::{CalibrationError, PipelineError, PipelineResult, Polarization};
use crate::processing::calibration::{CalibratedChannel, Calibrator, ChannelInput};
use crate::processing::cleanup::{CleanupConfig, CleanupStage};
use crate::processing::doppler::{DopplerConverter, DEFAULT_REST_FREQUENCY_HZ};
use crate::processing::params::LocationProfiles;
use crate::processing::quality::{average_polarizations, signal_to_noise};
use crate::scan::{load_pairs, ScanPair};
use crate::telemetry::{LogManager, Metrics, MetricsRecorder};

/// Run-level settings of a controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub source: String,
    pub rest_frequency_hz: f64,
    pub cleanup: CleanupConfig,
    /// Velocities (km/s) whose amplitudes are recorded for monitoring.
    pub monitoring_velocities: Vec<f64>,
}

impl ControllerConfig {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            rest_frequency_hz: DEFAULT_REST_FREQUENCY_HZ,
            cleanup: CleanupConfig::default(),
            monitoring_velocities: Vec::new(),
        }
    }
}

/// External services a run depends on.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub log: &'a dyn ObservationLog,
    pub doppler: &'a dyn DopplerCorrector,
    pub store: &'a dyn ResultStore,
    pub tsys: &'a dyn TsysSource,
}

/// Outcome of a successful `finalize()`.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalReport {
    pub epoch: EpochKey,
    pub spectrum: AveragedSpectrum,
    pub record: ExperimentRecord,
    pub excluded: Vec<ExcludedPair>,
}

pub struct PipelineController<'a> {
    config: ControllerConfig,
    epoch: EpochKey,
    pairs: Vec<ScanPair>,
    state: ControllerState,
    calibrator: Calibrator,
    cleanup: CleanupStage,
    converter: DopplerConverter,
    accumulator: Accumulator,
    collaborators: Collaborators<'a>,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl<'a> PipelineController<'a> {
    pub fn new(
        config: ControllerConfig,
        profiles: &LocationProfiles,
        pairs: Vec<ScanPair>,
        collaborators: Collaborators<'a>,
    ) -> PipelineResult<Self> {
        let header = collaborators.log.header();
        let params = profiles.select(&header.location)?;
        let calibrator = Calibrator::new(params)?;
        let cleanup = CleanupStage::new(config.cleanup.clone())?;
        let converter = DopplerConverter::new(config.rest_frequency_hz)?;

        if pairs.is_empty() {
            return Err(PipelineError::InvalidConfig(format!(
                "no scan pairs to process for {}",
                config.source
            )));
        }

        let epoch = EpochKey::new(
            config.source.clone(),
            header.dates.clone(),
            header.location.clone(),
        );
        let logger = LogManager::with_context(format!("{}/{}", epoch.source, epoch.date));
        logger.record(&format!(
            "{} pairs queued, calibration profile {}",
            pairs.len(),
            epoch.location
        ));

        Ok(Self {
            config,
            epoch,
            pairs,
            state: ControllerState::Idle,
            calibrator,
            cleanup,
            converter,
            accumulator: Accumulator::new(),
            collaborators,
            logger,
            metrics: MetricsRecorder::new(),
        })
    }

    /// Loads every pair from `dir` before building the controller, so input
    /// faults surface before any calibration happens.
    pub fn from_directory(
        config: ControllerConfig,
        profiles: &LocationProfiles,
        dir: &Path,
        collaborators: Collaborators<'a>,
    ) -> PipelineResult<Self> {
        let pairs = load_pairs(dir)?;
        Self::new(config, profiles, pairs, collaborators)
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn epoch(&self) -> &EpochKey {
        &self.epoch
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    /// Whether another `advance()` is possible.
    pub fn has_next_pair(&self) -> bool {
        match self.state {
            ControllerState::Idle => true,
            ControllerState::ProcessingPair(index) => index + 1 < self.pairs.len(),
            _ => false,
        }
    }

    /// Whether `finalize()` is accepted in the current state.
    pub fn can_finalize(&self) -> bool {
        match self.state {
            ControllerState::ProcessingPair(index) => index + 1 == self.pairs.len(),
            ControllerState::Finalizing => true,
            _ => false,
        }
    }

    /// Processes the next pair.
    ///
    /// A pair that cannot be calibrated is reported as rejected and the run
    /// moves on; only invalid transitions are errors.
    pub fn advance(&mut self) -> PipelineResult<PairReport> {
        if !self.has_next_pair() {
            return Err(PipelineError::InvalidTransition {
                action: "advance",
                state: self.state,
            });
        }
        let index = match self.state {
            ControllerState::ProcessingPair(index) => index + 1,
            _ => 0,
        };
        self.state = ControllerState::ProcessingPair(index);

        let outcome = match self.process_pair(index) {
            Ok(spectra) => {
                self.metrics.record_processed();
                self.logger.record(&format!(
                    "pair {index}: snr A {:.2}, B {:.2}, avg {:.2}",
                    spectra.snr_a, spectra.snr_b, spectra.snr_average
                ));
                self.accumulator.push(spectra.clone());
                PairOutcome::Calibrated(spectra)
            }
            Err(err) => {
                let reason = err.to_string();
                self.logger.warn(&format!("pair {index} rejected: {reason}"));
                self.metrics
                    .record_rejected(format!("pair {index} rejected: {reason}"));
                PairOutcome::Rejected { reason }
            }
        };

        let pair = &self.pairs[index];
        Ok(PairReport {
            index,
            signal_file: pair.signal_file.clone(),
            reference_file: pair.reference_file.clone(),
            signal_number: pair.signal_number,
            reference_number: pair.reference_number,
            state: self.state,
            outcome,
        })
    }

    fn process_pair(&self, index: usize) -> PipelineResult<PairSpectra> {
        let pair = &self.pairs[index];
        let signal_meta = self.metadata(pair.signal_number)?;
        let reference_meta = self.metadata(pair.reference_number)?;
        let elevation = (signal_meta.elevation + reference_meta.elevation) / 2.0;
        let axis = pair.signal.frequency_axis();

        let calibrate = |polarization| {
            self.calibrate_channel(
                pair,
                signal_meta,
                reference_meta,
                polarization,
                &axis,
                elevation,
            )
        };
        let channel_a = calibrate(Polarization::A)?;
        let channel_b = calibrate(Polarization::B)?;
        let averaged = average_polarizations(&channel_a.flux, &channel_b.flux);
        let header = self.collaborators.log.header();

        Ok(PairSpectra {
            index,
            signal_number: pair.signal_number,
            reference_number: pair.reference_number,
            start_frequency_mhz: (signal_meta.frequency_mhz + reference_meta.frequency_mhz)
                / 2.0
                + header.bbc_offset_mhz,
            snr_a: signal_to_noise(&channel_a.flux).unwrap_or(f64::NAN),
            snr_b: signal_to_noise(&channel_b.flux).unwrap_or(f64::NAN),
            snr_average: signal_to_noise(&averaged).unwrap_or(f64::NAN),
            axis_mhz: channel_a.axis,
            flux_a: channel_a.flux,
            flux_b: channel_b.flux,
        })
    }

    fn calibrate_channel(
        &self,
        pair: &ScanPair,
        signal_meta: &ScanMetadata,
        reference_meta: &ScanMetadata,
        polarization: Polarization,
        axis: &[f64],
        elevation: f64,
    ) -> PipelineResult<CalibratedChannel> {
        let signal = self.cleanup.clean(&pair.signal.channel(polarization))?;
        let reference = self.cleanup.clean(&pair.reference.channel(polarization))?;
        let input = ChannelInput {
            signal: &signal.samples,
            reference: &reference.samples,
            tsys_signal: self.resolve_tsys(pair.signal_number, signal_meta, polarization)?,
            tsys_reference: self.resolve_tsys(pair.reference_number, reference_meta, polarization)?,
        };
        Ok(self.calibrator.calibrate(axis, &input, elevation)?)
    }

    fn metadata(&self, scan_number: u32) -> PipelineResult<&'a ScanMetadata> {
        self.collaborators
            .log
            .scan(scan_number)
            .ok_or(PipelineError::MissingMetadata(scan_number))
    }

    /// Logged Tsys, or an operator-supplied value when the log holds zero.
    fn resolve_tsys(
        &self,
        scan: u32,
        metadata: &ScanMetadata,
        polarization: Polarization,
    ) -> PipelineResult<f64> {
        let logged = metadata
            .system_temperature(polarization)
            .ok_or(CalibrationError::MissingSystemTemperature { scan, polarization })?;
        if logged != 0.0 {
            return Ok(logged);
        }

        match self.collaborators.tsys.request_tsys(scan, polarization) {
            Some(corrected) if corrected != 0.0 && corrected.is_finite() => {
                let warning =
                    format!("scan {scan} {polarization}: zero Tsys replaced with {corrected}");
                self.logger.warn(&warning);
                self.metrics.record_warning(warning);
                Ok(corrected)
            }
            _ => Err(CalibrationError::UncorrectedSystemTemperature { scan, polarization }.into()),
        }
    }

    /// Averages the accumulated pairs on a common velocity axis and persists
    /// the result.
    pub fn finalize(&mut self) -> PipelineResult<FinalReport> {
        if !self.can_finalize() {
            return Err(PipelineError::InvalidTransition {
                action: "finalize",
                state: self.state,
            });
        }
        self.state = ControllerState::Finalizing;

        let channels = self.accumulator.axis().map_or(0, <[f64]>::len);
        let mut sum = VelocitySum::new(channels);
        let mut excluded = Vec::new();
        let mut start_time = None;

        for pair in self.accumulator.pairs() {
            match self.pair_velocity(pair) {
                Ok((velocity, time)) => {
                    sum.add(pair, &velocity)?;
                    start_time.get_or_insert(time);
                }
                Err(err) => {
                    let reason = err.to_string();
                    let warning = format!("pair {} excluded from average: {reason}", pair.index);
                    self.logger.warn(&warning);
                    self.metrics.record_excluded(warning);
                    excluded.push(ExcludedPair {
                        index: pair.index,
                        reason,
                    });
                }
            }
        }

        let averaged_pairs = sum.count();
        let spectrum = sum.average()?;
        let record = ExperimentRecord {
            date: self.epoch.date.clone(),
            start_time: start_time.unwrap_or_default(),
            location: self.epoch.location.clone(),
            pair_count: self.pairs.len(),
            averaged_pairs,
            snr_a: finite(self.accumulator.snr_a()),
            snr_b: finite(self.accumulator.snr_b()),
            snr_average: finite(self.accumulator.snr_average()),
            components: spectrum.component_amplitudes(&self.config.monitoring_velocities),
        };

        let store = self.collaborators.store;
        store.write_spectrum(&self.epoch, &spectrum)?;
        store.create_if_absent()?;
        let key = self.epoch.experiment_key();
        store.append(&key, &record)?;

        self.state = ControllerState::Done;
        self.logger.record(&format!(
            "averaged {averaged_pairs} of {} pairs into {} channels, recorded as {key}",
            self.pairs.len(),
            spectrum.len()
        ));

        Ok(FinalReport {
            epoch: self.epoch.clone(),
            spectrum,
            record,
            excluded,
        })
    }

    /// Velocity axis of one pair and the start time of its signal scan.
    fn pair_velocity(&self, pair: &PairSpectra) -> PipelineResult<(Vec<f64>, String)> {
        let metadata = self.metadata(pair.signal_number)?;
        let query = DopplerQuery::from_metadata(metadata)?;
        self.logger
            .detail(&format!("pair {}: velocity correction for {query}", pair.index));
        let correction = self.collaborators.doppler.correct(&query)?;
        let observed =
            DopplerConverter::observed_frequencies(&pair.axis_mhz, pair.start_frequency_mhz);
        let velocity = self
            .converter
            .to_velocity(&observed, correction.total_velocity);
        Ok((velocity, metadata.start_time.clone()))
    }
}

fn finite(values: Vec<f64>) -> Vec<Option<f64>> {
    values
        .into_iter()
        .map(|v| v.is_finite().then_some(v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::doppler::{DopplerError, DopplerRecord};
    use crate::interface::observation::{JsonObservationLog, LogHeader};
    use crate::interface::store::StoreError;
    use crate::interface::tsys::NoTsysCorrection;
    use crate::processing::params::CalibrationParameters;
    use crate::scan::RawScan;
    use crate::storage::{FileResultStore, MemoryResultStore};
    use ndarray::Array2;
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    struct FixedDoppler(f64);

    impl DopplerCorrector for FixedDoppler {
        fn correct(&self, _query: &DopplerQuery) -> Result<DopplerRecord, DopplerError> {
            Ok(DopplerRecord {
                total_velocity: self.0,
                ..DopplerRecord::default()
            })
        }
    }

    /// Fails every call whose ordinal is listed.
    struct FlakyDoppler {
        calls: Cell<usize>,
        failing: Vec<usize>,
    }

    impl DopplerCorrector for FlakyDoppler {
        fn correct(&self, _query: &DopplerQuery) -> Result<DopplerRecord, DopplerError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if self.failing.contains(&call) {
                return Err(DopplerError::Timeout(std::time::Duration::from_secs(5)));
            }
            Ok(DopplerRecord {
                total_velocity: 0.0,
                ..DopplerRecord::default()
            })
        }
    }

    /// Memory store whose `append` fails while `failing` is set.
    struct FailingStore {
        inner: MemoryResultStore,
        failing: Cell<bool>,
    }

    impl ResultStore for FailingStore {
        fn exists(&self, key: &str) -> Result<bool, StoreError> {
            self.inner.exists(key)
        }

        fn create_if_absent(&self) -> Result<(), StoreError> {
            self.inner.create_if_absent()
        }

        fn append(&self, key: &str, record: &ExperimentRecord) -> Result<(), StoreError> {
            if self.failing.get() {
                return Err(StoreError::Io {
                    path: PathBuf::from("cepa.json"),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.inner.append(key, record)
        }

        fn write_spectrum(
            &self,
            epoch: &EpochKey,
            spectrum: &AveragedSpectrum,
        ) -> Result<(), StoreError> {
            self.inner.write_spectrum(epoch, spectrum)
        }
    }

    struct OperatorTsys(f64);

    impl TsysSource for OperatorTsys {
        fn request_tsys(&self, _scan: u32, _polarization: Polarization) -> Option<f64> {
            Some(self.0)
        }
    }

    fn metadata(tsys: [f64; 2]) -> ScanMetadata {
        ScanMetadata {
            system_temperatures: tsys.to_vec(),
            elevation: 40.0,
            start_time: "10:15:00".into(),
            date: "27 Jan 2018".into(),
            right_ascension: vec!["22".into(), "56".into(), "17.90".into()],
            declination: vec!["62".into(), "01".into(), "49.7".into()],
            frequency_mhz: 6667.0,
        }
    }

    fn observation_log(scans: u32, tsys: [f64; 2]) -> JsonObservationLog {
        JsonObservationLog {
            header: LogHeader {
                dates: "27 Jan 2018".into(),
                location: "IRBENE".into(),
                bbc_offset_mhz: 1.0,
            },
            scans: (1..=scans).map(|n| (n, metadata(tsys))).collect::<BTreeMap<_, _>>(),
        }
    }

    fn profiles() -> LocationProfiles {
        let mut profiles = LocationProfiles::new();
        profiles.insert(
            "IRBENE",
            CalibrationParameters {
                gain_curve: vec![1.0],
                dpfu_max: vec![0.5],
                tcal: 1.0,
                flux_constant: 1.0,
                shift_hz: 0.0,
            },
        );
        profiles
    }

    fn config() -> ControllerConfig {
        ControllerConfig {
            cleanup: CleanupConfig {
                enabled: false,
                ..CleanupConfig::default()
            },
            ..ControllerConfig::new("cepa")
        }
    }

    fn scan(signal: &[f64]) -> RawScan {
        let mut rows = Array2::zeros((signal.len(), 9));
        for (i, &amp) in signal.iter().enumerate() {
            rows[[i, 0]] = i as f64;
            rows[[i, 1]] = amp;
            rows[[i, 2]] = amp;
        }
        RawScan::from_rows(rows)
    }

    fn pair(n: u32, signal: &[f64], reference: &[f64]) -> ScanPair {
        ScanPair {
            signal_file: format!("cepa_no{:04}.dat", 2 * n - 1),
            reference_file: format!("cepa_no{:04}.dat", 2 * n),
            signal_number: 2 * n - 1,
            reference_number: 2 * n,
            signal: scan(signal),
            reference: scan(reference),
        }
    }

    fn write_scan(dir: &Path, name: &str, amplitudes: &[f64]) {
        let mut text = String::from("0 0 0 0 0 0 0 0 0\n");
        for (i, amp) in amplitudes.iter().enumerate() {
            text.push_str(&format!("{i} {amp} {amp} 0 0 0 0 0 0\n"));
        }
        fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn identical_scans_average_to_zero() {
        let dir = tempdir().unwrap();
        let scans = dir.path().join("cepa/1");
        fs::create_dir_all(&scans).unwrap();
        for n in 1..=4 {
            write_scan(&scans, &format!("cepa_no{n:04}.dat"), &[1.0, 2.0, 3.0, 2.0, 1.0]);
        }

        let log = observation_log(4, [40.0, 42.0]);
        let store = FileResultStore::new(&dir.path().join("results"), dir.path(), "cepa");
        let collaborators = Collaborators {
            log: &log,
            doppler: &FixedDoppler(-2.5),
            store: &store,
            tsys: &NoTsysCorrection,
        };
        let mut controller =
            PipelineController::from_directory(config(), &profiles(), &scans, collaborators)
                .unwrap();
        assert_eq!(controller.pair_count(), 2);
        assert_eq!(controller.state(), ControllerState::Idle);

        let first = controller.advance().unwrap();
        assert_eq!(first.state, ControllerState::ProcessingPair(0));
        let spectra = first.spectra().unwrap();
        assert_eq!(spectra.axis_mhz, vec![1.0, 2.0, 3.0]);
        assert_eq!(spectra.flux_a, vec![0.0; 3]);
        assert_eq!(spectra.snr_a, f64::INFINITY);

        assert!(!controller.can_finalize());
        let second = controller.advance().unwrap();
        assert_eq!(second.state, ControllerState::ProcessingPair(1));
        assert!(controller.can_finalize());

        let report = controller.finalize().unwrap();
        assert_eq!(controller.state(), ControllerState::Done);
        assert_eq!(report.spectrum.flux_a, vec![0.0; 3]);
        assert_eq!(report.spectrum.flux_b, vec![0.0; 3]);
        assert_eq!(report.spectrum.velocity.len(), 3);
        assert_eq!(report.record.averaged_pairs, 2);
        assert_eq!(report.record.snr_a, vec![None, None]);

        assert!(store.exists("cepa27_Jan_2018_IRBENE").unwrap());
        assert!(dir.path().join("cepa27_Jan_2018_IRBENE.dat").exists());
        assert_eq!(controller.metrics().processed, 2);
    }

    #[test]
    fn velocity_axis_follows_sky_frequency() {
        let log = observation_log(2, [40.0, 40.0]);
        let store = MemoryResultStore::new();
        let collaborators = Collaborators {
            log: &log,
            doppler: &FixedDoppler(0.0),
            store: &store,
            tsys: &NoTsysCorrection,
        };
        let pairs = vec![pair(1, &[1.0, 1.0, 1.0, 1.0], &[1.0, 1.0, 1.5, 1.0])];
        let mut controller =
            PipelineController::new(config(), &profiles(), pairs, collaborators).unwrap();
        controller.advance().unwrap();
        let report = controller.finalize().unwrap();

        // axis [1, 2] MHz offsets from 6667 + 1 (BBC)
        let converter = DopplerConverter::default();
        let expected = converter.to_velocity(&[6669.0e6, 6670.0e6], 0.0);
        assert_eq!(report.spectrum.velocity, expected);
        assert_eq!(store.spectrum(&report.epoch), Some(report.spectrum.clone()));
        assert!(store.is_created());
    }

    #[test]
    fn transitions_are_enforced() {
        let log = observation_log(4, [40.0, 40.0]);
        let store = MemoryResultStore::new();
        let collaborators = Collaborators {
            log: &log,
            doppler: &FixedDoppler(0.0),
            store: &store,
            tsys: &NoTsysCorrection,
        };
        let amplitudes = [1.0, 2.0, 3.0, 2.0, 1.0];
        let pairs = vec![
            pair(1, &amplitudes, &amplitudes),
            pair(2, &amplitudes, &amplitudes),
        ];
        let mut controller =
            PipelineController::new(config(), &profiles(), pairs, collaborators).unwrap();

        assert!(matches!(
            controller.finalize(),
            Err(PipelineError::InvalidTransition {
                action: "finalize",
                state: ControllerState::Idle
            })
        ));
        controller.advance().unwrap();
        assert!(controller.finalize().is_err());
        controller.advance().unwrap();
        assert!(matches!(
            controller.advance(),
            Err(PipelineError::InvalidTransition {
                action: "advance",
                ..
            })
        ));
        controller.finalize().unwrap();
        assert!(controller.finalize().is_err());
        assert!(controller.advance().is_err());
        assert_eq!(controller.state(), ControllerState::Done);
    }

    #[test]
    fn zero_tsys_without_correction_rejects_only_that_pair() {
        let mut log = observation_log(4, [40.0, 40.0]);
        if let Some(scan) = log.scans.get_mut(&1) {
            scan.system_temperatures = vec![0.0, 40.0];
        }
        let store = MemoryResultStore::new();
        let collaborators = Collaborators {
            log: &log,
            doppler: &FixedDoppler(0.0),
            store: &store,
            tsys: &NoTsysCorrection,
        };
        let amplitudes = [1.0, 2.0, 3.0, 2.0, 1.0];
        let pairs = vec![
            pair(1, &amplitudes, &amplitudes),
            pair(2, &amplitudes, &amplitudes),
        ];
        let mut controller =
            PipelineController::new(config(), &profiles(), pairs, collaborators).unwrap();

        let first = controller.advance().unwrap();
        assert!(matches!(first.outcome, PairOutcome::Rejected { .. }));
        let second = controller.advance().unwrap();
        assert!(second.spectra().is_some());

        let report = controller.finalize().unwrap();
        assert_eq!(report.record.averaged_pairs, 1);
        assert_eq!(controller.metrics().rejected, 1);
    }

    #[test]
    fn zero_tsys_can_be_corrected_by_operator() {
        let mut log = observation_log(2, [40.0, 40.0]);
        if let Some(scan) = log.scans.get_mut(&2) {
            scan.system_temperatures = vec![40.0, 0.0];
        }
        let store = MemoryResultStore::new();
        let collaborators = Collaborators {
            log: &log,
            doppler: &FixedDoppler(0.0),
            store: &store,
            tsys: &OperatorTsys(55.0),
        };
        let pairs = vec![pair(1, &[1.0, 2.0, 3.0, 4.0], &[2.0, 2.0, 3.0, 5.0])];
        let mut controller =
            PipelineController::new(config(), &profiles(), pairs, collaborators).unwrap();

        assert!(controller.advance().unwrap().spectra().is_some());
        assert_eq!(controller.metrics().warnings.len(), 1);
    }

    #[test]
    fn failed_corrections_exclude_pairs() {
        let log = observation_log(4, [40.0, 40.0]);
        let store = MemoryResultStore::new();
        let doppler = FlakyDoppler {
            calls: Cell::new(0),
            failing: vec![0],
        };
        let collaborators = Collaborators {
            log: &log,
            doppler: &doppler,
            store: &store,
            tsys: &NoTsysCorrection,
        };
        let amplitudes = [1.0, 2.0, 3.0, 2.0, 1.0];
        let pairs = vec![
            pair(1, &amplitudes, &amplitudes),
            pair(2, &amplitudes, &amplitudes),
        ];
        let mut controller =
            PipelineController::new(config(), &profiles(), pairs, collaborators).unwrap();
        controller.advance().unwrap();
        controller.advance().unwrap();

        let report = controller.finalize().unwrap();
        assert_eq!(report.excluded.len(), 1);
        assert_eq!(report.excluded[0].index, 0);
        assert_eq!(report.record.averaged_pairs, 1);
        assert_eq!(controller.metrics().excluded, 1);
    }

    #[test]
    fn all_corrections_failing_is_an_error() {
        let log = observation_log(2, [40.0, 40.0]);
        let store = MemoryResultStore::new();
        let doppler = FlakyDoppler {
            calls: Cell::new(0),
            failing: vec![0],
        };
        let collaborators = Collaborators {
            log: &log,
            doppler: &doppler,
            store: &store,
            tsys: &NoTsysCorrection,
        };
        let amplitudes = [1.0, 2.0, 3.0, 2.0, 1.0];
        let pairs = vec![pair(1, &amplitudes, &amplitudes)];
        let mut controller =
            PipelineController::new(config(), &profiles(), pairs, collaborators).unwrap();
        controller.advance().unwrap();

        assert!(matches!(
            controller.finalize(),
            Err(PipelineError::NoPairsToAverage)
        ));
        assert!(!store.is_created());
    }

    #[test]
    fn missing_metadata_rejects_the_pair() {
        let log = observation_log(1, [40.0, 40.0]);
        let store = MemoryResultStore::new();
        let collaborators = Collaborators {
            log: &log,
            doppler: &FixedDoppler(0.0),
            store: &store,
            tsys: &NoTsysCorrection,
        };
        let amplitudes = [1.0, 2.0, 3.0, 2.0, 1.0];
        let pairs = vec![pair(1, &amplitudes, &amplitudes)];
        let mut controller =
            PipelineController::new(config(), &profiles(), pairs, collaborators).unwrap();

        let report = controller.advance().unwrap();
        assert_eq!(
            report.outcome,
            PairOutcome::Rejected {
                reason: "no metadata logged for scan 2".into()
            }
        );
    }

    #[test]
    fn unknown_location_is_rejected_up_front() {
        let mut log = observation_log(2, [40.0, 40.0]);
        log.header.location = "ONSALA".into();
        let store = MemoryResultStore::new();
        let collaborators = Collaborators {
            log: &log,
            doppler: &FixedDoppler(0.0),
            store: &store,
            tsys: &NoTsysCorrection,
        };
        let pairs = vec![pair(1, &[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0])];
        assert!(matches!(
            PipelineController::new(config(), &profiles(), pairs, collaborators),
            Err(PipelineError::Calibration(CalibrationError::UnknownLocation(_)))
        ));
    }

    #[test]
    fn store_failure_leaves_finalize_retryable() {
        let log = observation_log(2, [40.0, 40.0]);
        let store = FailingStore {
            inner: MemoryResultStore::new(),
            failing: Cell::new(true),
        };
        let collaborators = Collaborators {
            log: &log,
            doppler: &FixedDoppler(0.0),
            store: &store,
            tsys: &NoTsysCorrection,
        };
        let amplitudes = [1.0, 2.0, 3.0, 2.0, 1.0];
        let pairs = vec![pair(1, &amplitudes, &amplitudes)];
        let mut controller =
            PipelineController::new(config(), &profiles(), pairs, collaborators).unwrap();
        controller.advance().unwrap();

        assert!(matches!(
            controller.finalize(),
            Err(PipelineError::Store(StoreError::Io { .. }))
        ));
        assert_eq!(controller.state(), ControllerState::Finalizing);
        assert!(controller.can_finalize());
        assert!(store.inner.records().is_empty());

        store.failing.set(false);
        let report = controller.finalize().unwrap();
        assert_eq!(controller.state(), ControllerState::Done);
        assert!(store.inner.records().contains_key(&report.epoch.experiment_key()));
        assert!(matches!(
            controller.finalize(),
            Err(PipelineError::InvalidTransition { .. })
        ));
    }
}
