use crate::workflow::config::WorkflowConfig;
use crate::workflow::dopset::{DopsetCommand, FixedVelocity};
use anyhow::Context;
use log::info;
use masercore::interface::{DopplerCorrector, JsonObservationLog, TsysSource};
use masercore::monitoring::{component_series, ComponentIndices};
use masercore::pipeline::{Collaborators, FinalReport, PairReport, PipelineController};
use masercore::storage::FileResultStore;
use masercore::telemetry::Metrics;
use std::path::Path;

/// Outcome of one reduction run.
pub struct WorkflowResult {
    pub report: FinalReport,
    pub metrics: Metrics,
    pub rejected_pairs: Vec<usize>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn result_store(&self, source: &str) -> FileResultStore {
        FileResultStore::new(
            &self.config.paths.result_dir,
            &self.config.paths.data_dir,
            source,
        )
    }

    /// Correction service named by the configuration.
    pub fn doppler(&self) -> anyhow::Result<Box<dyn DopplerCorrector>> {
        let doppler = &self.config.doppler;
        Ok(match doppler.fixed_total_velocity {
            Some(velocity) => Box::new(FixedVelocity(velocity)),
            None => Box::new(
                DopsetCommand::from_config(doppler)
                    .context("creating runtime for the correction command")?,
            ),
        })
    }

    /// Reduces `<data_dir>/<source>/<iteration>` with the given collaborators.
    /// `review` sees every pair right after it has been processed.
    pub fn execute<F>(
        &self,
        source: &str,
        iteration: &str,
        log_file: &Path,
        doppler: &dyn DopplerCorrector,
        tsys: &dyn TsysSource,
        mut review: F,
    ) -> anyhow::Result<WorkflowResult>
    where
        F: FnMut(&PairReport) -> anyhow::Result<()>,
    {
        let log_path = self.config.log_path(log_file);
        let log = JsonObservationLog::load(&log_path)
            .with_context(|| format!("loading observation log {}", log_path.display()))?;
        let store = self.result_store(source);
        let collaborators = Collaborators {
            log: &log,
            doppler,
            store: &store,
            tsys,
        };

        let scan_dir = self.config.scan_dir(source, iteration);
        let mut controller = PipelineController::from_directory(
            self.config.controller_config(source),
            &self.config.locations,
            &scan_dir,
            collaborators,
        )
        .with_context(|| format!("preparing scans in {}", scan_dir.display()))?;

        let mut rejected_pairs = Vec::new();
        while controller.has_next_pair() {
            let pair = controller.advance().context("advancing to the next pair")?;
            if pair.spectra().is_none() {
                rejected_pairs.push(pair.index);
            }
            review(&pair)?;
        }

        let report = controller
            .finalize()
            .with_context(|| format!("finalizing {}", controller.epoch().experiment_key()))?;
        info!(
            "{}: {} channels written to {}",
            report.epoch.experiment_key(),
            report.spectrum.len(),
            store.table_path(&report.epoch).display()
        );

        Ok(WorkflowResult {
            report,
            metrics: controller.metrics(),
            rejected_pairs,
        })
    }

    /// Variability and fluctuation indices of every tracked component of
    /// `source`.
    pub fn monitor(&self, source: &str) -> anyhow::Result<Vec<ComponentIndices>> {
        let store = self.result_store(source);
        let records = store
            .load()
            .with_context(|| format!("reading result store {}", store.store_path().display()))?;
        Ok(component_series(&records)
            .iter()
            .map(ComponentIndices::from_series)
            .collect())
    }
}
