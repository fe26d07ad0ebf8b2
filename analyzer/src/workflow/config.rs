use anyhow::{ensure, Context};
use masercore::pipeline::ControllerConfig;
use masercore::processing::doppler::DEFAULT_REST_FREQUENCY_HZ;
use masercore::processing::{CleanupConfig, LocationProfiles};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory layout of a reduction site.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw scans under `<data_dir>/<source>/<iteration>/`; averaged tables
    /// are written here too.
    pub data_dir: PathBuf,
    /// Pre-parsed JSON observation logs.
    pub log_dir: PathBuf,
    /// Per-source JSON result stores and the run journal.
    pub result_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_dir: PathBuf::from("logs"),
            result_dir: PathBuf::from("results"),
        }
    }
}

/// How velocity corrections are obtained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DopplerConfig {
    /// Executable taking `Y M D HH MM SS ra.. dec..` as arguments.
    pub command: PathBuf,
    /// Arguments placed before the query.
    pub args: Vec<String>,
    /// `Key;Value` file the executable leaves behind.
    pub record_file: PathBuf,
    pub timeout_secs: u64,
    /// Skips the executable and uses this receiver velocity (km/s).
    pub fixed_total_velocity: Option<f64>,
}

impl Default for DopplerConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from("code/dopsetpy"),
            args: Vec::new(),
            record_file: PathBuf::from("lsrShift.dat"),
            timeout_secs: 30,
            fixed_total_velocity: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub paths: PathsConfig,
    pub filter: CleanupConfig,
    pub rest_frequency_hz: f64,
    pub locations: LocationProfiles,
    pub doppler: DopplerConfig,
    /// Component velocities (km/s) tracked across epochs.
    pub monitoring_velocities: Vec<f64>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            filter: CleanupConfig::default(),
            rest_frequency_hz: DEFAULT_REST_FREQUENCY_HZ,
            locations: LocationProfiles::new(),
            doppler: DopplerConfig::default(),
            monitoring_velocities: Vec::new(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Applies command-line overrides on top of the loaded file.
    pub fn apply_overrides(
        &mut self,
        threshold: Option<f64>,
        no_filter: bool,
    ) -> anyhow::Result<()> {
        if let Some(threshold) = threshold {
            ensure!(
                threshold > 0.0 && threshold.is_finite(),
                "outlier threshold must be positive, got {threshold}"
            );
            self.filter.threshold = threshold;
        }
        if no_filter {
            self.filter.enabled = false;
        }
        self.filter
            .validate()
            .context("validating outlier filter settings")?;
        Ok(())
    }

    pub fn controller_config(&self, source: &str) -> ControllerConfig {
        ControllerConfig {
            source: source.to_string(),
            rest_frequency_hz: self.rest_frequency_hz,
            cleanup: self.filter.clone(),
            monitoring_velocities: self.monitoring_velocities.clone(),
        }
    }

    pub fn scan_dir(&self, source: &str, iteration: &str) -> PathBuf {
        self.paths.data_dir.join(source).join(iteration)
    }

    pub fn log_path(&self, log_file: &Path) -> PathBuf {
        self.paths.log_dir.join(log_file)
    }
}
