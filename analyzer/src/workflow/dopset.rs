//! Velocity-correction collaborators available to the analyzer.

use log::{debug, warn};
use masercore::interface::{DopplerCorrector, DopplerError, DopplerQuery, DopplerRecord};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Command;
use tokio::runtime::{Builder as TokioBuilder, Runtime};
use tokio::time::timeout;

use crate::workflow::config::DopplerConfig;

/// Runs the external correction executable once per query and parses the
/// record file it writes.
pub struct DopsetCommand {
    program: PathBuf,
    leading_args: Vec<String>,
    record_file: PathBuf,
    timeout: Duration,
    runtime: Runtime,
}

impl DopsetCommand {
    pub fn new(
        program: PathBuf,
        leading_args: Vec<String>,
        record_file: PathBuf,
        timeout: Duration,
    ) -> std::io::Result<Self> {
        let runtime = TokioBuilder::new_current_thread().enable_all().build()?;
        Ok(Self {
            program,
            leading_args,
            record_file,
            timeout,
            runtime,
        })
    }

    pub fn from_config(config: &DopplerConfig) -> std::io::Result<Self> {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            config.record_file.clone(),
            Duration::from_secs(config.timeout_secs.max(1)),
        )
    }

    async fn run(&self, query: &DopplerQuery) -> Result<ExitStatus, DopplerError> {
        let mut child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(query.arguments())
            .kill_on_drop(true)
            .spawn()?;
        match timeout(self.timeout, child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => Err(DopplerError::Timeout(self.timeout)),
        }
    }

    fn remove_stale_record(&self) -> Result<(), DopplerError> {
        match fs::remove_file(&self.record_file) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

impl DopplerCorrector for DopsetCommand {
    fn correct(&self, query: &DopplerQuery) -> Result<DopplerRecord, DopplerError> {
        self.remove_stale_record()?;
        debug!("running {} {query}", self.program.display());

        let status = self.runtime.block_on(self.run(query))?;

        if !status.success() {
            return Err(DopplerError::Service(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }

        let text = fs::read_to_string(&self.record_file).map_err(|err| {
            warn!(
                "{} produced no record at {}",
                self.program.display(),
                self.record_file.display()
            );
            DopplerError::from(err)
        })?;
        DopplerRecord::parse(&text)
    }
}

/// Constant receiver velocity, for synthetic runs and offline checks.
#[derive(Debug, Clone, Copy)]
pub struct FixedVelocity(pub f64);

impl DopplerCorrector for FixedVelocity {
    fn correct(&self, _query: &DopplerQuery) -> Result<DopplerRecord, DopplerError> {
        Ok(DopplerRecord {
            total_velocity: self.0,
            ..DopplerRecord::default()
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use masercore::interface::ScanMetadata;
    use tempfile::tempdir;

    fn query() -> DopplerQuery {
        DopplerQuery::from_metadata(&ScanMetadata {
            system_temperatures: vec![40.0, 41.0],
            elevation: 35.0,
            start_time: "09:05:07".into(),
            date: "03 Feb 2019".into(),
            right_ascension: vec!["22".into(), "56".into(), "17.90".into()],
            declination: vec!["62".into(), "01".into(), "49.7".into()],
            frequency_mhz: 6667.0,
        })
        .unwrap()
    }

    fn shell(script: String, record_file: PathBuf, timeout: Duration) -> DopsetCommand {
        DopsetCommand::new(
            PathBuf::from("sh"),
            vec!["-c".into(), script, "dopset".into()],
            record_file,
            timeout,
        )
        .unwrap()
    }

    #[test]
    fn reads_record_written_by_command() {
        let dir = tempdir().unwrap();
        let record = dir.path().join("lsrShift.dat");
        // echoes the year back as the source name
        let script = format!(
            "printf 'Source;%s\\nVelTotal;-12.5\\n' \"$1\" > '{}'",
            record.display()
        );
        let command = shell(script, record, Duration::from_secs(5));

        let result = command.correct(&query()).unwrap();
        assert_eq!(result.total_velocity, -12.5);
        assert_eq!(result.source.as_deref(), Some("2019"));
    }

    #[test]
    fn failing_command_is_a_service_error() {
        let dir = tempdir().unwrap();
        let command = shell("exit 3".into(), dir.path().join("lsr.dat"), Duration::from_secs(5));
        assert!(matches!(
            command.correct(&query()),
            Err(DopplerError::Service(_))
        ));
    }

    #[test]
    fn stale_record_is_not_reused() {
        let dir = tempdir().unwrap();
        let record = dir.path().join("lsr.dat");
        fs::write(&record, "VelTotal;1.0\n").unwrap();
        let command = shell("true".into(), record, Duration::from_secs(5));
        assert!(matches!(command.correct(&query()), Err(DopplerError::Io(_))));
    }

    #[test]
    fn slow_command_times_out() {
        let dir = tempdir().unwrap();
        let command = shell(
            "sleep 5".into(),
            dir.path().join("lsr.dat"),
            Duration::from_millis(200),
        );
        assert!(matches!(
            command.correct(&query()),
            Err(DopplerError::Timeout(_))
        ));
    }

    #[test]
    fn fixed_velocity_ignores_query() {
        assert_eq!(FixedVelocity(3.5).correct(&query()).unwrap().total_velocity, 3.5);
    }
}
