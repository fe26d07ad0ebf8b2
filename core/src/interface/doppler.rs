//! Contract with the line-of-sight velocity correction service.

use std::fmt;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::interface::observation::ScanMetadata;

#[derive(thiserror::Error, Debug)]
pub enum DopplerError {
    #[error("scan metadata has an unparsable {field}: {value:?}")]
    InvalidMetadata { field: &'static str, value: String },
    #[error("correction record has no VelTotal entry")]
    MissingTotalVelocity,
    #[error("correction record field {field} is not a number: {value:?}")]
    InvalidField { field: &'static str, value: String },
    #[error("correction service failed: {0}")]
    Service(String),
    #[error("correction service did not answer within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Pointing and time of one scan, in the form the correction service reads.
#[derive(Debug, Clone, PartialEq)]
pub struct DopplerQuery {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub right_ascension: Vec<String>,
    pub declination: Vec<String>,
}

impl DopplerQuery {
    pub fn from_metadata(metadata: &ScanMetadata) -> Result<Self, DopplerError> {
        let date = NaiveDate::parse_from_str(metadata.date.trim(), "%d %b %Y").map_err(|_| {
            DopplerError::InvalidMetadata {
                field: "date",
                value: metadata.date.clone(),
            }
        })?;
        let time = NaiveTime::parse_from_str(metadata.start_time.trim(), "%H:%M:%S").map_err(
            |_| DopplerError::InvalidMetadata {
                field: "start time",
                value: metadata.start_time.clone(),
            },
        )?;
        Ok(Self {
            date,
            time,
            right_ascension: metadata.right_ascension.clone(),
            declination: metadata.declination.clone(),
        })
    }

    /// `YYYY M D HH MM SS <ra parts> <dec parts>`, one token per argument.
    pub fn arguments(&self) -> Vec<String> {
        let mut args = vec![
            self.date.year().to_string(),
            self.date.month().to_string(),
            self.date.day().to_string(),
        ];
        args.extend(
            self.time
                .format("%H %M %S")
                .to_string()
                .split(' ')
                .map(str::to_string),
        );
        args.extend(self.right_ascension.iter().cloned());
        args.extend(self.declination.iter().cloned());
        args
    }
}

impl fmt::Display for DopplerQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.arguments().join(" "))
    }
}

/// Velocity correction returned by the service. Only `total_velocity` is
/// required by the pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DopplerRecord {
    pub date: Option<String>,
    pub time: Option<String>,
    pub right_ascension: Option<String>,
    pub declination: Option<String>,
    pub source: Option<String>,
    pub lsr_shift: Option<f64>,
    pub mjd: Option<f64>,
    pub observed_velocity: Option<f64>,
    pub rest_frequency: Option<f64>,
    pub frequency_shift: Option<f64>,
    /// km/s
    pub total_velocity: f64,
}

impl DopplerRecord {
    /// Parses the `Key;Value` lines written by the correction service.
    /// Unknown keys are ignored.
    pub fn parse(text: &str) -> Result<Self, DopplerError> {
        let mut record = DopplerRecord::default();
        let mut total_velocity = None;

        for line in text.lines() {
            let mut fields = line.split(';');
            let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "Date" => record.date = Some(value.to_string()),
                "Time" => record.time = Some(value.to_string()),
                "RA" => record.right_ascension = Some(value.to_string()),
                "DEC" => record.declination = Some(value.to_string()),
                "Source" => record.source = Some(value.to_string()),
                "LSRshift" => record.lsr_shift = Some(number("LSRshift", value)?),
                "MJD" => record.mjd = Some(number("MJD", value)?),
                "Vobs" => record.observed_velocity = Some(number("Vobs", value)?),
                "AtFreq" => record.rest_frequency = Some(number("AtFreq", value)?),
                "FreqShift" => record.frequency_shift = Some(number("FreqShift", value)?),
                "VelTotal" => total_velocity = Some(number("VelTotal", value)?),
                _ => {}
            }
        }

        record.total_velocity = total_velocity.ok_or(DopplerError::MissingTotalVelocity)?;
        Ok(record)
    }
}

fn number(field: &'static str, value: &str) -> Result<f64, DopplerError> {
    value.parse().map_err(|_| DopplerError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// Line-of-sight velocity correction service.
pub trait DopplerCorrector {
    fn correct(&self, query: &DopplerQuery) -> Result<DopplerRecord, DopplerError>;
}
