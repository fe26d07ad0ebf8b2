pub mod doppler;
pub mod observation;
pub mod record;
pub mod store;
pub mod tsys;

pub use doppler::{DopplerCorrector, DopplerError, DopplerQuery, DopplerRecord};
pub use observation::{JsonObservationLog, LogHeader, ObservationLog, ScanMetadata};
pub use record::{AveragedSpectrum, ComponentAmplitude, EpochKey, ExperimentRecord};
pub use store::{ResultStore, StoreError};
pub use tsys::{NoTsysCorrection, TsysSource};
