pub mod calibration;
pub mod cleanup;
pub mod doppler;
pub mod params;
pub mod quality;

pub use calibration::{CalibratedChannel, CalibrationError, Calibrator, ChannelInput};
pub use cleanup::{CleanedChannel, CleanupConfig, CleanupStage};
pub use doppler::DopplerConverter;
pub use params::{CalibrationParameters, LocationProfiles};
pub use quality::signal_to_noise;
