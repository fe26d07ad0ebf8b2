use crate::prelude::Polarization;

/// Supplies a replacement system temperature when the log reports zero.
pub trait TsysSource {
    fn request_tsys(&self, scan_number: u32, polarization: Polarization) -> Option<f64>;
}

/// Never corrects anything; a zero Tsys rejects the pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTsysCorrection;

impl TsysSource for NoTsysCorrection {
    fn request_tsys(&self, _scan_number: u32, _polarization: Polarization) -> Option<f64> {
        None
    }
}
