/// Gaussian emission line on `channels` bins.
pub fn gaussian_line(channels: usize, center: f64, width: f64, peak: f64) -> Vec<f64> {
    (0..channels)
        .map(|i| {
            let x = (i as f64 - center) / width;
            peak * (-0.5 * x * x).exp()
        })
        .collect()
}

/// Receiver bandpass: a flat top rolling off towards both band edges.
pub fn bandpass(channels: usize, level: f64) -> Vec<f64> {
    let span = channels.max(2) as f64 - 1.0;
    (0..channels)
        .map(|i| {
            let x = 2.0 * i as f64 / span - 1.0;
            level * (1.0 - 0.3 * x.powi(8))
        })
        .collect()
}
