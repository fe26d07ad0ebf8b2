use std::sync::Mutex;

use serde::Serialize;

/// Counters for one pipeline run.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub processed: usize,
    pub rejected: usize,
    pub excluded: usize,
    pub warnings: Vec<String>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_processed(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.processed += 1;
        }
    }

    /// A pair that could not be calibrated.
    pub fn record_rejected(&self, warning: String) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.rejected += 1;
            metrics.warnings.push(warning);
        }
    }

    /// A calibrated pair left out of the final average.
    pub fn record_excluded(&self, warning: String) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.excluded += 1;
            metrics.warnings.push(warning);
        }
    }

    pub fn record_warning(&self, warning: String) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.warnings.push(warning);
        }
    }

    pub fn snapshot(&self) -> Metrics {
        self.inner
            .lock()
            .map(|metrics| metrics.clone())
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
