use log::{debug, info, warn};

/// Prefixes log lines with the run they belong to.
pub struct LogManager {
    context: String,
}

impl LogManager {
    pub fn new() -> Self {
        Self {
            context: String::new(),
        }
    }

    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn record(&self, message: &str) {
        info!("{}", self.prefixed(message));
    }

    pub fn detail(&self, message: &str) {
        debug!("{}", self.prefixed(message));
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", self.prefixed(message));
    }

    fn prefixed(&self, message: &str) -> String {
        if self.context.is_empty() {
            message.to_string()
        } else {
            format!("[{}] {}", self.context, message)
        }
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
