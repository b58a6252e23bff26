use std::error::Error;

use tracing::{error, warn};

/// Where the auditor reports failures it swallows.
pub trait AuditLogger: Send + Sync {
    fn error(&self, err: &dyn Error, message: &str);

    fn warn(&self, message: &str);
}

/// [`AuditLogger`] that forwards to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl AuditLogger for TracingLogger {
    fn error(&self, err: &dyn Error, message: &str) {
        error!(error = %err, "{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }
}
