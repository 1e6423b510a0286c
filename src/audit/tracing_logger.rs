use crate::audit::SecurityAuditLogger;

use serde_json::Value;
use tracing::{error, info, warn};

/// Writes audit records as `tracing` events under the `audit` target.
#[derive(Debug, Default)]
pub struct TracingAuditLogger;

impl SecurityAuditLogger for TracingAuditLogger {
    fn log(&self, event: &str, details: &Value) {
        info!(target: "audit", "{} {}", event, details);
    }

    fn log_warning(&self, event: &str, details: &Value) {
        warn!(target: "audit", "{} {}", event, details);
    }

    fn log_error(&self, event: &str, details: &Value) {
        error!(target: "audit", "{} {}", event, details);
    }

    fn log_security(&self, event: &str, details: &Value) {
        warn!(target: "audit", security = true, "{} {}", event, details);
    }
}
