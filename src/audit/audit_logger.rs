use serde_json::Value;

/// A sink for the ceremony audit trail. Storage of the records is the implementor's concern.
pub trait SecurityAuditLogger: Send + Sync {
    /// Records a routine state change.
    fn log(&self, event: &str, details: &Value);

    /// Records a rejected request that does not indicate tampering.
    fn log_warning(&self, event: &str, details: &Value);

    /// Records a failure of a collaborator or of a validation check.
    fn log_error(&self, event: &str, details: &Value);

    /// Records an event relevant to the security of a ceremony.
    fn log_security(&self, event: &str, details: &Value);
}
