pub mod audit_logger;
pub use audit_logger::*;

pub mod tracing_logger;
pub use tracing_logger::*;
