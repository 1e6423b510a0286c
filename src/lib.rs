pub mod audit;
mod commands;
pub mod coordinator;
pub mod distribution;
pub mod environment;
pub mod hashing;
pub mod logger;
pub mod objects;
pub mod storage;
pub mod validation;

pub use coordinator::*;
pub use objects::*;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
