pub use super::coordinator::*;

pub use crate::{
    environment::{Environment, Settings},
    hashing::ContributionHasher,
    objects::*,
    Coordinator,
    CoordinatorError,
    ErrorKind,
};
pub use tracing::{debug, error, info, trace, warn};
