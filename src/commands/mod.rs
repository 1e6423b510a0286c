use crate::{
    audit::SecurityAuditLogger,
    distribution::DistributionRegistry,
    environment::Environment,
    storage::Memory,
    validation::ParameterValidator,
};

pub mod abort;
pub(crate) use abort::*;

pub mod contribution;
pub(crate) use contribution::*;

pub mod finalization;
pub(crate) use finalization::*;

pub mod initialization;
pub(crate) use initialization::*;

pub mod registration;
pub(crate) use registration::*;

pub mod verification;
pub(crate) use verification::*;

/// The collaborators a command executes against.
pub(crate) struct Context<'a> {
    pub(crate) environment: &'a Environment,
    pub(crate) storage: &'a Memory,
    pub(crate) distribution: &'a DistributionRegistry,
    pub(crate) validator: &'a dyn ParameterValidator,
    pub(crate) audit: &'a dyn SecurityAuditLogger,
}

/// Returns a new random identifier of the form `{prefix}-{32 hex characters}`.
pub(crate) fn new_identifier(prefix: &str) -> String {
    format!("{}-{}", prefix, hex::encode(rand::random::<[u8; 16]>()))
}

/// Returns `true` if a required text field was not provided.
#[inline]
pub(crate) fn is_missing(field: &str) -> bool {
    field.trim().is_empty()
}
