use thiserror::Error;

use crate::mapper::MapperError;
use crate::state::StateError;
use crate::target::TargetError;
use crate::upstream::UpstreamError;

/// Data the target declared it cannot accept.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("asset {transaction_id} has {binaries} binaries but the target does not accept compound assets")]
    CompoundNotSupported {
        transaction_id: String,
        binaries: usize,
    },

    #[error("asset {transaction_id} carries binary {binary_id} at version {version} but the target does not accept binary updates")]
    BinaryUpdateNotSupported {
        transaction_id: String,
        binary_id: String,
        version: u32,
    },
}

/// Errors that stop a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Upstream rejected the credentials and they could not be refreshed.
    #[error("Upstream authentication failed: {0}")]
    Authentication(#[source] UpstreamError),

    #[error("Upstream error: {0}")]
    Upstream(#[source] UpstreamError),

    #[error("Target error: {0}")]
    Target(#[from] TargetError),

    #[error("Target contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),

    #[error("Metadata mapping error: {0}")]
    Mapping(#[from] MapperError),

    #[error("Sync state error: {0}")]
    State(#[from] StateError),
}

impl SyncError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

impl From<UpstreamError> for SyncError {
    fn from(e: UpstreamError) -> Self {
        if e.is_auth_failure() {
            Self::Authentication(e)
        } else {
            Self::Upstream(e)
        }
    }
}
