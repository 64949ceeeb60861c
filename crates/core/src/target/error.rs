//! Error types for the target module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a sync target.
#[derive(Debug, Error)]
pub enum TargetError {
    /// Failed to write a file under the target root.
    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a file under the target root.
    #[error("Failed to read {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored document could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The target refused the data.
    #[error("Target rejected {what}: {reason}")]
    Rejected { what: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TargetError {
    pub fn rejected(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            what: what.into(),
            reason: reason.into(),
        }
    }
}
