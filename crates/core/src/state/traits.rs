use thiserror::Error;

use crate::model::ContinuationToken;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Persists the asset stream cursor between runs.
///
/// The token is saved after every delivered chunk, so an interrupted run
/// resumes after the last completed chunk.
pub trait ContinuationStorage: Send + Sync {
    /// The saved cursor, `None` to start from the beginning.
    fn load(&self) -> Result<Option<ContinuationToken>, StateError>;

    fn save(&self, token: &ContinuationToken) -> Result<(), StateError>;

    /// Forget the cursor so the next run re-reads the whole stream.
    fn reset(&self) -> Result<(), StateError>;
}
