use std::sync::RwLock;

use super::traits::{ContinuationStorage, StateError};
use crate::model::ContinuationToken;

/// Cursor storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryContinuationStorage {
    token: RwLock<Option<ContinuationToken>>,
}

impl MemoryContinuationStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: ContinuationToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

impl ContinuationStorage for MemoryContinuationStorage {
    fn load(&self) -> Result<Option<ContinuationToken>, StateError> {
        self.token
            .read()
            .map(|t| t.clone())
            .map_err(|e| StateError::Database(e.to_string()))
    }

    fn save(&self, token: &ContinuationToken) -> Result<(), StateError> {
        let mut slot = self
            .token
            .write()
            .map_err(|e| StateError::Database(e.to_string()))?;
        *slot = Some(token.clone());
        Ok(())
    }

    fn reset(&self) -> Result<(), StateError> {
        let mut slot = self
            .token
            .write()
            .map_err(|e| StateError::Database(e.to_string()))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_reset() {
        let storage = MemoryContinuationStorage::new();
        assert_eq!(storage.load().unwrap(), None);

        storage.save(&ContinuationToken::new("page-3")).unwrap();
        assert_eq!(storage.load().unwrap(), Some(ContinuationToken::new("page-3")));

        storage.reset().unwrap();
        assert_eq!(storage.load().unwrap(), None);
    }
}
