//! In-process token storage.

use tokio::sync::watch;

use super::{AuthError, AuthToken, AuthTokenStorage};

/// Token storage kept in memory only.
///
/// The watch channel doubles as the storage cell, so every `store` reaches
/// all subscribers.
pub struct MemoryTokenStorage {
    tx: watch::Sender<AuthToken>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::with_token(AuthToken::empty())
    }

    pub fn with_token(token: AuthToken) -> Self {
        let (tx, _rx) = watch::channel(token);
        Self { tx }
    }
}

impl Default for MemoryTokenStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthTokenStorage for MemoryTokenStorage {
    fn get(&self) -> AuthToken {
        self.tx.borrow().clone()
    }

    fn store(&self, token: AuthToken) -> Result<(), AuthError> {
        self.tx.send_replace(token);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<AuthToken> {
        self.tx.subscribe()
    }
}
