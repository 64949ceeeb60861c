use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use super::types::AuthToken;
use crate::config::Settings;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("No refresh token available, interactive authorization required")]
    NoRefreshToken,

    #[error("Token refresh rejected ({status}): {message}")]
    RefreshRejected { status: u16, message: String },

    #[error("Authentication service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Obtains fresh credentials without user interaction.
///
/// The interactive first-time authorization happens elsewhere; an
/// authenticator only ever refreshes what is already in storage.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Refresh the stored token, persist the result and return it.
    async fn refresh_token(
        &self,
        settings: &Settings,
        storage: &dyn AuthTokenStorage,
    ) -> Result<AuthToken, AuthError>;

    /// Name of this authentication method
    fn method_name(&self) -> &'static str;
}

/// Holds the current upstream credentials.
pub trait AuthTokenStorage: Send + Sync {
    /// Current token ([`AuthToken::empty`] when none was ever stored).
    fn get(&self) -> AuthToken;

    /// Replace the current token.
    ///
    /// Subscribers are notified even when the token is invalid or the
    /// underlying persistence fails.
    fn store(&self, token: AuthToken) -> Result<(), AuthError>;

    /// Receive every token passed to [`AuthTokenStorage::store`].
    fn subscribe(&self) -> watch::Receiver<AuthToken>;
}
