//! Mock authenticator for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::{AuthError, AuthToken, AuthTokenStorage, Authenticator};
use crate::config::Settings;

/// Mock implementation of the Authenticator trait.
///
/// Each successful refresh stores a token whose access token is
/// `refreshed-<n>`, `n` counting refreshes from 1.
#[derive(Debug, Default)]
pub struct MockAuthenticator {
    refreshes: Arc<RwLock<u32>>,
    fail_refresh: Arc<RwLock<bool>>,
}

impl MockAuthenticator {
    /// Create a new mock authenticator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refresh attempts, including failed ones.
    pub async fn refresh_count(&self) -> u32 {
        *self.refreshes.read().await
    }

    /// Make every following refresh fail.
    pub async fn set_fail_refresh(&self, fail: bool) {
        *self.fail_refresh.write().await = fail;
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn refresh_token(
        &self,
        _settings: &Settings,
        storage: &dyn AuthTokenStorage,
    ) -> Result<AuthToken, AuthError> {
        let n = {
            let mut refreshes = self.refreshes.write().await;
            *refreshes += 1;
            *refreshes
        };

        if *self.fail_refresh.read().await {
            return Err(AuthError::RefreshRejected {
                status: 400,
                message: "invalid_grant".to_string(),
            });
        }

        let token = AuthToken::bearer(
            format!("refreshed-{}", n),
            Some("mock-refresh-token".to_string()),
            Some(3600),
        );
        storage.store(token.clone())?;
        Ok(token)
    }

    fn method_name(&self) -> &'static str {
        "mock"
    }
}
