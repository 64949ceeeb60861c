//! OAuth2 refresh-token grant.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{AuthError, AuthToken, AuthTokenStorage, Authenticator};
use crate::config::Settings;
use crate::metrics;

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Authenticator that exchanges the stored refresh token for a new access token.
pub struct OAuthRefreshAuthenticator {
    client: Client,
}

impl OAuthRefreshAuthenticator {
    pub fn new(timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::ConfigurationError(e.to_string()))?;
        Ok(Self { client })
    }

    fn into_token(response: TokenResponse, previous_refresh: Option<String>) -> AuthToken {
        let mut token = AuthToken::bearer(
            response.access_token,
            // Providers may omit the refresh token when it is not rotated
            response.refresh_token.or(previous_refresh),
            response.expires_in,
        );
        token.id_token = response.id_token;
        token
    }
}

#[async_trait]
impl Authenticator for OAuthRefreshAuthenticator {
    async fn refresh_token(
        &self,
        settings: &Settings,
        storage: &dyn AuthTokenStorage,
    ) -> Result<AuthToken, AuthError> {
        let current = storage.get();
        let Some(refresh_token) = current.refresh_token.clone().filter(|t| !t.is_empty()) else {
            metrics::TOKEN_REFRESHES.with_label_values(&["unavailable"]).inc();
            return Err(AuthError::NoRefreshToken);
        };

        debug!(token_url = %settings.oauth.token_url, "Refreshing upstream access token");

        let response = self
            .client
            .post(&settings.oauth.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", settings.oauth.client_id.as_str()),
                ("client_secret", settings.oauth.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                metrics::TOKEN_REFRESHES.with_label_values(&["error"]).inc();
                AuthError::ServiceUnavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Token refresh rejected");
            metrics::TOKEN_REFRESHES.with_label_values(&["rejected"]).inc();
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ServiceUnavailable(format!("invalid token response: {}", e)))?;

        let token = Self::into_token(body, Some(refresh_token));
        storage.store(token.clone())?;
        metrics::TOKEN_REFRESHES.with_label_values(&["success"]).inc();
        info!(expires_at = ?token.expires_at, "Upstream access token refreshed");

        Ok(token)
    }

    fn method_name(&self) -> &'static str {
        "oauth_refresh"
    }
}
