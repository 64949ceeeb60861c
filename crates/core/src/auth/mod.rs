mod oauth;
mod token_store;
mod traits;
mod types;

pub use oauth::*;
pub use token_store::*;
pub use traits::*;
pub use types::*;

use std::time::Duration;

use crate::config::Settings;
use crate::upstream::UpstreamConfig;

/// Factory function to create the refresh authenticator from config
pub fn create_authenticator(
    settings: &Settings,
    upstream: &UpstreamConfig,
) -> Result<Box<dyn Authenticator>, AuthError> {
    if settings.oauth.token_url.trim().is_empty() {
        return Err(AuthError::ConfigurationError(
            "settings.oauth.token_url must be set".to_string(),
        ));
    }
    if settings.oauth.client_id.trim().is_empty() {
        return Err(AuthError::ConfigurationError(
            "settings.oauth.client_id must be set".to_string(),
        ));
    }

    Ok(Box::new(OAuthRefreshAuthenticator::new(Duration::from_secs(
        upstream.timeout_secs,
    ))?))
}
