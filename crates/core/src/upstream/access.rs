//! Retry and token refresh around single upstream calls.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use backon::Retryable;
use tracing::{debug, info, warn};

use super::config::RetryPolicy;
use super::error::UpstreamError;
use crate::auth::{AuthToken, AuthTokenStorage, Authenticator};
use crate::config::Settings;
use crate::metrics;

/// Wraps upstream calls with a fixed-delay retry policy and re-authentication.
///
/// Every attempt reads the current token from storage. A 401 or 403 (checked on
/// the root cause, so context wrappers do not hide it) triggers one refresh before
/// the next attempt. If that refresh fails, the original error is returned at once.
pub struct AccessLayer {
    authenticator: Arc<dyn Authenticator>,
    token_storage: Arc<dyn AuthTokenStorage>,
    settings: Settings,
    policy: RetryPolicy,
}

impl AccessLayer {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        token_storage: Arc<dyn AuthTokenStorage>,
        settings: Settings,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            authenticator,
            token_storage,
            settings,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Refresh the stored token after an auth failure. Returns false when the
    /// authenticator could not produce a new token.
    async fn refresh(&self, operation: &str, err: &UpstreamError) -> bool {
        debug!(operation, status = ?err.status(), "Upstream rejected token, refreshing");
        match self
            .authenticator
            .refresh_token(&self.settings, self.token_storage.as_ref())
            .await
        {
            Ok(_) => true,
            Err(refresh_err) => {
                warn!(
                    operation,
                    error = %refresh_err,
                    "Token refresh failed, not retrying"
                );
                false
            }
        }
    }

    /// Run `call` until it succeeds or the attempt budget is spent.
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, UpstreamError>
    where
        F: FnMut(AuthToken) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let max_attempts = self.policy.max_attempts;
        let attempt = AtomicU32::new(0);
        let refresh_failed = AtomicBool::new(false);
        let (attempt_ref, refresh_failed_ref) = (&attempt, &refresh_failed);

        let attempt_call = move || {
            let current = attempt_ref.fetch_add(1, Ordering::SeqCst) + 1;
            let pending = call(self.token_storage.get());
            async move {
                let err = match pending.await {
                    Ok(value) => {
                        if current > 1 {
                            info!(
                                operation,
                                attempt = current,
                                "Upstream call succeeded after retry"
                            );
                        }
                        return Ok(value);
                    }
                    Err(err) => err,
                };

                // Refresh before the next attempt; the last attempt has none
                if err.is_auth_failure()
                    && current < max_attempts
                    && !self.refresh(operation, &err).await
                {
                    refresh_failed_ref.store(true, Ordering::SeqCst);
                }
                Err(err)
            }
        };

        let result = attempt_call
            .retry(self.policy.into_backoff())
            .when(|_| !refresh_failed.load(Ordering::SeqCst))
            .notify(|err, delay| {
                warn!(
                    operation,
                    attempt = attempt.load(Ordering::SeqCst),
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Upstream call failed, retrying"
                );
                metrics::UPSTREAM_RETRIES
                    .with_label_values(&[operation])
                    .inc();
            })
            .await;

        if let Err(err) = &result {
            if !refresh_failed.load(Ordering::SeqCst) {
                warn!(
                    operation,
                    attempts = attempt.load(Ordering::SeqCst),
                    error = %err,
                    "Upstream call failed, giving up"
                );
            }
        }
        result
    }
}
