//! Mock upstream marketplace for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::AuthToken;
use crate::model::{ContinuationToken, MetadataCategory};
use crate::upstream::{
    MetadataEntry, PurchaseTransaction, TransactionPage, UpstreamApi, UpstreamError,
};

/// Mock implementation of the UpstreamApi trait.
///
/// The purchase stream is an in-memory list. Continuation tokens are the
/// decimal offset of the next record, so appending records and running again
/// behaves like new purchases arriving upstream.
///
/// # Example
///
/// ```rust,ignore
/// use assetsync_core::testing::{fixtures, MockUpstream};
///
/// let upstream = MockUpstream::new();
/// upstream.push_transactions(vec![fixtures::transaction("tx-1", 1)]).await;
/// upstream.push_error(UpstreamError::Timeout).await;
/// ```
#[derive(Debug, Default)]
pub struct MockUpstream {
    metadata: Arc<RwLock<HashMap<(MetadataCategory, String), Vec<MetadataEntry>>>>,
    transactions: Arc<RwLock<Vec<PurchaseTransaction>>>,
    /// Errors returned by the next calls, in order, before any real response.
    errors: Arc<RwLock<VecDeque<UpstreamError>>>,
    /// When set, only this access token is accepted; others get a 401.
    accepted_token: Arc<RwLock<Option<String>>>,
    metadata_calls: Arc<RwLock<Vec<(MetadataCategory, String)>>>,
    transaction_calls: Arc<RwLock<Vec<Option<ContinuationToken>>>>,
}

impl MockUpstream {
    /// Create a new mock upstream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the vocabulary returned for a category in a locale.
    pub async fn set_metadata(
        &self,
        category: MetadataCategory,
        locale: &str,
        entries: Vec<MetadataEntry>,
    ) {
        self.metadata
            .write()
            .await
            .insert((category, locale.to_string()), entries);
    }

    /// Append records to the purchase stream.
    pub async fn push_transactions(&self, transactions: Vec<PurchaseTransaction>) {
        self.transactions.write().await.extend(transactions);
    }

    /// Queue an error for the next call.
    pub async fn push_error(&self, error: UpstreamError) {
        self.errors.write().await.push_back(error);
    }

    /// Only accept `token` as access token.
    pub async fn set_accepted_token(&self, token: Option<&str>) {
        *self.accepted_token.write().await = token.map(str::to_string);
    }

    /// Metadata requests received, as (category, locale).
    pub async fn metadata_calls(&self) -> Vec<(MetadataCategory, String)> {
        self.metadata_calls.read().await.clone()
    }

    /// Continuation tokens of the purchase requests received.
    pub async fn transaction_calls(&self) -> Vec<Option<ContinuationToken>> {
        self.transaction_calls.read().await.clone()
    }

    async fn check_call(&self, token: &AuthToken) -> Result<(), UpstreamError> {
        if let Some(error) = self.errors.write().await.pop_front() {
            return Err(error);
        }
        if let Some(accepted) = self.accepted_token.read().await.as_deref() {
            if token.access_token != accepted {
                return Err(UpstreamError::Http {
                    status: 401,
                    body: "token expired".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UpstreamApi for MockUpstream {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_metadata(
        &self,
        category: MetadataCategory,
        locale: &str,
        token: &AuthToken,
    ) -> Result<Vec<MetadataEntry>, UpstreamError> {
        self.metadata_calls
            .write()
            .await
            .push((category, locale.to_string()));
        self.check_call(token).await?;

        Ok(self
            .metadata
            .read()
            .await
            .get(&(category, locale.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_transactions(
        &self,
        continuation: Option<&ContinuationToken>,
        chunk_size: usize,
        token: &AuthToken,
    ) -> Result<TransactionPage, UpstreamError> {
        self.transaction_calls
            .write()
            .await
            .push(continuation.cloned());
        self.check_call(token).await?;

        let offset = match continuation {
            Some(c) => c.as_str().parse::<usize>().map_err(|_| UpstreamError::Http {
                status: 400,
                body: format!("invalid continuation '{}'", c),
            })?,
            None => 0,
        };

        let transactions = self.transactions.read().await;
        let start = offset.min(transactions.len());
        let end = (start + chunk_size).min(transactions.len());
        let items = transactions[start..end].to_vec();

        Ok(TransactionPage {
            continuation: Some(ContinuationToken::new(end.to_string())),
            items,
        })
    }
}
