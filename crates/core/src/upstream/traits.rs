//! Trait definitions for the upstream module.

use async_trait::async_trait;

use super::error::UpstreamError;
use super::types::{MetadataEntry, TransactionPage};
use crate::auth::AuthToken;
use crate::model::{ContinuationToken, MetadataCategory};

/// Client for the upstream marketplace API.
///
/// Implementations perform exactly one request per call; retries and token
/// refresh belong to [`super::AccessLayer`].
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Returns the name of this client implementation.
    fn name(&self) -> &str;

    /// Fetch every value of a vocabulary category in one locale.
    async fn fetch_metadata(
        &self,
        category: MetadataCategory,
        locale: &str,
        token: &AuthToken,
    ) -> Result<Vec<MetadataEntry>, UpstreamError>;

    /// Fetch the next chunk of purchase transactions after `continuation`.
    ///
    /// `None` starts from the beginning of the stream.
    async fn fetch_transactions(
        &self,
        continuation: Option<&ContinuationToken>,
        chunk_size: usize,
        token: &AuthToken,
    ) -> Result<TransactionPage, UpstreamError>;
}
