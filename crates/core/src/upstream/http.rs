//! HTTP client for the upstream marketplace API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::config::UpstreamConfig;
use super::error::UpstreamError;
use super::traits::UpstreamApi;
use super::types::{MetadataEntry, TransactionPage};
use crate::auth::AuthToken;
use crate::model::{ContinuationToken, MetadataCategory};

/// Marketplace API client scoped to one tenant.
pub struct HttpUpstreamClient {
    client: Client,
    base_url: String,
    tenant_id: String,
}

impl HttpUpstreamClient {
    /// Create a new client for `tenant_id`.
    pub fn new(config: &UpstreamConfig, tenant_id: &str) -> Result<Self, UpstreamError> {
        if config.base_url.is_empty() {
            return Err(UpstreamError::Transport(
                "upstream base_url is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tenant_id: tenant_id.to_string(),
        })
    }

    fn tenant_url(&self, path: &str) -> String {
        format!(
            "{}/tenants/{}/{}",
            self.base_url,
            urlencoding::encode(&self.tenant_id),
            path
        )
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, UpstreamError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl UpstreamApi for HttpUpstreamClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_metadata(
        &self,
        category: MetadataCategory,
        locale: &str,
        token: &AuthToken,
    ) -> Result<Vec<MetadataEntry>, UpstreamError> {
        let url = self.tenant_url(&format!("metadata/{}", category.as_str()));

        debug!("Upstream metadata fetch: category={}, locale={}", category, locale);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token.access_token)
            .query(&[("locale", locale)])
            .send()
            .await
            .map_err(|e| UpstreamError::from(e).context(format!("fetching {} metadata", category)))?;

        Self::decode(response)
            .await
            .map_err(|e| e.context(format!("fetching {} metadata", category)))
    }

    async fn fetch_transactions(
        &self,
        continuation: Option<&ContinuationToken>,
        chunk_size: usize,
        token: &AuthToken,
    ) -> Result<TransactionPage, UpstreamError> {
        let url = self.tenant_url("purchases");

        debug!(
            "Upstream purchases fetch: continuation={:?}, limit={}",
            continuation.map(|c| c.as_str()),
            chunk_size
        );

        let mut request = self
            .client
            .get(&url)
            .bearer_auth(&token.access_token)
            .query(&[("limit", chunk_size.to_string())]);

        if let Some(cursor) = continuation {
            request = request.query(&[("continuation", cursor.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::from(e).context("fetching purchases"))?;

        Self::decode(response)
            .await
            .map_err(|e| e.context("fetching purchases"))
    }
}
