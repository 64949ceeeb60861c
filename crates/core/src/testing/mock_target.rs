//! Mock sync target for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};

use crate::model::{AssetRecord, MetadataCategory, MetadataElement};
use crate::queue::RunKind;
use crate::sync::SyncError;
use crate::target::{SyncTarget, SyncTargetCapabilities, TargetError};

/// Mock implementation of the SyncTarget trait.
///
/// Records every hook call by name (`import_metadata` calls are recorded as
/// `import_metadata:<category>`). Imported assets get target ids right away,
/// so a second delivery of the same transaction is classified as an update.
#[derive(Debug)]
pub struct MockTarget {
    capabilities: SyncTargetCapabilities,
    calls: Arc<RwLock<Vec<String>>>,
    runs: Arc<RwLock<Vec<RunKind>>>,
    /// When set, `before_sync` waits for a permit.
    gate: Arc<RwLock<Option<Arc<Semaphore>>>>,
    /// Hook that answers `Ok(false)`.
    decline_hook: Arc<RwLock<Option<String>>>,
    /// Hook that fails with the given error.
    failing_hook: Arc<RwLock<Option<(String, TargetError)>>>,
    /// Leave target keys unassigned on metadata import.
    skip_target_keys: Arc<RwLock<bool>>,
    metadata: Arc<RwLock<Vec<(MetadataCategory, Vec<MetadataElement>)>>>,
    new_assets: Arc<RwLock<Vec<AssetRecord>>>,
    updated_assets: Arc<RwLock<Vec<AssetRecord>>>,
    new_compound_assets: Arc<RwLock<Vec<AssetRecord>>>,
    updated_compound_assets: Arc<RwLock<Vec<AssetRecord>>>,
    delivery_log: Arc<RwLock<Vec<String>>>,
    asset_uuids: Arc<RwLock<HashMap<String, String>>>,
    binary_uuids: Arc<RwLock<HashMap<String, String>>>,
    authenticator_errors: Arc<RwLock<Vec<String>>>,
    job_errors: Arc<RwLock<Vec<String>>>,
    cache_clears: Arc<RwLock<u32>>,
}

impl Default for MockTarget {
    fn default() -> Self {
        Self::with_capabilities(SyncTargetCapabilities::all())
    }
}

impl MockTarget {
    /// Create a mock target accepting everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: SyncTargetCapabilities) -> Self {
        Self {
            capabilities,
            calls: Arc::default(),
            runs: Arc::default(),
            gate: Arc::default(),
            decline_hook: Arc::default(),
            failing_hook: Arc::default(),
            skip_target_keys: Arc::default(),
            metadata: Arc::default(),
            new_assets: Arc::default(),
            updated_assets: Arc::default(),
            new_compound_assets: Arc::default(),
            updated_compound_assets: Arc::default(),
            delivery_log: Arc::default(),
            asset_uuids: Arc::default(),
            binary_uuids: Arc::default(),
            authenticator_errors: Arc::default(),
            job_errors: Arc::default(),
            cache_clears: Arc::default(),
        }
    }

    /// Hold every run in `before_sync` until the returned semaphore gets a
    /// permit. Each run consumes one.
    pub async fn hold_runs(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.write().await = Some(Arc::clone(&gate));
        gate
    }

    /// Make the named hook answer `Ok(false)`.
    pub async fn decline_at(&self, hook: &str) {
        *self.decline_hook.write().await = Some(hook.to_string());
    }

    /// Make the named hook fail with `error`.
    pub async fn fail_at(&self, hook: &str, error: TargetError) {
        *self.failing_hook.write().await = Some((hook.to_string(), error));
    }

    pub async fn set_skip_target_keys(&self, skip: bool) {
        *self.skip_target_keys.write().await = skip;
    }

    /// Pretend an asset already exists on the target.
    pub async fn add_known_asset(&self, transaction_id: &str, uuid: &str) {
        self.asset_uuids
            .write()
            .await
            .insert(transaction_id.to_string(), uuid.to_string());
    }

    /// Pretend a binary already exists on the target.
    pub async fn add_known_binary(&self, binary_key: &str, uuid: &str) {
        self.binary_uuids
            .write()
            .await
            .insert(binary_key.to_string(), uuid.to_string());
    }

    /// Hook names in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Number of calls to the named hook.
    pub async fn call_count(&self, hook: &str) -> usize {
        self.calls.read().await.iter().filter(|c| *c == hook).count()
    }

    /// Kinds passed to `before_sync`.
    pub async fn runs(&self) -> Vec<RunKind> {
        self.runs.read().await.clone()
    }

    /// Metadata batches received, with their assigned keys.
    pub async fn imported_metadata(&self) -> Vec<(MetadataCategory, Vec<MetadataElement>)> {
        self.metadata.read().await.clone()
    }

    pub async fn new_assets(&self) -> Vec<AssetRecord> {
        self.new_assets.read().await.clone()
    }

    pub async fn updated_assets(&self) -> Vec<AssetRecord> {
        self.updated_assets.read().await.clone()
    }

    pub async fn new_compound_assets(&self) -> Vec<AssetRecord> {
        self.new_compound_assets.read().await.clone()
    }

    pub async fn updated_compound_assets(&self) -> Vec<AssetRecord> {
        self.updated_compound_assets.read().await.clone()
    }

    /// Transaction ids of every delivered asset, in delivery order.
    pub async fn delivered_transactions(&self) -> Vec<String> {
        self.delivery_log.read().await.clone()
    }

    pub async fn authenticator_errors(&self) -> Vec<String> {
        self.authenticator_errors.read().await.clone()
    }

    pub async fn job_errors(&self) -> Vec<String> {
        self.job_errors.read().await.clone()
    }

    pub async fn cache_clears(&self) -> u32 {
        *self.cache_clears.read().await
    }

    async fn hook(&self, name: &str) -> Result<bool, TargetError> {
        self.calls.write().await.push(name.to_string());

        let mut failing = self.failing_hook.write().await;
        if failing.as_ref().is_some_and(|(hook, _)| hook == name) {
            if let Some((_, error)) = failing.take() {
                return Err(error);
            }
        }
        drop(failing);

        let declined = self.decline_hook.read().await.as_deref() == Some(name);
        Ok(!declined)
    }

    async fn deliver(
        &self,
        name: &str,
        assets: &[AssetRecord],
        sink: &RwLock<Vec<AssetRecord>>,
    ) -> Result<(), TargetError> {
        self.hook(name).await?;

        let mut asset_uuids = self.asset_uuids.write().await;
        let mut binary_uuids = self.binary_uuids.write().await;
        for asset in assets {
            asset_uuids
                .entry(asset.transaction_id.clone())
                .or_insert_with(|| format!("asset-{}", asset.transaction_id));
            for binary in &asset.binaries {
                let key = binary.key();
                binary_uuids
                    .entry(key.clone())
                    .or_insert_with(|| format!("binary-{}", key));
            }
        }

        sink.write().await.extend(assets.iter().cloned());
        self.delivery_log
            .write()
            .await
            .extend(assets.iter().map(|a| a.transaction_id.clone()));
        Ok(())
    }
}

#[async_trait]
impl SyncTarget for MockTarget {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> SyncTargetCapabilities {
        self.capabilities
    }

    async fn before_sync(&self, kind: RunKind) -> Result<bool, TargetError> {
        self.runs.write().await.push(kind);

        let gate = self.gate.read().await.clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.hook("before_sync").await
    }

    async fn before_generic_metadata_sync(&self) -> Result<bool, TargetError> {
        self.hook("before_generic_metadata_sync").await
    }

    async fn import_metadata(
        &self,
        category: MetadataCategory,
        mut elements: Vec<MetadataElement>,
    ) -> Result<Vec<MetadataElement>, TargetError> {
        self.hook(&format!("import_metadata:{}", category)).await?;

        if !*self.skip_target_keys.read().await {
            for element in &mut elements {
                let key = format!("t-{}-{}", category, element.upstream_key());
                element
                    .assign_target_key(key)
                    .map_err(|e| TargetError::rejected(category.as_str(), e.to_string()))?;
            }
        }

        self.metadata
            .write()
            .await
            .push((category, elements.clone()));
        Ok(elements)
    }

    async fn after_generic_metadata_sync(&self) -> Result<bool, TargetError> {
        self.hook("after_generic_metadata_sync").await
    }

    async fn before_assets_sync(&self) -> Result<bool, TargetError> {
        self.hook("before_assets_sync").await
    }

    async fn import_new_assets(&self, assets: &[AssetRecord]) -> Result<(), TargetError> {
        self.deliver("import_new_assets", assets, &self.new_assets)
            .await
    }

    async fn update_assets(&self, assets: &[AssetRecord]) -> Result<(), TargetError> {
        self.deliver("update_assets", assets, &self.updated_assets)
            .await
    }

    async fn import_new_compound_assets(&self, assets: &[AssetRecord]) -> Result<(), TargetError> {
        self.deliver("import_new_compound_assets", assets, &self.new_compound_assets)
            .await
    }

    async fn update_compound_assets(&self, assets: &[AssetRecord]) -> Result<(), TargetError> {
        self.deliver("update_compound_assets", assets, &self.updated_compound_assets)
            .await
    }

    async fn target_asset_uuid(&self, transaction_id: &str) -> Result<Option<String>, TargetError> {
        Ok(self.asset_uuids.read().await.get(transaction_id).cloned())
    }

    async fn target_binary_uuid(&self, binary_key: &str) -> Result<Option<String>, TargetError> {
        Ok(self.binary_uuids.read().await.get(binary_key).cloned())
    }

    async fn handle_authenticator_error(&self, error: &SyncError) {
        self.calls
            .write()
            .await
            .push("handle_authenticator_error".to_string());
        self.authenticator_errors.write().await.push(error.to_string());
    }

    async fn handle_sync_job_error(&self, error: &SyncError) {
        self.calls
            .write()
            .await
            .push("handle_sync_job_error".to_string());
        self.job_errors.write().await.push(error.to_string());
    }

    async fn after_assets_sync(&self) -> Result<bool, TargetError> {
        self.hook("after_assets_sync").await
    }

    async fn after_sync(&self) -> Result<bool, TargetError> {
        self.hook("after_sync").await
    }

    async fn clear_generic_metadata_caches(&self) {
        self.calls
            .write()
            .await
            .push("clear_generic_metadata_caches".to_string());
        *self.cache_clears.write().await += 1;
    }
}
