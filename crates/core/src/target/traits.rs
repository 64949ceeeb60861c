//! Trait definitions for the target module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::TargetError;
use crate::model::{AssetRecord, MetadataCategory, MetadataElement};
use crate::queue::RunKind;
use crate::sync::SyncError;

/// What a target can accept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTargetCapabilities {
    /// Accepts every import language instead of only the primary one.
    pub multi_language: bool,
    /// Accepts assets carrying more than one binary.
    pub compound_assets: bool,
    /// Accepts replaced binaries (version > 1).
    pub binary_updates: bool,
}

impl SyncTargetCapabilities {
    pub fn all() -> Self {
        Self {
            multi_language: true,
            compound_assets: true,
            binary_updates: true,
        }
    }
}

/// The downstream system receiving synchronized data.
///
/// Hooks returning `Ok(true)` let the run continue; `Ok(false)` from a
/// `before_*` hook aborts it cleanly. `after_*` hooks returning `Ok(false)` are
/// logged and otherwise ignored.
#[async_trait]
pub trait SyncTarget: Send + Sync {
    /// Returns the name of this target implementation.
    fn name(&self) -> &str;

    fn capabilities(&self) -> SyncTargetCapabilities;

    async fn before_sync(&self, kind: RunKind) -> Result<bool, TargetError>;

    async fn before_generic_metadata_sync(&self) -> Result<bool, TargetError>;

    /// Import one category's vocabulary.
    ///
    /// Must return every element with its target key assigned.
    async fn import_metadata(
        &self,
        category: MetadataCategory,
        elements: Vec<MetadataElement>,
    ) -> Result<Vec<MetadataElement>, TargetError>;

    async fn after_generic_metadata_sync(&self) -> Result<bool, TargetError>;

    async fn before_assets_sync(&self) -> Result<bool, TargetError>;

    async fn import_new_assets(&self, assets: &[AssetRecord]) -> Result<(), TargetError>;

    async fn update_assets(&self, assets: &[AssetRecord]) -> Result<(), TargetError>;

    async fn import_new_compound_assets(&self, assets: &[AssetRecord]) -> Result<(), TargetError>;

    async fn update_compound_assets(&self, assets: &[AssetRecord]) -> Result<(), TargetError>;

    /// Target-side id of an asset, keyed by its transaction id.
    async fn target_asset_uuid(&self, transaction_id: &str) -> Result<Option<String>, TargetError>;

    /// Target-side id of a binary, keyed by [`crate::model::binary_key`].
    async fn target_binary_uuid(&self, binary_key: &str) -> Result<Option<String>, TargetError>;

    /// Called when a run stops on an authentication failure.
    async fn handle_authenticator_error(&self, error: &SyncError);

    /// Called when a run stops on any other failure.
    async fn handle_sync_job_error(&self, error: &SyncError);

    async fn after_assets_sync(&self) -> Result<bool, TargetError>;

    async fn after_sync(&self) -> Result<bool, TargetError>;

    /// Drop any metadata cached during the run.
    async fn clear_generic_metadata_caches(&self);
}
