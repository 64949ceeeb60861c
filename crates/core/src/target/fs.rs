//! File system target implementation.
//!
//! Layout under the root directory:
//! - `index.json`: transaction id and binary key to target uuid
//! - `metadata/<category>.json`: imported vocabulary with target keys
//! - `assets/<transaction id>.json`: delivered asset records
//! - `last_error.json`: the most recent run failure

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::FsTargetConfig;
use super::error::TargetError;
use super::traits::{SyncTarget, SyncTargetCapabilities};
use crate::model::{AssetRecord, MetadataCategory, MetadataElement};
use crate::queue::RunKind;
use crate::sync::SyncError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct TargetIndex {
    #[serde(default)]
    assets: BTreeMap<String, String>,
    #[serde(default)]
    binaries: BTreeMap<String, String>,
}

/// An asset as written to disk.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredAsset {
    pub target_uuid: String,
    /// Binary key to target uuid.
    pub binaries: BTreeMap<String, String>,
    pub compound: bool,
    pub record: AssetRecord,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct StoredError<'a> {
    kind: &'a str,
    message: String,
    at: DateTime<Utc>,
}

/// Target writing JSON documents under a root directory.
pub struct FsTarget {
    config: FsTargetConfig,
    index: Mutex<TargetIndex>,
    metadata_cache: Mutex<HashMap<MetadataCategory, BTreeMap<String, String>>>,
}

impl FsTarget {
    pub fn new(config: FsTargetConfig) -> Self {
        Self {
            config,
            index: Mutex::new(TargetIndex::default()),
            metadata_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.config.root_dir
    }

    fn index_path(&self) -> PathBuf {
        self.config.root_dir.join("index.json")
    }

    fn metadata_path(&self, category: MetadataCategory) -> PathBuf {
        self.config
            .root_dir
            .join("metadata")
            .join(format!("{}.json", category.as_str()))
    }

    /// Path of the stored document for a transaction.
    pub fn asset_path(&self, transaction_id: &str) -> PathBuf {
        self.config
            .root_dir
            .join("assets")
            .join(format!("{}.json", sanitize_file_name(transaction_id)))
    }

    /// Read back a delivered asset.
    pub async fn load_asset(&self, transaction_id: &str) -> Result<Option<StoredAsset>, TargetError> {
        read_json(&self.asset_path(transaction_id)).await
    }

    async fn reload_index(&self) -> Result<(), TargetError> {
        let loaded: TargetIndex = read_json(&self.index_path()).await?.unwrap_or_default();
        debug!(
            assets = loaded.assets.len(),
            binaries = loaded.binaries.len(),
            "Loaded target index"
        );
        *self.index.lock().await = loaded;
        Ok(())
    }

    async fn store_assets(
        &self,
        assets: &[AssetRecord],
        compound: bool,
        update: bool,
    ) -> Result<(), TargetError> {
        if assets.is_empty() {
            return Ok(());
        }

        let mut index = self.index.lock().await;
        for asset in assets {
            if update && !self.config.binary_updates {
                if let Some(version) = asset.max_binary_version().filter(|v| *v > 1) {
                    return Err(TargetError::rejected(
                        format!("asset {}", asset.transaction_id),
                        format!("binary version {} but binary updates are disabled", version),
                    ));
                }
            }

            let target_uuid = index
                .assets
                .entry(asset.transaction_id.clone())
                .or_insert_with(new_uuid)
                .clone();

            let mut binaries = BTreeMap::new();
            for binary in &asset.binaries {
                let key = binary.key();
                let uuid = index
                    .binaries
                    .entry(key.clone())
                    .or_insert_with(new_uuid)
                    .clone();
                binaries.insert(key, uuid);
            }

            let stored = StoredAsset {
                target_uuid,
                binaries,
                compound,
                record: asset.clone(),
                stored_at: Utc::now(),
            };
            write_json(&self.asset_path(&asset.transaction_id), &stored).await?;
        }
        write_json(&self.index_path(), &*index).await?;

        info!(
            count = assets.len(),
            compound,
            update,
            "Stored assets in {}",
            self.config.root_dir.display()
        );
        Ok(())
    }

    async fn record_error(&self, kind: &str, error: &SyncError) {
        let doc = StoredError {
            kind,
            message: error.to_string(),
            at: Utc::now(),
        };
        let path = self.config.root_dir.join("last_error.json");
        if let Err(e) = write_json(&path, &doc).await {
            warn!("Failed to record {} error at {}: {}", kind, path.display(), e);
        }
    }
}

fn new_uuid() -> String {
    Uuid::new_v4().to_string()
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Fold a batch into the persisted vocabulary. Elements absent from the batch
/// keep their target keys.
fn merge_elements(document: &mut Vec<MetadataElement>, batch: &[MetadataElement]) {
    let positions: HashMap<String, usize> = document
        .iter()
        .enumerate()
        .map(|(idx, e)| (e.upstream_key().to_string(), idx))
        .collect();

    for element in batch {
        match positions.get(element.upstream_key()) {
            Some(&idx) => document[idx] = element.clone(),
            None => document.push(element.clone()),
        }
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, TargetError> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(TargetError::ReadFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write through a temporary file so readers never see partial documents.
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), TargetError> {
    let write_failed = |source| TargetError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(write_failed)?;
    }
    let content = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).await.map_err(write_failed)?;
    fs::rename(&tmp, path).await.map_err(write_failed)?;
    Ok(())
}

#[async_trait]
impl SyncTarget for FsTarget {
    fn name(&self) -> &str {
        "fs"
    }

    fn capabilities(&self) -> SyncTargetCapabilities {
        SyncTargetCapabilities {
            multi_language: self.config.multi_language,
            compound_assets: true,
            binary_updates: self.config.binary_updates,
        }
    }

    async fn before_sync(&self, kind: RunKind) -> Result<bool, TargetError> {
        fs::create_dir_all(&self.config.root_dir)
            .await
            .map_err(|source| TargetError::WriteFailed {
                path: self.config.root_dir.clone(),
                source,
            })?;
        self.reload_index().await?;
        debug!(kind = %kind, "File system target ready");
        Ok(true)
    }

    async fn before_generic_metadata_sync(&self) -> Result<bool, TargetError> {
        Ok(true)
    }

    async fn import_metadata(
        &self,
        category: MetadataCategory,
        mut elements: Vec<MetadataElement>,
    ) -> Result<Vec<MetadataElement>, TargetError> {
        let mut cache = self.metadata_cache.lock().await;
        if !cache.contains_key(&category) {
            let existing: Vec<MetadataElement> = read_json(&self.metadata_path(category))
                .await?
                .unwrap_or_default();
            let keys = existing
                .iter()
                .filter_map(|e| {
                    e.target_key()
                        .map(|t| (e.upstream_key().to_string(), t.to_string()))
                })
                .collect();
            cache.insert(category, keys);
        }

        let keys = cache.entry(category).or_default();
        for element in &mut elements {
            let target = keys
                .entry(element.upstream_key().to_string())
                .or_insert_with(new_uuid)
                .clone();
            element.assign_target_key(target).map_err(|e| {
                TargetError::rejected(format!("{} element", category), e.to_string())
            })?;
        }

        let path = self.metadata_path(category);
        let mut document: Vec<MetadataElement> = read_json(&path).await?.unwrap_or_default();
        merge_elements(&mut document, &elements);
        write_json(&path, &document).await?;
        debug!(
            category = %category,
            count = elements.len(),
            known = document.len(),
            "Imported metadata"
        );
        Ok(elements)
    }

    async fn after_generic_metadata_sync(&self) -> Result<bool, TargetError> {
        Ok(true)
    }

    async fn before_assets_sync(&self) -> Result<bool, TargetError> {
        Ok(true)
    }

    async fn import_new_assets(&self, assets: &[AssetRecord]) -> Result<(), TargetError> {
        self.store_assets(assets, false, false).await
    }

    async fn update_assets(&self, assets: &[AssetRecord]) -> Result<(), TargetError> {
        self.store_assets(assets, false, true).await
    }

    async fn import_new_compound_assets(&self, assets: &[AssetRecord]) -> Result<(), TargetError> {
        self.store_assets(assets, true, false).await
    }

    async fn update_compound_assets(&self, assets: &[AssetRecord]) -> Result<(), TargetError> {
        self.store_assets(assets, true, true).await
    }

    async fn target_asset_uuid(&self, transaction_id: &str) -> Result<Option<String>, TargetError> {
        Ok(self.index.lock().await.assets.get(transaction_id).cloned())
    }

    async fn target_binary_uuid(&self, binary_key: &str) -> Result<Option<String>, TargetError> {
        Ok(self.index.lock().await.binaries.get(binary_key).cloned())
    }

    async fn handle_authenticator_error(&self, error: &SyncError) {
        warn!("Sync stopped, re-authorization required: {}", error);
        self.record_error("authentication", error).await;
    }

    async fn handle_sync_job_error(&self, error: &SyncError) {
        warn!("Sync stopped: {}", error);
        self.record_error("sync_job", error).await;
    }

    async fn after_assets_sync(&self) -> Result<bool, TargetError> {
        Ok(true)
    }

    async fn after_sync(&self) -> Result<bool, TargetError> {
        Ok(true)
    }

    async fn clear_generic_metadata_caches(&self) {
        self.metadata_cache.lock().await.clear();
    }
}
