//! Asset and binary records handed to the target.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::LocalizedText;

/// An upstream classification key, plus the target key when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedKey {
    pub upstream: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl MappedKey {
    pub fn new(upstream: impl Into<String>, target: Option<String>) -> Self {
        Self {
            upstream: upstream.into(),
            target,
        }
    }

    /// Whether the target key was resolved.
    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

/// License terms attached to a purchase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseTerms {
    pub license_type: Option<MappedKey>,
    pub exclusivity: Option<MappedKey>,
    #[serde(default)]
    pub usages: Vec<MappedKey>,
    #[serde(default)]
    pub sizes: Vec<MappedKey>,
    #[serde(default)]
    pub placements: Vec<MappedKey>,
    #[serde(default)]
    pub distributions: Vec<MappedKey>,
    #[serde(default)]
    pub geographies: Vec<MappedKey>,
    #[serde(default)]
    pub industries: Vec<MappedKey>,
    #[serde(default)]
    pub languages: Vec<MappedKey>,
    pub usage_limit: Option<MappedKey>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Release details of a purchased item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDetails {
    pub state: Option<MappedKey>,
    pub released_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: LocalizedText,
}

/// One deliverable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryRecord {
    /// Unique only together with `transaction_id`.
    pub binary_id: String,
    pub transaction_id: String,
    pub content_type: String,
    pub binary_type: Option<MappedKey>,
    /// Incremented upstream whenever the file is replaced.
    pub version: u32,
    pub locator: String,
    #[serde(default)]
    pub usage_text: LocalizedText,
}

impl BinaryRecord {
    /// Identity key used for target-side mapping.
    pub fn key(&self) -> String {
        binary_key(&self.transaction_id, &self.binary_id)
    }
}

/// Build the `transaction:binary` identity key.
pub fn binary_key(transaction_id: &str, binary_id: &str) -> String {
    format!("{}:{}", transaction_id, binary_id)
}

/// One purchased content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Stable upstream identifier of the content.
    pub asset_id: String,
    /// Effective primary key: the same content can be purchased more than once.
    pub transaction_id: String,
    pub content_type: MappedKey,
    #[serde(default)]
    pub categories: Vec<MappedKey>,
    pub provider: Option<MappedKey>,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub license: LicenseTerms,
    #[serde(default)]
    pub release: ReleaseDetails,
    #[serde(default)]
    pub binaries: Vec<BinaryRecord>,
    #[serde(default)]
    compound: bool,
}

impl AssetRecord {
    /// Create a simple (non compound) asset with no binaries yet.
    pub fn new(
        asset_id: impl Into<String>,
        transaction_id: impl Into<String>,
        content_type: MappedKey,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            transaction_id: transaction_id.into(),
            content_type,
            categories: Vec::new(),
            provider: None,
            name: LocalizedText::new(),
            description: LocalizedText::new(),
            keywords: BTreeMap::new(),
            license: LicenseTerms::default(),
            release: ReleaseDetails::default(),
            binaries: Vec::new(),
            compound: false,
        }
    }

    /// Mark the asset as compound (the flag only counts when binaries exist).
    pub fn set_compound(&mut self, compound: bool) {
        self.compound = compound;
    }

    /// Compound assets bundle binary variants under one transaction.
    pub fn is_compound(&self) -> bool {
        !self.binaries.is_empty() && self.compound
    }

    /// The highest binary version carried by this asset.
    pub fn max_binary_version(&self) -> Option<u32> {
        self.binaries.iter().map(|b| b.version).max()
    }
}
