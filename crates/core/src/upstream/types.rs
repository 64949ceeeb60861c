//! Wire types returned by the upstream marketplace.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ContinuationToken, LocalizedText};

/// One vocabulary value in the requested locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A chunk of purchase transactions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPage {
    #[serde(default)]
    pub items: Vec<PurchaseTransaction>,
    /// Cursor for the next chunk.
    #[serde(default)]
    pub continuation: Option<ContinuationToken>,
}

/// License terms as sent by the upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamLicense {
    #[serde(default)]
    pub license_type: Option<String>,
    #[serde(default)]
    pub exclusivity: Option<String>,
    #[serde(default)]
    pub usages: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub placements: Vec<String>,
    #[serde(default)]
    pub distributions: Vec<String>,
    #[serde(default)]
    pub geographies: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub usage_limit: Option<String>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Release details as sent by the upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamRelease {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub released_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: LocalizedText,
}

/// A downloadable file attached to a purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamBinary {
    pub binary_id: String,
    pub content_type: String,
    #[serde(default)]
    pub binary_type: Option<String>,
    #[serde(default)]
    pub version: u32,
    pub download_url: String,
    #[serde(default)]
    pub usage_text: LocalizedText,
}

/// One purchase of a content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseTransaction {
    pub transaction_id: String,
    pub asset_id: String,
    pub content_type: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub license: UpstreamLicense,
    #[serde(default)]
    pub release: UpstreamRelease,
    /// Only meaningful when explicitly set.
    #[serde(default)]
    pub compound: Option<bool>,
    #[serde(default)]
    pub binaries: Vec<UpstreamBinary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transaction_page() {
        let json = r#"{
            "items": [{
                "transactionId": "tx-1",
                "assetId": "a-1",
                "contentType": "photo",
                "categories": ["nature"],
                "name": {"en": "Lake", "de": "See"},
                "license": {"licenseType": "standard", "usages": ["web"]},
                "binaries": [{
                    "binaryId": "b-1",
                    "contentType": "image/jpeg",
                    "version": 2,
                    "downloadUrl": "https://cdn.example.com/b-1"
                }]
            }],
            "continuation": "cursor-2"
        }"#;

        let page: TransactionPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.continuation.as_ref().unwrap().as_str(), "cursor-2");

        let tx = &page.items[0];
        assert_eq!(tx.name.get("de").map(String::as_str), Some("See"));
        assert_eq!(tx.license.license_type.as_deref(), Some("standard"));
        assert!(tx.compound.is_none());
        assert_eq!(tx.binaries[0].version, 2);
    }

    #[test]
    fn test_parse_empty_page() {
        let page: TransactionPage = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());
        assert!(page.continuation.is_none());
    }
}
