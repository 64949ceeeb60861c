//! Generic metadata vocabulary types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Locale code to localized value.
pub type LocalizedText = BTreeMap<String, String>;

/// Categories of vocabulary the upstream exposes and the target imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataCategory {
    ContentProviders,
    ContentTypes,
    BinaryTypes,
    ContentCategories,
    LicenseTypes,
    ReleaseStates,
    LicenseExclusivities,
    LicenseUsages,
    LicenseSizes,
    LicensePlacements,
    LicenseDistributions,
    LicenseGeographies,
    LicenseIndustries,
    LicenseLanguages,
    LicenseUsageLimits,
}

impl MetadataCategory {
    /// Every category, in the order the metadata phase imports them.
    pub const ALL: [MetadataCategory; 15] = [
        MetadataCategory::ContentProviders,
        MetadataCategory::ContentTypes,
        MetadataCategory::BinaryTypes,
        MetadataCategory::ContentCategories,
        MetadataCategory::LicenseTypes,
        MetadataCategory::ReleaseStates,
        MetadataCategory::LicenseExclusivities,
        MetadataCategory::LicenseUsages,
        MetadataCategory::LicenseSizes,
        MetadataCategory::LicensePlacements,
        MetadataCategory::LicenseDistributions,
        MetadataCategory::LicenseGeographies,
        MetadataCategory::LicenseIndustries,
        MetadataCategory::LicenseLanguages,
        MetadataCategory::LicenseUsageLimits,
    ];

    /// Path segment / label used for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataCategory::ContentProviders => "content_providers",
            MetadataCategory::ContentTypes => "content_types",
            MetadataCategory::BinaryTypes => "binary_types",
            MetadataCategory::ContentCategories => "content_categories",
            MetadataCategory::LicenseTypes => "license_types",
            MetadataCategory::ReleaseStates => "release_states",
            MetadataCategory::LicenseExclusivities => "license_exclusivities",
            MetadataCategory::LicenseUsages => "license_usages",
            MetadataCategory::LicenseSizes => "license_sizes",
            MetadataCategory::LicensePlacements => "license_placements",
            MetadataCategory::LicenseDistributions => "license_distributions",
            MetadataCategory::LicenseGeographies => "license_geographies",
            MetadataCategory::LicenseIndustries => "license_industries",
            MetadataCategory::LicenseLanguages => "license_languages",
            MetadataCategory::LicenseUsageLimits => "license_usage_limits",
        }
    }
}

impl fmt::Display for MetadataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a target key would be assigned twice.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("target key already assigned for {upstream_key}: {existing}")]
pub struct TargetKeyAlreadySet {
    pub upstream_key: String,
    pub existing: String,
}

/// A cacheable vocabulary entry.
///
/// The upstream key never changes. The target key is assigned once, after the
/// target has imported the element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataElement {
    upstream_key: String,
    target_key: Option<String>,
    /// Display values by locale.
    pub values: LocalizedText,
}

impl MetadataElement {
    pub fn new(upstream_key: impl Into<String>) -> Self {
        Self {
            upstream_key: upstream_key.into(),
            target_key: None,
            values: LocalizedText::new(),
        }
    }

    pub fn with_value(mut self, locale: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(locale.into(), value.into());
        self
    }

    pub fn upstream_key(&self) -> &str {
        &self.upstream_key
    }

    pub fn target_key(&self) -> Option<&str> {
        self.target_key.as_deref()
    }

    /// Assign the target key. Fails if one is already set to a different value.
    pub fn assign_target_key(&mut self, key: impl Into<String>) -> Result<(), TargetKeyAlreadySet> {
        let key = key.into();
        match &self.target_key {
            Some(existing) if *existing != key => Err(TargetKeyAlreadySet {
                upstream_key: self.upstream_key.clone(),
                existing: existing.clone(),
            }),
            _ => {
                self.target_key = Some(key);
                Ok(())
            }
        }
    }
}
