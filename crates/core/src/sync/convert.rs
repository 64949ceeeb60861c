//! Upstream purchase records to target asset records.

use crate::mapper::MetadataIdMapper;
use crate::model::{
    AssetRecord, BinaryRecord, LicenseTerms, LocalizedText, MappedKey, MetadataCategory,
    ReleaseDetails,
};
use crate::target::SyncTargetCapabilities;
use crate::upstream::{PurchaseTransaction, UpstreamBinary};

use super::error::ContractViolation;

/// Resolves classification keys and filters localized text to the run's locales.
pub(crate) struct RecordBuilder<'a> {
    mapper: &'a MetadataIdMapper,
    locales: &'a [String],
}

impl<'a> RecordBuilder<'a> {
    pub(crate) fn new(mapper: &'a MetadataIdMapper, locales: &'a [String]) -> Self {
        Self { mapper, locales }
    }

    fn key(&self, category: MetadataCategory, upstream: &str) -> MappedKey {
        MappedKey::new(
            upstream,
            self.mapper.get(category, upstream).map(str::to_string),
        )
    }

    fn keys(&self, category: MetadataCategory, upstream: &[String]) -> Vec<MappedKey> {
        upstream.iter().map(|k| self.key(category, k)).collect()
    }

    fn optional_key(&self, category: MetadataCategory, upstream: &Option<String>) -> Option<MappedKey> {
        upstream.as_deref().map(|k| self.key(category, k))
    }

    fn localized(&self, text: &LocalizedText) -> LocalizedText {
        text.iter()
            .filter(|(locale, _)| self.locales.contains(*locale))
            .map(|(locale, value)| (locale.clone(), value.clone()))
            .collect()
    }

    fn binary(&self, transaction_id: &str, binary: &UpstreamBinary) -> BinaryRecord {
        BinaryRecord {
            binary_id: binary.binary_id.clone(),
            transaction_id: transaction_id.to_string(),
            content_type: binary.content_type.clone(),
            binary_type: self.optional_key(MetadataCategory::BinaryTypes, &binary.binary_type),
            version: binary.version,
            locator: binary.download_url.clone(),
            usage_text: self.localized(&binary.usage_text),
        }
    }

    pub(crate) fn build(&self, tx: &PurchaseTransaction) -> AssetRecord {
        let mut record = AssetRecord::new(
            &tx.asset_id,
            &tx.transaction_id,
            self.key(MetadataCategory::ContentTypes, &tx.content_type),
        );

        record.categories = self.keys(MetadataCategory::ContentCategories, &tx.categories);
        record.provider = self.optional_key(MetadataCategory::ContentProviders, &tx.provider);
        record.name = self.localized(&tx.name);
        record.description = self.localized(&tx.description);
        record.keywords = tx
            .keywords
            .iter()
            .filter(|(locale, _)| self.locales.contains(*locale))
            .map(|(locale, words)| (locale.clone(), words.clone()))
            .collect();

        let license = &tx.license;
        record.license = LicenseTerms {
            license_type: self.optional_key(MetadataCategory::LicenseTypes, &license.license_type),
            exclusivity: self
                .optional_key(MetadataCategory::LicenseExclusivities, &license.exclusivity),
            usages: self.keys(MetadataCategory::LicenseUsages, &license.usages),
            sizes: self.keys(MetadataCategory::LicenseSizes, &license.sizes),
            placements: self.keys(MetadataCategory::LicensePlacements, &license.placements),
            distributions: self.keys(MetadataCategory::LicenseDistributions, &license.distributions),
            geographies: self.keys(MetadataCategory::LicenseGeographies, &license.geographies),
            industries: self.keys(MetadataCategory::LicenseIndustries, &license.industries),
            languages: self.keys(MetadataCategory::LicenseLanguages, &license.languages),
            usage_limit: self
                .optional_key(MetadataCategory::LicenseUsageLimits, &license.usage_limit),
            starts_at: license.starts_at,
            expires_at: license.expires_at,
        };

        record.release = ReleaseDetails {
            state: self.optional_key(MetadataCategory::ReleaseStates, &tx.release.state),
            released_at: tx.release.released_at,
            notes: self.localized(&tx.release.notes),
        };

        record.binaries = tx
            .binaries
            .iter()
            .map(|b| self.binary(&tx.transaction_id, b))
            .collect();

        // An explicit flag wins; otherwise several binaries make a compound asset.
        record.set_compound(tx.compound.unwrap_or(tx.binaries.len() > 1));
        record
    }
}

/// Check one record against what the target accepts.
pub(crate) fn check_capabilities(
    record: &AssetRecord,
    capabilities: &SyncTargetCapabilities,
) -> Result<(), ContractViolation> {
    if !capabilities.compound_assets && record.binaries.len() > 1 {
        return Err(ContractViolation::CompoundNotSupported {
            transaction_id: record.transaction_id.clone(),
            binaries: record.binaries.len(),
        });
    }

    if !capabilities.binary_updates {
        if let Some(binary) = record.binaries.iter().find(|b| b.version > 1) {
            return Err(ContractViolation::BinaryUpdateNotSupported {
                transaction_id: record.transaction_id.clone(),
                binary_id: binary.binary_id.clone(),
                version: binary.version,
            });
        }
    }

    Ok(())
}
