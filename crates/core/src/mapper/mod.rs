//! Upstream-to-target metadata key mapping.
//!
//! The mapper is filled during the metadata phase of a run and cleared when the
//! run ends. Lookups are one-way: upstream key to target key.

use std::collections::HashMap;

use thiserror::Error;

use crate::model::{MetadataCategory, MetadataElement};

/// Errors from recording mappings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapperError {
    /// The target returned an element without a target key.
    #[error("{category} element '{upstream_key}' has no target key")]
    MissingTargetKey {
        category: MetadataCategory,
        upstream_key: String,
    },
}

/// Per-category cache of upstream key to target key.
#[derive(Debug, Default)]
pub struct MetadataIdMapper {
    mappings: HashMap<MetadataCategory, HashMap<String, String>>,
}

impl MetadataIdMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.mappings.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.values().all(HashMap::is_empty)
    }

    /// Total number of mappings across all categories.
    pub fn len(&self) -> usize {
        self.mappings.values().map(HashMap::len).sum()
    }

    /// Record the target keys of `elements`.
    ///
    /// The whole batch is checked first; if any element lacks a target key
    /// nothing is recorded. Existing mappings for the same upstream key are
    /// overwritten.
    pub fn add_mapping(
        &mut self,
        category: MetadataCategory,
        elements: &[MetadataElement],
    ) -> Result<(), MapperError> {
        if let Some(missing) = elements.iter().find(|e| e.target_key().is_none()) {
            return Err(MapperError::MissingTargetKey {
                category,
                upstream_key: missing.upstream_key().to_string(),
            });
        }

        let entries = self.mappings.entry(category).or_default();
        for element in elements {
            if let Some(target) = element.target_key() {
                entries.insert(element.upstream_key().to_string(), target.to_string());
            }
        }
        Ok(())
    }

    pub fn get(&self, category: MetadataCategory, upstream_key: &str) -> Option<&str> {
        self.mappings
            .get(&category)
            .and_then(|entries| entries.get(upstream_key))
            .map(String::as_str)
    }
}
