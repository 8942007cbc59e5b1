use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::core::types::EdgeCaseReason;

/// One normalized row of the curated variant catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Catalog category (parsed, or defaulted for short rows)
    pub category: String,

    /// Gene symbol
    pub gene: String,

    /// Variant identifier as written in the catalog (usually `rs<digits>`)
    pub variant_id: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// 1-based line number in the source file
    pub source_row_index: usize,

    /// True when the source row omitted the category column
    #[serde(default)]
    pub category_defaulted: bool,

    /// Set when the identifier is not a resolvable point variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_case: Option<EdgeCaseReason>,
}

impl CatalogEntry {
    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        self.edge_case.is_none()
    }
}

/// An identifier excluded from coordinate resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeCase {
    pub variant_id: String,
    pub reason: EdgeCaseReason,
}

/// Identifier → categories of every entry it appears in, for identifiers
/// that occur more than once
pub type DuplicateRecord = BTreeMap<String, Vec<String>>;

/// Result of normalizing one catalog file
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub entries: Vec<CatalogEntry>,
    pub duplicates: DuplicateRecord,
    pub edge_cases: Vec<EdgeCase>,
}

impl CatalogSnapshot {
    /// Unique identifiers eligible for resolution, in first-occurrence order
    #[must_use]
    pub fn resolvable_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| e.is_resolvable())
            .filter(|e| seen.insert(e.variant_id.as_str()))
            .map(|e| e.variant_id.clone())
            .collect()
    }

    #[must_use]
    pub fn is_duplicate(&self, variant_id: &str) -> bool {
        self.duplicates.contains_key(variant_id)
    }

    #[must_use]
    pub fn unique_id_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.variant_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(category: &str, id: &str, row: usize) -> CatalogEntry {
        CatalogEntry {
            category: category.to_string(),
            gene: "GENE".to_string(),
            variant_id: id.to_string(),
            description: String::new(),
            source_row_index: row,
            category_defaulted: false,
            edge_case: None,
        }
    }

    #[test]
    fn test_resolvable_ids_unique_in_order() {
        let mut tandem = entry("Neuro", "rs28363170", 3);
        tandem.edge_case = Some(EdgeCaseReason::TandemRepeat);

        let snapshot = CatalogSnapshot {
            entries: vec![
                entry("Neuro", "rs4680", 1),
                entry("Neuro", "rs6265", 2),
                tandem,
                entry("ADHD", "rs4680", 4),
            ],
            ..Default::default()
        };

        assert_eq!(snapshot.resolvable_ids(), vec!["rs4680", "rs6265"]);
        assert_eq!(snapshot.unique_id_count(), 3);
    }
}
