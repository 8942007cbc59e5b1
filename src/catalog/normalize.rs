//! Catalog normalization.
//!
//! Turns parsed rows into [`CatalogEntry`] values, fills in missing
//! categories, records identifiers that recur across entries, and flags
//! identifiers that cannot be resolved to a single coordinate.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::entry::{CatalogEntry, CatalogSnapshot, DuplicateRecord, EdgeCase};
use crate::core::types::EdgeCaseReason;
use crate::parsing::tsv::{self, ParseError, ParsedRow, RawRow};

/// Category used when a short row has nothing better to inherit
pub const FALLBACK_CATEGORY: &str = "Uncategorized";

/// Identifiers known to denote non-point variants even though they use the
/// `rs` naming scheme
pub const KNOWN_EDGE_CASES: &[(&str, EdgeCaseReason)] = &[
    // SLC6A3 (DAT1) 3' UTR 40 bp VNTR
    ("rs28363170", EdgeCaseReason::TandemRepeat),
    // IFNL4 TT/dG dinucleotide
    ("rs368234815", EdgeCaseReason::MultiNucleotide),
];

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog not found: {0}")]
    NotFound(String),

    #[error("Failed to read catalog: {0}")]
    Parse(#[from] ParseError),

    #[error("No valid rows in catalog")]
    Empty,
}

/// How a row without a category column gets one.
///
/// The right rule depends on how the catalog was assembled, so it is
/// configuration rather than a fixed behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryDefault {
    /// Inherit the nearest preceding explicit category, or `fallback` when
    /// the row comes before any explicit category
    NearestPrior { fallback: String },
    /// Always use this category
    Fixed(String),
}

impl Default for CategoryDefault {
    fn default() -> Self {
        Self::NearestPrior {
            fallback: FALLBACK_CATEGORY.to_string(),
        }
    }
}

/// Normalization output: the snapshot plus rows that were rejected
#[derive(Debug, Default)]
pub struct NormalizeOutput {
    pub snapshot: CatalogSnapshot,
    pub errors: Vec<ParseError>,
}

/// Normalizes catalog rows into entries
#[derive(Debug, Clone, Default)]
pub struct CatalogNormalizer {
    category_default: CategoryDefault,
    extra_edge_cases: HashMap<String, EdgeCaseReason>,
}

impl CatalogNormalizer {
    #[must_use]
    pub fn new(category_default: CategoryDefault) -> Self {
        Self {
            category_default,
            extra_edge_cases: HashMap::new(),
        }
    }

    /// Register an additional identifier to treat as an edge case
    #[must_use]
    pub fn with_edge_case(mut self, variant_id: impl Into<String>, reason: EdgeCaseReason) -> Self {
        self.extra_edge_cases.insert(variant_id.into(), reason);
        self
    }

    /// Normalize parsed rows. Pure function of its input.
    #[must_use]
    pub fn normalize(&self, rows: &[ParsedRow]) -> CatalogSnapshot {
        let mut entries = Vec::with_capacity(rows.len());
        let mut last_category: Option<&str> = None;

        for parsed in rows {
            let entry = match &parsed.row {
                RawRow::Full {
                    category,
                    gene,
                    variant_id,
                    description,
                } => {
                    last_category = Some(category.as_str());
                    CatalogEntry {
                        category: category.clone(),
                        gene: gene.clone(),
                        variant_id: variant_id.clone(),
                        description: description.clone(),
                        source_row_index: parsed.line_number,
                        category_defaulted: false,
                        edge_case: self.classify(variant_id),
                    }
                }
                RawRow::Short {
                    gene,
                    variant_id,
                    description,
                } => {
                    let category = self.default_category(last_category);
                    debug!(
                        row = parsed.line_number,
                        gene = %gene,
                        variant_id = %variant_id,
                        category = %category,
                        "Row missing category column, assigned default"
                    );
                    CatalogEntry {
                        category,
                        gene: gene.clone(),
                        variant_id: variant_id.clone(),
                        description: description.clone(),
                        source_row_index: parsed.line_number,
                        category_defaulted: true,
                        edge_case: self.classify(variant_id),
                    }
                }
            };
            entries.push(entry);
        }

        let duplicates = find_duplicates(&entries);
        let edge_cases = collect_edge_cases(&entries);

        CatalogSnapshot {
            entries,
            duplicates,
            edge_cases,
        }
    }

    /// Parse and normalize catalog text
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` on fatal parse failures (row limit).
    pub fn normalize_text(&self, text: &str) -> Result<NormalizeOutput, CatalogError> {
        let parsed = tsv::parse_catalog_text(text)?;
        for e in &parsed.errors {
            warn!("Skipping catalog row: {e}");
        }
        Ok(NormalizeOutput {
            snapshot: self.normalize(&parsed.rows),
            errors: parsed.errors,
        })
    }

    /// Load, parse and normalize a catalog file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the file does not exist,
    /// `CatalogError::Parse` if it cannot be read, and `CatalogError::Empty`
    /// if no row survives parsing.
    pub fn load(&self, path: &Path) -> Result<NormalizeOutput, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path).map_err(ParseError::from)?;
        let output = self.normalize_text(&text)?;
        if output.snapshot.entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        let snapshot = &output.snapshot;
        info!(
            entries = snapshot.entries.len(),
            unique = snapshot.unique_id_count(),
            duplicates = snapshot.duplicates.len(),
            edge_cases = snapshot.edge_cases.len(),
            rejected = output.errors.len(),
            "Normalized catalog {}",
            path.display()
        );
        Ok(output)
    }

    fn default_category(&self, last_category: Option<&str>) -> String {
        match &self.category_default {
            CategoryDefault::Fixed(name) => name.clone(),
            CategoryDefault::NearestPrior { fallback } => {
                last_category.unwrap_or(fallback).to_string()
            }
        }
    }

    /// Edge-case classification of an identifier, `None` for point variants
    #[must_use]
    pub fn classify(&self, variant_id: &str) -> Option<EdgeCaseReason> {
        if let Some(reason) = self.extra_edge_cases.get(variant_id) {
            return Some(*reason);
        }
        classify_identifier(variant_id)
    }
}

/// Classify an identifier by the built-in table and naming markers.
#[must_use]
pub fn classify_identifier(variant_id: &str) -> Option<EdgeCaseReason> {
    if let Some((_, reason)) = KNOWN_EDGE_CASES.iter().find(|(id, _)| *id == variant_id) {
        return Some(*reason);
    }

    let lower = variant_id.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has_word = |w: &str| words.contains(&w);
    // `del`, `del32`
    let has_del = words.iter().any(|w| {
        w.strip_prefix("del")
            .is_some_and(|rest| rest.bytes().all(|b| b.is_ascii_digit()))
    });

    if has_word("null") || has_word("deletion") || has_del || variant_id.contains('\u{394}') {
        return Some(EdgeCaseReason::StructuralDeletion);
    }
    if has_word("vntr")
        || has_word("str")
        || lower.contains("repeat")
        || is_repeat_notation(&lower)
    {
        return Some(EdgeCaseReason::TandemRepeat);
    }
    if has_word("mnv")
        || lower.contains("delins")
        || is_multibase_substitution(&lower)
        || lower.split('/').filter(|p| p.starts_with("rs")).count() > 1
    {
        return Some(EdgeCaseReason::MultiNucleotide);
    }
    None
}

/// `(ta)n`, `(cag)7`
fn is_repeat_notation(lower: &str) -> bool {
    lower.find('(').is_some_and(|open| {
        lower[open..].find(')').is_some_and(|close| {
            let unit = &lower[open + 1..open + close];
            let after = lower[open + close + 1..].chars().next();
            !unit.is_empty()
                && unit.chars().all(|c| "acgt".contains(c))
                && after.is_some_and(|c| c == 'n' || c.is_ascii_digit())
        })
    })
}

/// `tt>g`, `ag>ct`: a substitution where either side is longer than one base
fn is_multibase_substitution(lower: &str) -> bool {
    lower.split_once('>').is_some_and(|(left, right)| {
        let left = left.rsplit(|c: char| !"acgt".contains(c)).next().unwrap_or("");
        let right = right.split(|c: char| !"acgt".contains(c)).next().unwrap_or("");
        !left.is_empty() && !right.is_empty() && (left.len() > 1 || right.len() > 1)
    })
}

/// Identifiers occurring in more than one entry, with each occurrence's category
fn find_duplicates(entries: &[CatalogEntry]) -> DuplicateRecord {
    let mut by_id: HashMap<&str, Vec<String>> = HashMap::new();
    for entry in entries {
        by_id
            .entry(entry.variant_id.as_str())
            .or_default()
            .push(entry.category.clone());
    }
    by_id
        .into_iter()
        .filter(|(_, categories)| categories.len() > 1)
        .map(|(id, categories)| (id.to_string(), categories))
        .collect()
}

fn collect_edge_cases(entries: &[CatalogEntry]) -> Vec<EdgeCase> {
    let mut seen = std::collections::HashSet::new();
    entries
        .iter()
        .filter_map(|e| e.edge_case.map(|reason| (e, reason)))
        .filter(|(e, _)| seen.insert(e.variant_id.as_str()))
        .map(|(e, reason)| EdgeCase {
            variant_id: e.variant_id.clone(),
            reason,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "CYP2D6\trs3892097\tDrug metabolism\n\
                          CYP2C19\trs4244285\tSSRIs and clopidogrel\n\
                          Neurotransmitter\tCOMT\trs4680\tDopamine breakdown\n\
                          Neurotransmitter\tBDNF\trs6265\tNeuroplasticity\n\
                          SLC6A3\trs28363170\tDopamine transporter repeat\n\
                          ADHD\tCOMT\trs4680\tDopamine breakdown (ADHD)\n\
                          Gut Brain\tGSTM1\tNull\tDetox gene deletion\n";

    fn normalize(text: &str) -> NormalizeOutput {
        CatalogNormalizer::default().normalize_text(text).unwrap()
    }

    #[test]
    fn test_every_row_becomes_an_entry() {
        let out = normalize(SAMPLE);
        assert!(out.errors.is_empty());
        assert_eq!(out.snapshot.entries.len(), 7);
        for e in &out.snapshot.entries {
            assert!(!e.gene.is_empty());
            assert!(!e.variant_id.is_empty());
        }
    }

    #[test]
    fn test_short_row_default_category() {
        let out = normalize("COMT\trs4680\tdopamine clearance\n");
        let entry = &out.snapshot.entries[0];
        assert_eq!(entry.gene, "COMT");
        assert_eq!(entry.variant_id, "rs4680");
        assert_eq!(entry.category, FALLBACK_CATEGORY);
        assert!(entry.category_defaulted);
    }

    #[test]
    fn test_short_row_inherits_nearest_prior() {
        let out = normalize(SAMPLE);
        let dat1 = &out.snapshot.entries[4];
        assert_eq!(dat1.variant_id, "rs28363170");
        assert_eq!(dat1.category, "Neurotransmitter");

        // Leading short rows have no prior category
        assert_eq!(out.snapshot.entries[0].category, FALLBACK_CATEGORY);
    }

    #[test]
    fn test_fixed_category_policy() {
        let normalizer =
            CatalogNormalizer::new(CategoryDefault::Fixed("Pediatric Pharmacogenomics".into()));
        let out = normalizer.normalize_text(SAMPLE).unwrap();
        assert_eq!(out.snapshot.entries[0].category, "Pediatric Pharmacogenomics");
        assert_eq!(out.snapshot.entries[4].category, "Pediatric Pharmacogenomics");
        assert_eq!(out.snapshot.entries[2].category, "Neurotransmitter");
    }

    #[test]
    fn test_duplicates_keep_every_entry() {
        let out = normalize(SAMPLE);
        let comt: Vec<_> = out
            .snapshot
            .entries
            .iter()
            .filter(|e| e.variant_id == "rs4680")
            .collect();
        assert_eq!(comt.len(), 2);

        assert_eq!(
            out.snapshot.duplicates.get("rs4680"),
            Some(&vec!["Neurotransmitter".to_string(), "ADHD".to_string()])
        );
        assert!(!out.snapshot.is_duplicate("rs3892097"));
        assert_eq!(out.snapshot.duplicates.len(), 1);
    }

    #[test]
    fn test_edge_cases_flagged_and_excluded() {
        let out = normalize(SAMPLE);
        let snapshot = &out.snapshot;

        let reasons: Vec<_> = snapshot
            .edge_cases
            .iter()
            .map(|e| (e.variant_id.as_str(), e.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("rs28363170", EdgeCaseReason::TandemRepeat),
                ("Null", EdgeCaseReason::StructuralDeletion),
            ]
        );

        let resolvable = snapshot.resolvable_ids();
        assert!(!resolvable.contains(&"Null".to_string()));
        assert!(!resolvable.contains(&"rs28363170".to_string()));
        assert_eq!(resolvable.len(), 4);

        // Still present in the entry list with the marker
        let dat1 = snapshot
            .entries
            .iter()
            .find(|e| e.variant_id == "rs28363170")
            .unwrap();
        assert_eq!(
            dat1.edge_case.map(|r| r.to_string()).as_deref(),
            Some("structural/tandem-repeat, not a point variant")
        );
    }

    #[test]
    fn test_classify_markers() {
        assert_eq!(classify_identifier("rs4680"), None);
        assert_eq!(classify_identifier("i3003137"), None);
        assert_eq!(
            classify_identifier("GSTM1 null"),
            Some(EdgeCaseReason::StructuralDeletion)
        );
        assert_eq!(
            classify_identifier("CCR5-del32"),
            Some(EdgeCaseReason::StructuralDeletion)
        );
        assert_eq!(
            classify_identifier("5-HTTLPR VNTR"),
            Some(EdgeCaseReason::TandemRepeat)
        );
        assert_eq!(
            classify_identifier("UGT1A1 (TA)n"),
            Some(EdgeCaseReason::TandemRepeat)
        );
        assert_eq!(
            classify_identifier("TT>G"),
            Some(EdgeCaseReason::MultiNucleotide)
        );
        assert_eq!(classify_identifier("A>G"), None);
        assert_eq!(
            classify_identifier("rs1/rs2"),
            Some(EdgeCaseReason::MultiNucleotide)
        );
        assert_eq!(
            classify_identifier("rs368234815"),
            Some(EdgeCaseReason::MultiNucleotide)
        );
    }

    #[test]
    fn test_extra_edge_case() {
        let normalizer = CatalogNormalizer::default()
            .with_edge_case("rs1799971", EdgeCaseReason::MultiNucleotide);
        assert_eq!(
            normalizer.classify("rs1799971"),
            Some(EdgeCaseReason::MultiNucleotide)
        );
    }

    #[test]
    fn test_rejected_rows_reported_with_index() {
        let out = normalize("Neuro\tCOMT\trs4680\tok\nbroken\n");
        assert_eq!(out.snapshot.entries.len(), 1);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].row(), Some(2));
    }

    #[test]
    fn test_load_missing_file() {
        let result = CatalogNormalizer::default().load(Path::new("/nonexistent/catalog.tsv"));
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
    }
}
