//! Per-entry result rows handed to downstream interpretation and report
//! generation, plus the run summary.
//!
//! Every catalog entry yields exactly one [`ReportRow`]. Entries that share
//! an identifier (duplicates) share the same genotype data.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::core::entry::CatalogSnapshot;
use crate::core::genotype::GenotypeCall;
use crate::core::position::Resolution;
use crate::core::types::Zygosity;
use crate::locate::LocatorStats;
use crate::scan::ScanOutput;

/// One catalog entry with its genotype
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub category: String,
    pub gene: String,
    pub variant_id: String,
    pub description: String,
    /// `AG`, `A/AT`, or `N/A`
    pub genotype: String,
    pub zygosity: Option<Zygosity>,
    pub contig: Option<String>,
    pub position: Option<u64>,
    pub reference_allele: Option<String>,
    pub alternate_alleles: Vec<String>,
    pub found_in_file: bool,
    pub is_duplicate: bool,
    /// Why there is no genotype, when there is none
    pub resolvability_reason: Option<String>,
}

/// Counts describing one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub entries: usize,
    pub parse_errors: usize,
    pub unique_ids: usize,
    pub duplicate_ids: usize,
    pub edge_cases: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub cache_hits: usize,
    pub network_lookups: usize,
    pub lines_read: u64,
    pub malformed_lines: u64,
    pub found_in_file: usize,
    pub inferred_reference: usize,
    pub undecodable: usize,
    /// Scan results came from a saved artifact instead of a new pass
    pub scan_reused: bool,
}

impl RunSummary {
    #[must_use]
    pub fn new(
        snapshot: &CatalogSnapshot,
        parse_errors: usize,
        locator: &LocatorStats,
        scan: Option<&ScanOutput>,
        scan_reused: bool,
    ) -> Self {
        let mut summary = Self {
            entries: snapshot.entries.len(),
            parse_errors,
            unique_ids: snapshot.unique_id_count(),
            duplicate_ids: snapshot.duplicates.len(),
            edge_cases: snapshot.edge_cases.len(),
            resolved: locator.resolved,
            unresolved: locator.unresolved,
            cache_hits: locator.cache_hits,
            network_lookups: locator.network_lookups,
            scan_reused,
            ..Self::default()
        };
        if let Some(scan) = scan {
            summary.lines_read = scan.stats.lines_read;
            summary.malformed_lines = scan.stats.malformed_lines;
            summary.found_in_file = scan.stats.found_in_file;
            summary.inferred_reference = scan.stats.inferred_reference;
            summary.undecodable = scan.stats.undecodable;
        }
        summary
    }
}

/// Build one row per catalog entry.
///
/// `scan` is `None` when no variant file was given; resolved entries then
/// carry their coordinate but no genotype.
#[must_use]
pub fn build_report_rows(
    snapshot: &CatalogSnapshot,
    resolutions: &BTreeMap<String, Resolution>,
    scan: Option<&ScanOutput>,
) -> Vec<ReportRow> {
    let calls: HashMap<&str, &GenotypeCall> = scan
        .map(|s| s.calls.iter().map(|c| (c.variant_id.as_str(), c)).collect())
        .unwrap_or_default();

    snapshot
        .entries
        .iter()
        .map(|entry| {
            let mut row = ReportRow {
                category: entry.category.clone(),
                gene: entry.gene.clone(),
                variant_id: entry.variant_id.clone(),
                description: entry.description.clone(),
                genotype: "N/A".to_string(),
                zygosity: None,
                contig: None,
                position: None,
                reference_allele: None,
                alternate_alleles: Vec::new(),
                found_in_file: false,
                is_duplicate: snapshot.is_duplicate(&entry.variant_id),
                resolvability_reason: None,
            };

            if let Some(reason) = entry.edge_case {
                row.resolvability_reason = Some(reason.to_string());
                return row;
            }

            match resolutions.get(&entry.variant_id) {
                Some(Resolution::Resolved(position)) => {
                    row.contig = Some(position.contig.clone());
                    row.position = Some(position.position);
                    row.reference_allele = Some(position.reference_allele.clone());
                    row.alternate_alleles.clone_from(&position.alternate_alleles);
                }
                Some(Resolution::Unresolved(unresolved)) => {
                    row.resolvability_reason = Some(unresolved.reason.to_string());
                    return row;
                }
                None => {
                    row.resolvability_reason = Some("not resolved".to_string());
                    return row;
                }
            }

            match calls.get(entry.variant_id.as_str()) {
                Some(call) => {
                    row.genotype = call.genotype_string();
                    row.zygosity = Some(call.zygosity);
                    row.reference_allele = Some(call.reference_allele.clone());
                    row.alternate_alleles.clone_from(&call.alternate_alleles);
                    row.found_in_file = call.found_in_file;
                }
                None if scan.is_some() => {
                    row.resolvability_reason = Some("not scanned".to_string());
                }
                None => {}
            }
            row
        })
        .collect()
}

const TSV_HEADER: &str = "category\tgene\tvariant_id\tdescription\tgenotype\tzygosity\tcontig\tposition\treference_allele\talternate_alleles\tfound_in_file\tis_duplicate\tresolvability_reason";

/// Write rows as TSV with a header line.
///
/// # Errors
///
/// Returns an IO error if writing fails.
pub fn write_tsv<W: Write>(out: &mut W, rows: &[ReportRow]) -> std::io::Result<()> {
    writeln!(out, "{TSV_HEADER}")?;
    for row in rows {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.category,
            row.gene,
            row.variant_id,
            row.description,
            row.genotype,
            row.zygosity.map(|z| z.to_string()).unwrap_or_default(),
            row.contig.as_deref().unwrap_or_default(),
            row.position.map(|p| p.to_string()).unwrap_or_default(),
            row.reference_allele.as_deref().unwrap_or_default(),
            row.alternate_alleles.join(","),
            row.found_in_file,
            row.is_duplicate,
            row.resolvability_reason.as_deref().unwrap_or_default(),
        )?;
    }
    Ok(())
}

/// Write the summary and rows as one JSON document.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(
    out: &mut W,
    summary: &RunSummary,
    rows: &[ReportRow],
) -> serde_json::Result<()> {
    let document = serde_json::json!({
        "summary": summary,
        "rows": rows,
    });
    serde_json::to_writer_pretty(&mut *out, &document)?;
    writeln!(out).map_err(serde_json::Error::io)
}

/// Human-readable listing grouped by category.
///
/// # Errors
///
/// Returns an IO error if writing fails.
pub fn write_text<W: Write>(out: &mut W, summary: &RunSummary, rows: &[ReportRow]) -> std::io::Result<()> {
    let mut current_category: Option<&str> = None;
    for row in rows {
        if current_category != Some(row.category.as_str()) {
            writeln!(out, "\n{}", row.category)?;
            writeln!(out, "{}", "─".repeat(60))?;
            current_category = Some(row.category.as_str());
        }

        let duplicate = if row.is_duplicate { " [dup]" } else { "" };
        match (&row.zygosity, &row.resolvability_reason) {
            (Some(zygosity), _) => {
                let source = if row.found_in_file { "" } else { " (inferred)" };
                writeln!(
                    out,
                    "  {:<10} {:<12} {:<6} {}{}{}",
                    row.gene, row.variant_id, row.genotype, zygosity, source, duplicate
                )?;
            }
            (None, Some(reason)) => {
                writeln!(
                    out,
                    "  {:<10} {:<12} -      {}{}",
                    row.gene, row.variant_id, reason, duplicate
                )?;
            }
            (None, None) => {
                let locus = match (&row.contig, row.position) {
                    (Some(contig), Some(position)) => format!("{contig}:{position}"),
                    _ => "-".to_string(),
                };
                writeln!(
                    out,
                    "  {:<10} {:<12} {}{}",
                    row.gene, row.variant_id, locus, duplicate
                )?;
            }
        }
    }

    writeln!(out, "\n{}", "─".repeat(60))?;
    writeln!(
        out,
        "Entries: {} ({} unique, {} duplicated, {} edge cases, {} rows rejected)",
        summary.entries,
        summary.unique_ids,
        summary.duplicate_ids,
        summary.edge_cases,
        summary.parse_errors
    )?;
    writeln!(
        out,
        "Resolved: {} ({} unresolved; {} from cache, {} looked up)",
        summary.resolved, summary.unresolved, summary.cache_hits, summary.network_lookups
    )?;
    if summary.lines_read > 0 || summary.found_in_file + summary.inferred_reference > 0 {
        let reused = if summary.scan_reused { " [saved scan]" } else { "" };
        writeln!(
            out,
            "Scan: {} lines, {} malformed; {} found, {} inferred reference, {} undecodable{}",
            summary.lines_read,
            summary.malformed_lines,
            summary.found_in_file,
            summary.inferred_reference,
            summary.undecodable,
            reused
        )?;
    }
    Ok(())
}
