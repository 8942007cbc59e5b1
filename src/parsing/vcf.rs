//! VCF header and record field parsing for the streaming scanner.
//!
//! Header meta lines are inspected for the reference assembly:
//! `##reference=`, `##assembly=`, the `assembly` attribute of
//! `##contig=<...>` lines, and as a last resort the declared length of
//! chromosome 1, which differs between builds.
//!
//! Data lines are not parsed here wholesale. The scanner splits only the
//! first two columns of every line and hands matched lines to
//! [`RecordFields::parse`].

use crate::core::types::Assembly;
use crate::utils::validation::canonical_contig;

/// Length of chromosome 1 in `GRCh38`
pub const CHR1_LENGTH_GRCH38: u64 = 248_956_422;
/// Length of chromosome 1 in `GRCh37`
pub const CHR1_LENGTH_GRCH37: u64 = 249_250_621;

/// Minimum columns in a single-sample VCF data line
pub const MIN_DATA_COLUMNS: usize = 10;

/// A `##contig=<...>` header line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigLine {
    pub name: String,
    pub length: Option<u64>,
    pub assembly: Option<String>,
}

/// What the scanner learns from the header before the first record
#[derive(Debug, Clone, Default)]
pub struct VcfHeaderInfo {
    pub reference: Option<String>,
    pub declared_assembly: Option<String>,
    pub contigs: Vec<ContigLine>,
    /// Sample names from the `#CHROM` line
    pub samples: Vec<String>,
    /// Column index of `FORMAT`
    pub format_column: Option<usize>,
}

impl VcfHeaderInfo {
    /// Record a `##` meta line
    pub fn observe_meta_line(&mut self, line: &str) {
        if let Some(value) = line.strip_prefix("##reference=") {
            self.reference = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("##assembly=") {
            self.declared_assembly = Some(value.trim().to_string());
        } else if line.starts_with("##contig=") {
            if let Some(contig) = parse_contig_line(line) {
                self.contigs.push(contig);
            }
        }
    }

    /// Record the `#CHROM` column header line
    pub fn observe_column_header(&mut self, line: &str) {
        let columns: Vec<&str> = line.trim_start_matches('#').split('\t').collect();
        self.format_column = columns.iter().position(|c| *c == "FORMAT");
        self.samples = match self.format_column {
            Some(idx) => columns[idx + 1..].iter().map(|s| (*s).to_string()).collect(),
            None => Vec::new(),
        };
    }

    /// Column index holding the requested sample, or the first sample
    #[must_use]
    pub fn sample_column(&self, sample: Option<&str>) -> Option<usize> {
        let format = self.format_column?;
        match sample {
            Some(name) => self
                .samples
                .iter()
                .position(|s| s == name)
                .map(|i| format + 1 + i),
            None if self.samples.is_empty() => None,
            None => Some(format + 1),
        }
    }

    /// Best guess at the assembly the file was called against
    #[must_use]
    pub fn detected_assembly(&self) -> Option<Assembly> {
        if let Some(declared) = &self.declared_assembly {
            if let Some(a) = Assembly::detect_in(declared) {
                return Some(a);
            }
        }
        if let Some(reference) = &self.reference {
            if let Some(a) = Assembly::detect_in(reference) {
                return Some(a);
            }
        }
        for contig in &self.contigs {
            if let Some(a) = contig.assembly.as_deref().and_then(Assembly::detect_in) {
                return Some(a);
            }
        }
        self.contigs
            .iter()
            .find(|c| canonical_contig(&c.name) == "1")
            .and_then(|c| match c.length {
                Some(CHR1_LENGTH_GRCH38) => Some(Assembly::Grch38),
                Some(CHR1_LENGTH_GRCH37) => Some(Assembly::Grch37),
                _ => None,
            })
    }
}

/// Parse a single `##contig=<...>` line; `None` when it has no `ID`
#[must_use]
pub fn parse_contig_line(line: &str) -> Option<ContigLine> {
    // Format: ##contig=<ID=chr1,length=248956422,assembly=GRCh38,...>
    let content = line
        .strip_prefix("##contig=<")
        .and_then(|s| s.strip_suffix('>'))?;

    let mut name: Option<String> = None;
    let mut length: Option<u64> = None;
    let mut assembly: Option<String> = None;

    for part in split_contig_fields(content) {
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim().trim_matches('"');
            match key.trim().to_lowercase().as_str() {
                "id" => name = Some(value.to_string()),
                "length" => length = value.parse().ok(),
                "assembly" => assembly = Some(value.to_string()),
                _ => {}
            }
        }
    }

    name.map(|name| ContigLine {
        name,
        length,
        assembly,
    })
}

/// Split contig fields, handling commas inside quoted values.
///
/// UTF-8 safe: commas are single-byte, so `i + 1` after a comma is always a
/// character boundary.
fn split_contig_fields(content: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, c) in content.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(&content[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(&content[start..]);

    fields
}

/// Split off the first two columns (`CHROM`, `POS`) without touching the rest
#[must_use]
pub fn leading_columns(line: &str) -> Option<(&str, &str)> {
    let mut it = line.splitn(3, '\t');
    let contig = it.next()?;
    let pos = it.next()?;
    Some((contig, pos))
}

/// Columns of a matched data line needed to decode the sample's genotype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFields<'a> {
    pub reference: &'a str,
    pub alternates: Vec<&'a str>,
    pub genotype: Option<&'a str>,
}

impl<'a> RecordFields<'a> {
    /// Parse a full data line. `None` when the line is too short to contain
    /// the sample column.
    #[must_use]
    pub fn parse(line: &'a str, format_column: usize, sample_column: usize) -> Option<Self> {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < MIN_DATA_COLUMNS.max(sample_column + 1) {
            return None;
        }

        let reference = columns[3];
        // `.` in ALT means no alternate allele was observed
        let alternates = match columns[4] {
            "." | "" => Vec::new(),
            alt => alt.split(',').collect(),
        };
        let genotype = genotype_value(columns[format_column], columns[sample_column]);

        Some(Self {
            reference,
            alternates,
            genotype,
        })
    }
}

/// Pick the `GT` value out of a sample column using its `FORMAT` keys
#[must_use]
pub fn genotype_value<'a>(format: &str, sample: &'a str) -> Option<&'a str> {
    let gt_index = format.split(':').position(|key| key == "GT")?;
    sample.split(':').nth(gt_index)
}
