use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::index::PositionIndex;
use crate::core::genotype::{decode_genotype, GenotypeCall};
use crate::core::position::ResolvedPosition;
use crate::core::types::{Assembly, Zygosity};
use crate::parsing::vcf::{leading_columns, RecordFields, VcfHeaderInfo};

/// gzip and BGZF both start with these bytes
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Standard VCF column positions, used when the file has no `#CHROM` line
const DEFAULT_FORMAT_COLUMN: usize = 8;
const DEFAULT_SAMPLE_COLUMN: usize = 9;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Variant file not found: {0}")]
    NotFound(String),

    #[error("Assembly mismatch: positions are on {expected} but the variant file is {found}")]
    AssemblyMismatch { expected: Assembly, found: Assembly },

    #[error("Sample '{0}' not found in the variant file header")]
    SampleNotFound(String),

    #[error("Variant file has no sample columns")]
    NoSamples,
}

/// Settings for [`VariantFileScanner`]
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Sample column to read; the first sample when `None`
    pub sample: Option<String>,
    /// Build the file must match; taken from the index when `None`
    pub expected_assembly: Option<Assembly>,
    /// Log progress every this many lines
    pub progress_every: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            sample: None,
            expected_assembly: None,
            progress_every: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub lines_read: u64,
    pub data_lines: u64,
    /// Data lines that could not be split or whose position did not parse
    pub malformed_lines: u64,
    /// Lines at an indexed coordinate
    pub matched_lines: u64,
    /// Further lines at an already matched coordinate; the first one wins
    pub repeated_lines: u64,
    pub found_in_file: usize,
    pub inferred_reference: usize,
    /// Genotype fields that could not be decoded
    pub undecodable: usize,
    /// Reading stopped before end of file because every target was found
    pub short_circuited: bool,
    #[serde(default)]
    pub detected_assembly: Option<Assembly>,
    #[serde(default)]
    pub sample: Option<String>,
}

/// Calls for every indexed identifier plus scan counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutput {
    /// One call per indexed identifier, in index order
    pub calls: Vec<GenotypeCall>,
    pub stats: ScanStats,
}

impl ScanOutput {
    #[must_use]
    pub fn call(&self, variant_id: &str) -> Option<&GenotypeCall> {
        self.calls.iter().find(|c| c.variant_id == variant_id)
    }
}

/// Single-pass genotype extraction from a single-sample VCF.
///
/// Only the first two columns of each data line are examined unless the
/// coordinate is indexed, and lines are read into one reused buffer, so
/// memory stays proportional to the index.
#[derive(Debug, Clone, Default)]
pub struct VariantFileScanner {
    config: ScanConfig,
}

impl VariantFileScanner {
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scan a plain or gzip/BGZF-compressed VCF.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::NotFound` if the file does not exist, and any
    /// error from [`scan`](Self::scan).
    pub fn scan_path(&self, path: &Path, index: &PositionIndex) -> Result<ScanOutput, ScanError> {
        if !path.exists() {
            return Err(ScanError::NotFound(path.display().to_string()));
        }
        info!("Scanning {}", path.display());
        let reader = open_variant_file(path)?;
        self.scan(reader, index)
    }

    /// Scan VCF text from `reader`.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::AssemblyMismatch` if the header names a build
    /// that conflicts with the configured build or with the build of any
    /// indexed coordinate, `ScanError::SampleNotFound` or
    /// `ScanError::NoSamples` if the sample column cannot be located, and
    /// `ScanError::Io` on read failures. Malformed data lines are counted,
    /// not fatal.
    pub fn scan<R: BufRead>(&self, mut reader: R, index: &PositionIndex) -> Result<ScanOutput, ScanError> {
        let mut stats = ScanStats::default();
        let mut header = VcfHeaderInfo::default();
        let mut columns: Option<(usize, usize)> = None;

        let mut matched = vec![false; index.bucket_count()];
        let mut remaining = index.bucket_count();
        let mut found: HashMap<String, GenotypeCall> = HashMap::with_capacity(index.len());
        let mut line = String::new();

        while remaining > 0 {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            stats.lines_read += 1;
            let text = line.trim_end_matches(['\n', '\r']);

            if text.starts_with("##") {
                header.observe_meta_line(text);
                continue;
            }
            if text.starts_with('#') {
                header.observe_column_header(text);
                columns = Some(self.header_complete(&header, index, &mut stats)?);
                continue;
            }
            if text.is_empty() {
                continue;
            }

            let (format_column, sample_column) = match columns {
                Some(c) => c,
                None => {
                    warn!("No #CHROM header line; assuming a single sample in column 10");
                    self.check_assembly(&header, index, &mut stats)?;
                    let c = (DEFAULT_FORMAT_COLUMN, DEFAULT_SAMPLE_COLUMN);
                    columns = Some(c);
                    c
                }
            };

            stats.data_lines += 1;
            if stats.lines_read % self.config.progress_every.max(1) == 0 {
                debug!(
                    lines = stats.lines_read,
                    remaining, "Scan progress"
                );
            }

            let Some((contig, pos)) = leading_columns(text) else {
                stats.malformed_lines += 1;
                continue;
            };
            let Ok(pos) = pos.parse::<u64>() else {
                stats.malformed_lines += 1;
                continue;
            };
            let Some(bucket) = index.bucket_at(contig, pos) else {
                continue;
            };
            if matched[bucket] {
                stats.repeated_lines += 1;
                continue;
            }
            let Some(fields) = RecordFields::parse(text, format_column, sample_column) else {
                stats.malformed_lines += 1;
                continue;
            };

            matched[bucket] = true;
            remaining -= 1;
            stats.matched_lines += 1;

            for variant_id in index.bucket_ids(bucket) {
                if let Some(position) = index.get(variant_id) {
                    let call = decode_call(position, &fields, &mut stats);
                    found.insert(variant_id.clone(), call);
                }
            }
        }

        if remaining == 0 && index.bucket_count() > 0 {
            stats.short_circuited = true;
            debug!(lines = stats.lines_read, "All target positions found; stopping early");
        }

        let mut calls = Vec::with_capacity(index.len());
        for position in index.positions() {
            match found.remove(&position.variant_id) {
                Some(call) => {
                    stats.found_in_file += 1;
                    calls.push(call);
                }
                None => {
                    stats.inferred_reference += 1;
                    calls.push(GenotypeCall::inferred_reference(position));
                }
            }
        }

        info!(
            lines = stats.lines_read,
            found = stats.found_in_file,
            inferred = stats.inferred_reference,
            malformed = stats.malformed_lines,
            "Scan complete"
        );
        Ok(ScanOutput { calls, stats })
    }

    /// Validate the finished header and locate the `FORMAT` and sample columns
    fn header_complete(
        &self,
        header: &VcfHeaderInfo,
        index: &PositionIndex,
        stats: &mut ScanStats,
    ) -> Result<(usize, usize), ScanError> {
        self.check_assembly(header, index, stats)?;

        let format_column = header.format_column.ok_or(ScanError::NoSamples)?;
        let sample = self.config.sample.as_deref();
        let sample_column = header.sample_column(sample).ok_or_else(|| match sample {
            Some(name) => ScanError::SampleNotFound(name.to_string()),
            None => ScanError::NoSamples,
        })?;

        let name = header.samples[sample_column - format_column - 1].clone();
        if sample.is_none() && header.samples.len() > 1 {
            warn!("Multi-sample file; reading the first sample ({name})");
        }
        stats.sample = Some(name);
        Ok((format_column, sample_column))
    }

    fn check_assembly(
        &self,
        header: &VcfHeaderInfo,
        index: &PositionIndex,
        stats: &mut ScanStats,
    ) -> Result<(), ScanError> {
        let detected = header.detected_assembly();

        match &detected {
            Some(found) => {
                // Every build a target coordinate was expressed in must agree
                let conflicting = self
                    .config
                    .expected_assembly
                    .iter()
                    .chain(index.assemblies())
                    .find(|expected| expected.conflicts_with(found));
                if let Some(expected) = conflicting {
                    return Err(ScanError::AssemblyMismatch {
                        expected: expected.clone(),
                        found: found.clone(),
                    });
                }
                debug!("Variant file assembly: {found}");
            }
            None => debug!("Variant file assembly could not be determined from its header"),
        }

        stats.detected_assembly = detected;
        Ok(())
    }
}

/// Decode the sample's genotype on a matched line into a call for `position`
fn decode_call(
    position: &ResolvedPosition,
    fields: &RecordFields<'_>,
    stats: &mut ScanStats,
) -> GenotypeCall {
    let variant_id = position.variant_id.as_str();
    let raw = fields.genotype.unwrap_or(".");

    if fields.reference != position.reference_allele {
        debug!(
            variant_id,
            "File REF {} differs from resolved reference {}", fields.reference, position.reference_allele
        );
    }

    let (observed_alleles, zygosity) =
        match decode_genotype(raw, fields.reference, &fields.alternates) {
            Ok(decoded) => (decoded.alleles, decoded.zygosity),
            Err(e) => {
                warn!(variant_id, "Undecodable genotype '{raw}': {e}");
                stats.undecodable += 1;
                (Vec::new(), Zygosity::NoCall)
            }
        };

    GenotypeCall {
        variant_id: position.variant_id.clone(),
        contig: position.contig.clone(),
        position: position.position,
        reference_allele: fields.reference.to_string(),
        alternate_alleles: fields.alternates.iter().map(|a| (*a).to_string()).collect(),
        observed_alleles,
        zygosity,
        raw_genotype_field: raw.to_string(),
        found_in_file: true,
    }
}

/// Open a VCF, transparently decompressing gzip/BGZF input
///
/// # Errors
///
/// Returns an IO error if the file cannot be opened or read.
pub fn open_variant_file(path: &Path) -> Result<Box<dyn BufRead>, ScanError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let gzipped = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

    if gzipped {
        debug!("{} is gzip-compressed", path.display());
        // BGZF is a series of gzip members
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}
