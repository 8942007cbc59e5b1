//! # snp-resolver
//!
//! A library for extracting genotypes for a curated catalog of dbSNP
//! identifiers from a personal VCF.
//!
//! Variant catalogs are usually hand-maintained spreadsheets: rows drift in
//! shape, the same rsID sits under several categories, and a few entries are
//! not point variants at all. Variant-only VCFs, meanwhile, omit every
//! position where the sample matches the reference.
//!
//! `snp-resolver` normalizes the catalog, resolves each identifier to a
//! coordinate through NCBI Variation Services, and reads the VCF once to
//! produce one genotype call per resolved identifier.
//!
//! ## Features
//!
//! - **Catalog normalization**: variable-column rows, duplicate tracking and
//!   edge-case flagging (deletions, tandem repeats, multi-nucleotide variants)
//! - **Cached resolution**: a persistent position cache, rate-limited and
//!   retried lookups, resumable after interruption
//! - **Single-pass scan**: plain or gzip input, assembly check, early stop
//!   once every target is seen, homozygous-reference inference for absent
//!   positions
//!
//! ## Example
//!
//! ```rust,no_run
//! use snp_resolver::pipeline::{Pipeline, PipelineConfig};
//! use snp_resolver::locate::ClientConfig;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = PipelineConfig {
//!     catalog: "snps.tsv".into(),
//!     vcf: Some("sample.vcf.gz".into()),
//!     ..PipelineConfig::default()
//! };
//! let pipeline = Pipeline::with_ncbi(config, ClientConfig::default())?;
//! let output = pipeline.run().await?;
//!
//! for row in &output.rows {
//!     println!("{}\t{}\t{}", row.variant_id, row.genotype, row.category);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`catalog`]: Catalog normalization, position index and persistent stores
//! - [`core`]: Core data types for entries, positions and genotype calls
//! - [`locate`]: Identifier resolution against the lookup service
//! - [`scan`]: Streaming VCF genotype extraction
//! - [`parsing`]: Parsers for catalog TSV and VCF lines
//! - [`report`]: Per-entry result rows and run summary
//! - [`pipeline`]: Staged end-to-end run
//! - [`cli`]: Command-line interface implementation

pub mod catalog;
pub mod cli;
pub mod core;
pub mod locate;
pub mod parsing;
pub mod pipeline;
pub mod report;
pub mod scan;
pub mod utils;

// Re-export commonly used types for convenience
pub use catalog::index::PositionIndex;
pub use catalog::normalize::{CatalogNormalizer, CategoryDefault};
pub use catalog::store::PositionCache;
pub use core::entry::{CatalogEntry, CatalogSnapshot};
pub use core::genotype::GenotypeCall;
pub use core::position::{Resolution, ResolvedPosition};
pub use core::types::*;
pub use locate::VariantLocator;
pub use pipeline::{Pipeline, PipelineConfig};
pub use report::ReportRow;
pub use scan::VariantFileScanner;
