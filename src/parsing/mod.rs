//! Parsers for the two text inputs: the curated variant catalog and the
//! sample's VCF.
//!
//! - **Catalog TSV**: `category, gene, variant_id, description`, where older
//!   rows omit `category`
//! - **VCF**: header meta lines (assembly detection, contigs, sample columns)
//!   and the few data-line columns genotype decoding needs
//!
//! ## Example
//!
//! ```rust
//! use snp_resolver::parsing::tsv::{parse_catalog_text, RawRow};
//!
//! let parsed = parse_catalog_text("COMT\trs4680\tdopamine clearance\n").unwrap();
//! assert!(matches!(parsed.rows[0].row, RawRow::Short { .. }));
//! ```

pub mod tsv;
pub mod vcf;
