//! Streaming genotype extraction from a sample's VCF.
//!
//! ## Example
//!
//! ```rust
//! use std::io::Cursor;
//!
//! use snp_resolver::catalog::index::PositionIndex;
//! use snp_resolver::core::position::ResolvedPosition;
//! use snp_resolver::core::types::{Assembly, Zygosity};
//! use snp_resolver::scan::VariantFileScanner;
//!
//! let comt = ResolvedPosition {
//!     variant_id: "rs4680".to_string(),
//!     contig: "chr22".to_string(),
//!     position: 19_963_748,
//!     reference_allele: "G".to_string(),
//!     alternate_alleles: vec!["A".to_string()],
//!     assembly_build: Assembly::Grch38,
//!     accession: None,
//! };
//! let index = PositionIndex::build(&[comt]);
//!
//! let vcf = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA12878\n\
//!            chr22\t19963748\t.\tG\tA\t60\tPASS\t.\tGT\t0/1\n";
//! let out = VariantFileScanner::default()
//!     .scan(Cursor::new(vcf), &index)
//!     .unwrap();
//!
//! assert_eq!(out.calls[0].zygosity, Zygosity::Heterozygous);
//! ```

pub mod scanner;

pub use scanner::{ScanConfig, ScanError, ScanOutput, ScanStats, VariantFileScanner};
