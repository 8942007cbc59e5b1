//! Core data types for variant resolution and genotype extraction.
//!
//! - [`CatalogEntry`](entry::CatalogEntry): one normalized row of the curated catalog
//! - [`ResolvedPosition`](position::ResolvedPosition): where an identifier lives on the genome
//! - [`GenotypeCall`](genotype::GenotypeCall): the sample's alleles at that position
//! - [`Assembly`](types::Assembly), [`Zygosity`](types::Zygosity): shared classification types
//!
//! ## Coordinates
//!
//! All positions are 1-based and inclusive, the VCF `POS` convention. Contig
//! names are stored UCSC-style (`chr22`) and compared after canonicalization,
//! so files using NCBI-style names (`22`) still match:
//!
//! | Style | Chromosome 22 | Mitochondrial |
//! |-------|---------------|---------------|
//! | UCSC  | chr22         | chrM          |
//! | NCBI  | 22            | MT            |

pub mod entry;
pub mod genotype;
pub mod position;
pub mod types;
