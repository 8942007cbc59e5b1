//! Catalog normalization, persistent stores, and the coordinate index.
//!
//! - [`normalize`]: turns raw catalog rows into a [`CatalogSnapshot`] with
//!   duplicate and edge-case provenance
//! - [`store`]: JSON artifacts under the data directory (position cache,
//!   duplicate report, scan results), written atomically
//! - [`index`]: per-contig position buckets used by the VCF scanner
//!
//! ## Example
//!
//! ```rust
//! use snp_resolver::catalog::normalize::CatalogNormalizer;
//!
//! let tsv = "Neurotransmitter\tCOMT\trs4680\tDopamine breakdown\n\
//!            Neurotransmitter\tSLC6A3\trs28363170\tDAT1 VNTR\n";
//! let out = CatalogNormalizer::default().normalize_text(tsv).unwrap();
//!
//! assert_eq!(out.snapshot.entries.len(), 2);
//! assert_eq!(out.snapshot.resolvable_ids(), vec!["rs4680".to_string()]);
//! ```
//!
//! [`CatalogSnapshot`]: crate::core::entry::CatalogSnapshot

pub mod index;
pub mod normalize;
pub mod store;
