use std::collections::HashMap;

use crate::core::position::ResolvedPosition;
use crate::core::types::Assembly;
use crate::utils::validation::{canonical_contig, compute_fingerprint};

/// Lookup from `(contig, position)` to the identifiers resolved there.
///
/// Each distinct coordinate is one bucket. Contig keys are canonical
/// (`chr` stripped, `MT` as `M`), so lookups with either naming style hit
/// the same bucket without allocating.
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    /// canonical contig -> position -> bucket
    by_contig: HashMap<String, HashMap<u64, usize>>,

    /// Identifiers per bucket, in insertion order
    buckets: Vec<Vec<String>>,

    /// Every indexed position, keyed by identifier
    positions: HashMap<String, ResolvedPosition>,

    /// Identifiers in insertion order
    order: Vec<String>,

    assemblies: Vec<Assembly>,
}

impl PositionIndex {
    /// Build the index from resolved coordinates.
    ///
    /// An identifier given more than once keeps its first coordinate.
    pub fn build<'a, I>(resolved: I) -> Self
    where
        I: IntoIterator<Item = &'a ResolvedPosition>,
    {
        let mut index = Self::default();
        for position in resolved {
            index.insert(position.clone());
        }
        index
    }

    fn insert(&mut self, position: ResolvedPosition) {
        if self.positions.contains_key(&position.variant_id) {
            return;
        }

        let contig = canonical_contig(&position.contig).to_string();
        let next_bucket = self.buckets.len();
        let bucket = *self
            .by_contig
            .entry(contig)
            .or_default()
            .entry(position.position)
            .or_insert(next_bucket);
        if bucket == next_bucket {
            self.buckets.push(Vec::new());
        }
        self.buckets[bucket].push(position.variant_id.clone());

        if !self.assemblies.contains(&position.assembly_build) {
            self.assemblies.push(position.assembly_build.clone());
        }
        self.order.push(position.variant_id.clone());
        self.positions.insert(position.variant_id.clone(), position);
    }

    /// Identifiers at a coordinate; empty when nothing is indexed there
    #[must_use]
    pub fn lookup(&self, contig: &str, position: u64) -> &[String] {
        self.bucket_at(contig, position)
            .map(|b| self.bucket_ids(b))
            .unwrap_or_default()
    }

    /// Bucket number for a coordinate
    #[must_use]
    pub fn bucket_at(&self, contig: &str, position: u64) -> Option<usize> {
        self.by_contig
            .get(canonical_contig(contig))
            .and_then(|positions| positions.get(&position))
            .copied()
    }

    /// Identifiers in a bucket
    #[must_use]
    pub fn bucket_ids(&self, bucket: usize) -> &[String] {
        self.buckets
            .get(bucket)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of distinct coordinates
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn get(&self, variant_id: &str) -> Option<&ResolvedPosition> {
        self.positions.get(variant_id)
    }

    /// Indexed positions in insertion order
    pub fn positions(&self) -> impl Iterator<Item = &ResolvedPosition> {
        self.order.iter().filter_map(|id| self.positions.get(id))
    }

    /// Builds the indexed coordinates were expressed against, in first-seen
    /// order
    #[must_use]
    pub fn assemblies(&self) -> &[Assembly] {
        &self.assemblies
    }

    /// Number of indexed identifiers
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Stable fingerprint of the indexed targets, independent of build order
    #[must_use]
    pub fn fingerprint(&self) -> String {
        compute_fingerprint(self.positions.values().map(|p| {
            format!(
                "{}:{}:{}:{}",
                p.variant_id,
                canonical_contig(&p.contig),
                p.position,
                p.reference_allele
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(id: &str, contig: &str, position: u64) -> ResolvedPosition {
        ResolvedPosition {
            variant_id: id.to_string(),
            contig: contig.to_string(),
            position,
            reference_allele: "G".to_string(),
            alternate_alleles: vec!["A".to_string()],
            assembly_build: Assembly::Grch38,
            accession: None,
        }
    }

    #[test]
    fn test_lookup_across_naming_styles() {
        let resolved = vec![pos("rs4680", "chr22", 19_963_748), pos("rs6265", "chr11", 27_658_369)];
        let index = PositionIndex::build(&resolved);

        assert_eq!(index.lookup("chr22", 19_963_748), ["rs4680".to_string()]);
        assert_eq!(index.lookup("22", 19_963_748), ["rs4680".to_string()]);
        assert!(index.lookup("chr22", 19_963_749).is_empty());
        assert!(index.lookup("chr1", 19_963_748).is_empty());
        assert_eq!(index.lookup("11", 27_658_369), ["rs6265".to_string()]);
    }

    #[test]
    fn test_shared_coordinate_one_bucket() {
        let resolved = vec![
            pos("rs1", "chr1", 100),
            pos("rs2", "1", 100),
            pos("rs3", "chr1", 200),
        ];
        let index = PositionIndex::build(&resolved);

        assert_eq!(index.len(), 3);
        assert_eq!(index.bucket_count(), 2);
        let bucket = index.bucket_at("chr1", 100).unwrap();
        assert_eq!(index.bucket_ids(bucket), ["rs1".to_string(), "rs2".to_string()]);
    }

    #[test]
    fn test_every_identifier_in_exactly_one_bucket() {
        let resolved = vec![
            pos("rs1", "chr1", 100),
            pos("rs2", "chr1", 100),
            pos("rs3", "chrM", 73),
            pos("rs1", "chr5", 5),
        ];
        let index = PositionIndex::build(&resolved);

        let mut seen: Vec<&String> = (0..index.bucket_count())
            .flat_map(|b| index.bucket_ids(b))
            .collect();
        seen.sort();
        assert_eq!(seen, vec!["rs1", "rs2", "rs3"]);
        assert_eq!(index.get("rs1").unwrap().contig, "chr1");
        assert_eq!(index.lookup("MT", 73), ["rs3".to_string()]);
    }

    #[test]
    fn test_assemblies_lists_every_build() {
        let mut resolved = vec![pos("rs1", "chr1", 100), pos("rs3", "chr1", 300)];
        assert_eq!(PositionIndex::build(&resolved).assemblies(), [Assembly::Grch38]);

        let mut other = pos("rs2", "chr1", 200);
        other.assembly_build = Assembly::Grch37;
        resolved.push(other);
        assert_eq!(
            PositionIndex::build(&resolved).assemblies(),
            [Assembly::Grch38, Assembly::Grch37]
        );

        assert!(PositionIndex::default().assemblies().is_empty());
    }

    #[test]
    fn test_fingerprint_order_independent() {
        let a = vec![pos("rs1", "chr1", 100), pos("rs2", "chr2", 200)];
        let b = vec![pos("rs2", "2", 200), pos("rs1", "1", 100)];
        assert_eq!(
            PositionIndex::build(&a).fingerprint(),
            PositionIndex::build(&b).fingerprint()
        );
        assert_ne!(
            PositionIndex::build(&a).fingerprint(),
            PositionIndex::build(&a[..1]).fingerprint()
        );
    }
}
