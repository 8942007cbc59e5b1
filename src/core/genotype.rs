//! Genotype calls and decoding of the VCF `GT` field.
//!
//! A `GT` value is a list of allele indices separated by `/` (unphased) or
//! `|` (phased). Index 0 is the reference allele and 1.. index the `ALT`
//! column in order. Phasing does not affect zygosity.
//!
//! Indices beyond the last alternate are rejected rather than clamped; the
//! scanner turns that error into a no-call that keeps the raw field.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::position::ResolvedPosition;
use crate::core::types::Zygosity;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenotypeError {
    #[error("Invalid allele index '{0}' in genotype field")]
    InvalidAlleleIndex(String),

    #[error("Allele index {index} out of range ({alt_count} alternate alleles)")]
    AlleleIndexOutOfRange { index: usize, alt_count: usize },

    #[error("Unsupported ploidy {0}")]
    UnsupportedPloidy(usize),
}

/// Decoded alleles and their zygosity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedGenotype {
    pub alleles: Vec<String>,
    pub zygosity: Zygosity,
}

impl DecodedGenotype {
    fn no_call() -> Self {
        Self {
            alleles: Vec::new(),
            zygosity: Zygosity::NoCall,
        }
    }
}

/// Decode a `GT` value against the record's reference and alternate alleles.
///
/// # Errors
///
/// Returns `GenotypeError::InvalidAlleleIndex` for non-numeric indices,
/// `GenotypeError::AlleleIndexOutOfRange` when an index has no matching
/// alternate, and `GenotypeError::UnsupportedPloidy` above diploid.
pub fn decode_genotype<S: AsRef<str>>(
    gt: &str,
    reference: &str,
    alternates: &[S],
) -> Result<DecodedGenotype, GenotypeError> {
    let gt = gt.trim();
    if gt.is_empty() || gt == "." {
        return Ok(DecodedGenotype::no_call());
    }

    let mut alleles = Vec::with_capacity(2);
    let mut missing = false;
    for part in gt.split(['/', '|']) {
        if part == "." {
            missing = true;
            continue;
        }
        let index: usize = part
            .parse()
            .map_err(|_| GenotypeError::InvalidAlleleIndex(part.to_string()))?;
        let allele = if index == 0 {
            reference
        } else {
            alternates
                .get(index - 1)
                .map(|a| a.as_ref())
                .ok_or(GenotypeError::AlleleIndexOutOfRange {
                    index,
                    alt_count: alternates.len(),
                })?
        };
        alleles.push(allele.to_string());
    }

    if missing {
        return Ok(DecodedGenotype::no_call());
    }

    let zygosity = match alleles.as_slice() {
        [_] => Zygosity::Hemizygous,
        [a, b] => classify_pair(a, b, reference),
        other => return Err(GenotypeError::UnsupportedPloidy(other.len())),
    };

    Ok(DecodedGenotype { alleles, zygosity })
}

fn classify_pair(a: &str, b: &str, reference: &str) -> Zygosity {
    if a == reference && b == reference {
        Zygosity::HomozygousRef
    } else if a == b {
        Zygosity::HomozygousAlt
    } else {
        Zygosity::Heterozygous
    }
}

/// Genotype observed (or inferred) for one identifier in one scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenotypeCall {
    pub variant_id: String,
    pub contig: String,
    pub position: u64,
    pub reference_allele: String,
    pub alternate_alleles: Vec<String>,

    /// Decoded alleles; two for diploid calls, one for haploid, none for no-calls
    pub observed_alleles: Vec<String>,

    pub zygosity: Zygosity,

    /// `GT` value as written in the file (`0/0` for inferred calls)
    pub raw_genotype_field: String,

    /// False when the call was inferred from the position's absence
    pub found_in_file: bool,
}

impl GenotypeCall {
    /// Homozygous-reference call for a target the file never mentioned.
    ///
    /// Variant-only VCFs omit positions where the sample matches the
    /// reference, so absence is evidence of `0/0`.
    #[must_use]
    pub fn inferred_reference(position: &ResolvedPosition) -> Self {
        Self {
            variant_id: position.variant_id.clone(),
            contig: position.contig.clone(),
            position: position.position,
            reference_allele: position.reference_allele.clone(),
            alternate_alleles: position.alternate_alleles.clone(),
            observed_alleles: vec![
                position.reference_allele.clone(),
                position.reference_allele.clone(),
            ],
            zygosity: Zygosity::HomozygousRef,
            raw_genotype_field: "0/0".to_string(),
            found_in_file: false,
        }
    }

    /// Nucleotide rendering: `AG` for single-base alleles, `A/AT` otherwise,
    /// `N/A` for no-calls.
    #[must_use]
    pub fn genotype_string(&self) -> String {
        if self.observed_alleles.is_empty() {
            return "N/A".to_string();
        }
        if self.observed_alleles.iter().any(|a| a.len() > 1) {
            self.observed_alleles.join("/")
        } else {
            self.observed_alleles.concat()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(gt: &str, reference: &str, alts: &[&str]) -> DecodedGenotype {
        decode_genotype(gt, reference, alts).unwrap()
    }

    #[test]
    fn test_decode_heterozygous() {
        let d = decode("0/1", "G", &["A"]);
        assert_eq!(d.alleles, vec!["G", "A"]);
        assert_eq!(d.zygosity, Zygosity::Heterozygous);
    }

    #[test]
    fn test_decode_homozygous_alt() {
        let d = decode("1/1", "G", &["A"]);
        assert_eq!(d.alleles, vec!["A", "A"]);
        assert_eq!(d.zygosity, Zygosity::HomozygousAlt);
    }

    #[test]
    fn test_decode_homozygous_ref() {
        let d = decode("0/0", "G", &["A"]);
        assert_eq!(d.alleles, vec!["G", "G"]);
        assert_eq!(d.zygosity, Zygosity::HomozygousRef);
    }

    #[test]
    fn test_phased_equivalent_to_unphased() {
        assert_eq!(decode("1|0", "C", &["T"]), decode("1/0", "C", &["T"]));
        assert_eq!(decode("1|0", "C", &["T"]).zygosity, Zygosity::Heterozygous);
    }

    #[test]
    fn test_decode_multiallelic() {
        let d = decode("1/2", "A", &["G", "T"]);
        assert_eq!(d.alleles, vec!["G", "T"]);
        assert_eq!(d.zygosity, Zygosity::Heterozygous);

        let d = decode("2/2", "A", &["G", "T"]);
        assert_eq!(d.zygosity, Zygosity::HomozygousAlt);
    }

    #[test]
    fn test_decode_index_out_of_range() {
        let err = decode_genotype("0/3", "A", &["G", "T"]).unwrap_err();
        assert_eq!(
            err,
            GenotypeError::AlleleIndexOutOfRange {
                index: 3,
                alt_count: 2
            }
        );
    }

    #[test]
    fn test_decode_missing() {
        assert_eq!(decode("./.", "A", &["G"]).zygosity, Zygosity::NoCall);
        assert_eq!(decode(".", "A", &["G"]).zygosity, Zygosity::NoCall);
        assert_eq!(decode("0/.", "A", &["G"]).zygosity, Zygosity::NoCall);
    }

    #[test]
    fn test_decode_haploid() {
        let d = decode("1", "A", &["G"]);
        assert_eq!(d.alleles, vec!["G"]);
        assert_eq!(d.zygosity, Zygosity::Hemizygous);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_genotype("a/b", "A", &["G"]),
            Err(GenotypeError::InvalidAlleleIndex(_))
        ));
        assert!(matches!(
            decode_genotype("0/1/1", "A", &["G"]),
            Err(GenotypeError::UnsupportedPloidy(3))
        ));
    }

    #[test]
    fn test_genotype_string() {
        let position = ResolvedPosition {
            variant_id: "rs4680".to_string(),
            contig: "chr22".to_string(),
            position: 19_963_748,
            reference_allele: "G".to_string(),
            alternate_alleles: vec!["A".to_string()],
            assembly_build: crate::core::types::Assembly::Grch38,
            accession: None,
        };
        let call = GenotypeCall::inferred_reference(&position);
        assert_eq!(call.genotype_string(), "GG");
        assert_eq!(call.zygosity, Zygosity::HomozygousRef);
        assert!(!call.found_in_file);

        let mut indel = call.clone();
        indel.observed_alleles = vec!["A".to_string(), "AT".to_string()];
        assert_eq!(indel.genotype_string(), "A/AT");

        indel.observed_alleles.clear();
        assert_eq!(indel.genotype_string(), "N/A");
    }
}
