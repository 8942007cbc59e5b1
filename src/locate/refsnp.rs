//! dbSNP `refsnp` record model (NCBI Variation Services) and placement
//! selection.
//!
//! Only the fields needed to place a variant are modelled; everything else
//! in the response is ignored. Positions in the response are SPDI, i.e.
//! 0-based interbase; [`RefSnpRecord::to_position`] converts to 1-based.

use serde::Deserialize;
use tracing::debug;

use crate::core::position::ResolvedPosition;
use crate::core::types::Assembly;

/// RefSeq chromosome accession versions: (chromosome, `GRCh38`, `GRCh37`)
const CHROMOSOME_ACCESSIONS: &[(&str, u32, u32)] = &[
    ("1", 11, 10),
    ("2", 12, 11),
    ("3", 12, 11),
    ("4", 12, 11),
    ("5", 10, 9),
    ("6", 12, 11),
    ("7", 14, 13),
    ("8", 11, 10),
    ("9", 12, 11),
    ("10", 11, 10),
    ("11", 10, 9),
    ("12", 12, 11),
    ("13", 11, 10),
    ("14", 9, 8),
    ("15", 10, 9),
    ("16", 10, 9),
    ("17", 11, 10),
    ("18", 10, 9),
    ("19", 10, 9),
    ("20", 11, 10),
    ("21", 9, 8),
    ("22", 11, 10),
    ("X", 11, 10),
    ("Y", 10, 9),
];

/// rCRS mitochondrial accession, shared by both builds
const MITOCHONDRIAL_ACCESSION: &str = "NC_012920.1";

/// Chromosome and build implied by a RefSeq accession
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessionInfo {
    pub chromosome: &'static str,
    /// `None` when the sequence is shared across builds (chrM)
    pub assembly: Option<Assembly>,
}

/// Decode a RefSeq chromosome accession (`NC_000022.11` → chr22, `GRCh38`).
///
/// Returns `None` for anything that is not a primary chromosome sequence
/// (contigs, patches, transcripts).
#[must_use]
pub fn accession_info(accession: &str) -> Option<AccessionInfo> {
    if accession == MITOCHONDRIAL_ACCESSION {
        return Some(AccessionInfo {
            chromosome: "M",
            assembly: None,
        });
    }

    let (number, version) = accession.strip_prefix("NC_")?.split_once('.')?;
    let number: usize = number.parse().ok()?;
    let version: u32 = version.parse().ok()?;
    let &(chromosome, grch38, grch37) = CHROMOSOME_ACCESSIONS.get(number.checked_sub(1)?)?;

    let assembly = if version == grch38 {
        Assembly::Grch38
    } else if version == grch37 {
        Assembly::Grch37
    } else {
        return None;
    };
    Some(AccessionInfo {
        chromosome,
        assembly: Some(assembly),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefSnpRecord {
    #[serde(default)]
    pub primary_snapshot_data: Option<PrimarySnapshot>,
    #[serde(default)]
    pub merged_snapshot_data: Option<MergedSnapshot>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrimarySnapshot {
    #[serde(default)]
    pub placements_with_allele: Vec<Placement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MergedSnapshot {
    #[serde(default)]
    pub merged_into: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Placement {
    pub seq_id: String,
    /// Primary top-level placement
    #[serde(default)]
    pub is_ptlp: bool,
    #[serde(default)]
    pub placement_annot: PlacementAnnotation,
    #[serde(default)]
    pub alleles: Vec<PlacementAllele>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacementAnnotation {
    #[serde(default)]
    pub seq_id_traits_by_assembly: Vec<AssemblyTraits>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssemblyTraits {
    #[serde(default)]
    pub assembly_name: String,
    #[serde(default)]
    pub is_chromosome: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacementAllele {
    #[serde(default)]
    pub allele: AlleleData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlleleData {
    #[serde(default)]
    pub spdi: Option<Spdi>,
}

/// Sequence/position/deletion/insertion allele description
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Spdi {
    #[serde(default)]
    pub seq_id: String,
    /// 0-based interbase position
    pub position: u64,
    #[serde(default)]
    pub deleted_sequence: String,
    #[serde(default)]
    pub inserted_sequence: String,
}

impl Placement {
    /// Build this placement is on, from its annotation or its accession
    fn assembly(&self, info: &AccessionInfo) -> Assembly {
        self.placement_annot
            .seq_id_traits_by_assembly
            .iter()
            .map(|t| Assembly::parse(&t.assembly_name))
            .find(|a| !matches!(a, Assembly::Other(_)))
            .or_else(|| info.assembly.clone())
            .unwrap_or_else(|| Assembly::Other("unknown".to_string()))
    }
}

impl RefSnpRecord {
    /// Numeric rsID this record was merged into, if it has no data of its own
    #[must_use]
    pub fn merged_into(&self) -> Option<u64> {
        if self.primary_snapshot_data.is_some() {
            return None;
        }
        self.merged_snapshot_data
            .as_ref()?
            .merged_into
            .first()?
            .parse()
            .ok()
    }

    /// Pick the best chromosome placement.
    ///
    /// Preference: on `target`, primary top-level, then any chromosome
    /// placement on `target`, then a chromosome placement on another build.
    #[must_use]
    pub fn select_placement(&self, target: &Assembly) -> Option<(&Placement, AccessionInfo)> {
        let placements = &self.primary_snapshot_data.as_ref()?.placements_with_allele;

        let mut best: Option<(u8, &Placement, AccessionInfo)> = None;
        for placement in placements {
            let Some(info) = accession_info(&placement.seq_id) else {
                continue;
            };
            let on_target = placement.assembly(&info) == *target;
            let rank = match (on_target, placement.is_ptlp) {
                (true, true) => 3,
                (true, false) => 2,
                (false, true) => 1,
                (false, false) => 0,
            };
            if best.as_ref().map_or(true, |(r, _, _)| rank > *r) {
                best = Some((rank, placement, info));
            }
        }

        best.map(|(_, placement, info)| (placement, info))
    }

    /// Convert to a resolved coordinate for `variant_id`.
    ///
    /// `None` when there is no chromosome placement or the placement lacks
    /// a reference allele with an SPDI position.
    #[must_use]
    pub fn to_position(&self, variant_id: &str, target: &Assembly) -> Option<ResolvedPosition> {
        let Some((placement, info)) = self.select_placement(target) else {
            debug!(variant_id, "No chromosomal placement");
            return None;
        };
        let assembly = placement.assembly(&info);
        if assembly != *target {
            debug!(variant_id, %assembly, "No placement on {target}; using {}", placement.seq_id);
        }

        // First allele is the reference; a record with nothing else is not a variant
        if placement.alleles.len() < 2 {
            debug!(variant_id, "Placement has fewer than two alleles");
            return None;
        }
        let reference = placement.alleles[0].allele.spdi.as_ref()?;

        let mut alternates: Vec<String> = Vec::new();
        for allele in &placement.alleles[1..] {
            let Some(spdi) = &allele.allele.spdi else {
                continue;
            };
            let inserted = &spdi.inserted_sequence;
            if !inserted.is_empty()
                && *inserted != reference.deleted_sequence
                && !alternates.contains(inserted)
            {
                alternates.push(inserted.clone());
            }
        }

        Some(ResolvedPosition {
            variant_id: variant_id.to_string(),
            contig: format!("chr{}", info.chromosome),
            position: reference.position + 1,
            reference_allele: reference.deleted_sequence.clone(),
            alternate_alleles: alternates,
            assembly_build: assembly,
            accession: Some(placement.seq_id.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Trimmed-down rs4680 response
    const RS4680: &str = r#"{
      "refsnp_id": "4680",
      "create_date": "2000-09-19T17:02Z",
      "primary_snapshot_data": {
        "variant_type": "snv",
        "placements_with_allele": [
          {
            "seq_id": "NC_000022.10",
            "is_ptlp": false,
            "placement_annot": {
              "seq_type": "refseq_chromosome",
              "seq_id_traits_by_assembly": [
                {"assembly_name": "GRCh37.p13", "is_top_level": true, "is_chromosome": true}
              ]
            },
            "alleles": [
              {"allele": {"spdi": {"seq_id": "NC_000022.10", "position": 19951270,
                "deleted_sequence": "G", "inserted_sequence": "G"}}},
              {"allele": {"spdi": {"seq_id": "NC_000022.10", "position": 19951270,
                "deleted_sequence": "G", "inserted_sequence": "A"}}}
            ]
          },
          {
            "seq_id": "NC_000022.11",
            "is_ptlp": true,
            "placement_annot": {
              "seq_type": "refseq_chromosome",
              "seq_id_traits_by_assembly": [
                {"assembly_name": "GRCh38.p14", "is_top_level": true, "is_chromosome": true}
              ]
            },
            "alleles": [
              {"allele": {"spdi": {"seq_id": "NC_000022.11", "position": 19963747,
                "deleted_sequence": "G", "inserted_sequence": "G"}}},
              {"allele": {"spdi": {"seq_id": "NC_000022.11", "position": 19963747,
                "deleted_sequence": "G", "inserted_sequence": "A"}}}
            ]
          },
          {
            "seq_id": "NM_000754.4",
            "is_ptlp": false,
            "placement_annot": {"seq_id_traits_by_assembly": []},
            "alleles": []
          }
        ]
      }
    }"#;

    fn record(json: &str) -> RefSnpRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_accession_info() {
        assert_eq!(
            accession_info("NC_000022.11"),
            Some(AccessionInfo {
                chromosome: "22",
                assembly: Some(Assembly::Grch38)
            })
        );
        assert_eq!(
            accession_info("NC_000023.10").map(|i| (i.chromosome, i.assembly)),
            Some(("X", Some(Assembly::Grch37)))
        );
        assert_eq!(accession_info("NC_012920.1").unwrap().chromosome, "M");
        assert!(accession_info("NC_000022.9").is_none());
        assert!(accession_info("NC_000025.1").is_none());
        assert!(accession_info("NC_000000.1").is_none());
        assert!(accession_info("NT_187633.1").is_none());
        assert!(accession_info("NM_000754.4").is_none());
    }

    #[test]
    fn test_position_is_one_based() {
        let position = record(RS4680)
            .to_position("rs4680", &Assembly::Grch38)
            .unwrap();

        assert_eq!(position.contig, "chr22");
        assert_eq!(position.position, 19_963_748);
        assert_eq!(position.reference_allele, "G");
        assert_eq!(position.alternate_alleles, vec!["A"]);
        assert_eq!(position.assembly_build, Assembly::Grch38);
        assert_eq!(position.accession.as_deref(), Some("NC_000022.11"));
    }

    #[test]
    fn test_target_assembly_preferred() {
        let position = record(RS4680)
            .to_position("rs4680", &Assembly::Grch37)
            .unwrap();
        assert_eq!(position.position, 19_951_271);
        assert_eq!(position.assembly_build, Assembly::Grch37);
    }

    #[test]
    fn test_falls_back_to_other_build() {
        let json = RS4680.replacen("NC_000022.11", "NT_000000.1", 1);
        let position = record(&json).to_position("rs4680", &Assembly::Grch38).unwrap();
        assert_eq!(position.assembly_build, Assembly::Grch37);
        assert_eq!(position.accession.as_deref(), Some("NC_000022.10"));
    }

    #[test]
    fn test_multiallelic_alternates_in_order() {
        let json = r#"{"primary_snapshot_data": {"placements_with_allele": [{
            "seq_id": "NC_000001.11", "is_ptlp": true,
            "alleles": [
              {"allele": {"spdi": {"position": 99, "deleted_sequence": "C", "inserted_sequence": "C"}}},
              {"allele": {"spdi": {"position": 99, "deleted_sequence": "C", "inserted_sequence": "T"}}},
              {"allele": {"spdi": {"position": 99, "deleted_sequence": "C", "inserted_sequence": "G"}}},
              {"allele": {"spdi": {"position": 99, "deleted_sequence": "C", "inserted_sequence": "T"}}}
            ]}]}}"#;
        let position = record(json).to_position("rs1", &Assembly::Grch38).unwrap();
        assert_eq!(position.position, 100);
        assert_eq!(position.alternate_alleles, vec!["T", "G"]);
        assert_eq!(position.contig, "chr1");
    }

    #[test]
    fn test_indel_record_resolves() {
        let json = r#"{"refsnp_id": "333", "primary_snapshot_data": {
            "variant_type": "delins",
            "placements_with_allele": [{
            "seq_id": "NC_000003.12", "is_ptlp": true,
            "alleles": [
              {"allele": {"spdi": {"position": 46373452, "deleted_sequence": "TCAGTATCAATTCTGGAAGAATTTCCAGACA", "inserted_sequence": "TCAGTATCAATTCTGGAAGAATTTCCAGACA"}}},
              {"allele": {"spdi": {"position": 46373452, "deleted_sequence": "TCAGTATCAATTCTGGAAGAATTTCCAGACA", "inserted_sequence": "TCAGACA"}}}
            ]}]}}"#;
        let position = record(json).to_position("rs333", &Assembly::Grch38).unwrap();
        assert_eq!(position.contig, "chr3");
        assert_eq!(position.position, 46_373_453);
        assert_eq!(position.alternate_alleles, vec!["TCAGACA"]);
    }

    #[test]
    fn test_no_usable_placement() {
        let json = r#"{"primary_snapshot_data": {"placements_with_allele": [
            {"seq_id": "NM_000754.4", "alleles": []}]}}"#;
        assert!(record(json).to_position("rs1", &Assembly::Grch38).is_none());

        let single_allele = r#"{"primary_snapshot_data": {"placements_with_allele": [{
            "seq_id": "NC_000001.11", "is_ptlp": true,
            "alleles": [{"allele": {"spdi": {"position": 5, "deleted_sequence": "A", "inserted_sequence": "A"}}}]
        }]}}"#;
        assert!(record(single_allele).to_position("rs1", &Assembly::Grch38).is_none());
    }

    #[test]
    fn test_merged_into() {
        let merged = record(
            r#"{"refsnp_id": "386571803", "merged_snapshot_data": {"merged_into": ["6265"]}}"#,
        );
        assert_eq!(merged.merged_into(), Some(6265));
        assert!(merged.to_position("rs386571803", &Assembly::Grch38).is_none());
        assert_eq!(record(RS4680).merged_into(), None);
    }
}
