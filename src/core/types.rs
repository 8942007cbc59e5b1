use serde::{Deserialize, Serialize};

/// Reference assembly a coordinate is expressed against (e.g., `GRCh37`, `GRCh38`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Assembly {
    Grch37,
    Grch38,
    Other(String),
}

impl Assembly {
    /// Parse an assembly name as it appears in VCF headers and lookup responses.
    ///
    /// Patch suffixes are ignored (`GRCh38.p14` is `GRCh38`), and UCSC names
    /// map to their GRC equivalents.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let lower = s.trim().to_lowercase();
        let base = lower.split(['.', '_']).next().unwrap_or_default();
        match base {
            "grch38" | "hg38" | "b38" | "hs38" | "hs38dh" => Self::Grch38,
            "grch37" | "hg19" | "b37" | "hs37d5" | "hs37" => Self::Grch37,
            _ => Self::Other(s.trim().to_string()),
        }
    }

    /// Find a known assembly name anywhere inside free text, such as a
    /// `##reference=file:///refs/GRCh38_full_analysis_set.fa` header value.
    #[must_use]
    pub fn detect_in(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if ["grch38", "hg38", "hs38", "b38"].iter().any(|k| lower.contains(k)) {
            Some(Self::Grch38)
        } else if ["grch37", "hg19", "hs37", "b37", "g1k_v37", "_v37"].iter().any(|k| lower.contains(k)) {
            Some(Self::Grch37)
        } else {
            None
        }
    }

    /// Whether two builds can be compared. Unknown (`Other`) builds never
    /// conflict with anything.
    #[must_use]
    pub fn conflicts_with(&self, other: &Assembly) -> bool {
        match (self, other) {
            (Self::Other(_), _) | (_, Self::Other(_)) => false,
            (a, b) => a != b,
        }
    }
}

impl std::fmt::Display for Assembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grch37 => write!(f, "GRCh37"),
            Self::Grch38 => write!(f, "GRCh38"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Zygosity of a single-sample genotype call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zygosity {
    HomozygousRef,
    Heterozygous,
    HomozygousAlt,
    /// Haploid call (chrY, chrM, male chrX)
    Hemizygous,
    /// Missing or undecodable genotype
    NoCall,
}

impl std::fmt::Display for Zygosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HomozygousRef => write!(f, "homozygous_ref"),
            Self::Heterozygous => write!(f, "heterozygous"),
            Self::HomozygousAlt => write!(f, "homozygous_alt"),
            Self::Hemizygous => write!(f, "hemizygous"),
            Self::NoCall => write!(f, "no_call"),
        }
    }
}

/// Why a catalog identifier cannot be resolved to a single coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeCaseReason {
    StructuralDeletion,
    TandemRepeat,
    MultiNucleotide,
}

impl std::fmt::Display for EdgeCaseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StructuralDeletion => {
                write!(f, "structural deletion, requires copy-number analysis")
            }
            Self::TandemRepeat => write!(f, "structural/tandem-repeat, not a point variant"),
            Self::MultiNucleotide => write!(
                f,
                "multi-nucleotide variant, not a single-position substitution"
            ),
        }
    }
}

/// Terminal reason an identifier has no coordinate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// Transient failures exhausted the retry budget
    LookupFailed { detail: String },
    /// The lookup service has no usable record for the identifier
    NotFound,
    /// Identifier is not of the `rs<digits>` form
    InvalidIdentifier,
    /// Excluded during catalog normalization
    EdgeCase { reason: EdgeCaseReason },
}

impl UnresolvedReason {
    /// Permanent reasons are safe to cache; a retry would give the same answer.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        !matches!(self, Self::LookupFailed { .. })
    }
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LookupFailed { detail } => write!(f, "lookup_failed: {detail}"),
            Self::NotFound => write!(f, "not_found"),
            Self::InvalidIdentifier => write!(f, "invalid_identifier"),
            Self::EdgeCase { reason } => write!(f, "{reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembly_parse() {
        assert_eq!(Assembly::parse("GRCh38.p14"), Assembly::Grch38);
        assert_eq!(Assembly::parse("hg19"), Assembly::Grch37);
        assert_eq!(Assembly::parse(" GRCh37 "), Assembly::Grch37);
        assert_eq!(
            Assembly::parse("T2T-CHM13"),
            Assembly::Other("T2T-CHM13".to_string())
        );
    }

    #[test]
    fn test_assembly_detect_in() {
        assert_eq!(
            Assembly::detect_in("file:///refs/GRCh38_full_analysis_set.fa"),
            Some(Assembly::Grch38)
        );
        assert_eq!(
            Assembly::detect_in("/data/human_g1k_v37.fasta"),
            Some(Assembly::Grch37)
        );
        assert_eq!(
            Assembly::detect_in("file:///refs/human_g1k_v37_decoy.fasta.gz"),
            Some(Assembly::Grch37)
        );
        assert_eq!(Assembly::detect_in("/refs/mm10.fa"), None);
        assert_eq!(Assembly::detect_in("ucsc.hg19.fasta"), Some(Assembly::Grch37));
    }

    #[test]
    fn test_assembly_conflicts() {
        assert!(Assembly::Grch37.conflicts_with(&Assembly::Grch38));
        assert!(!Assembly::Grch38.conflicts_with(&Assembly::Grch38));
        assert!(!Assembly::Other("x".into()).conflicts_with(&Assembly::Grch38));
    }

    #[test]
    fn test_edge_case_reason_text() {
        assert_eq!(
            EdgeCaseReason::TandemRepeat.to_string(),
            "structural/tandem-repeat, not a point variant"
        );
    }

    #[test]
    fn test_unresolved_permanence() {
        assert!(UnresolvedReason::NotFound.is_permanent());
        assert!(!UnresolvedReason::LookupFailed {
            detail: "timeout".into()
        }
        .is_permanent());
    }
}
