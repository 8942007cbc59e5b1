use serde::{Deserialize, Serialize};

use crate::core::types::{Assembly, UnresolvedReason};

/// Genomic coordinate an identifier resolves to.
///
/// `position` is always 1-based and inclusive, matching the VCF `POS`
/// column. Lookup services that report 0-based interbase coordinates are
/// converted before a `ResolvedPosition` is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPosition {
    pub variant_id: String,

    /// UCSC-style contig name (`chr22`)
    pub contig: String,

    /// 1-based position
    pub position: u64,

    pub reference_allele: String,

    /// Alternate alleles in the order the lookup service reported them
    pub alternate_alleles: Vec<String>,

    pub assembly_build: Assembly,

    /// RefSeq accession of the placement (`NC_000022.11`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accession: Option<String>,
}

/// An identifier that will never enter the scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unresolved {
    pub variant_id: String,
    pub reason: UnresolvedReason,
}

/// Outcome of resolving one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Resolved(ResolvedPosition),
    Unresolved(Unresolved),
}

impl Resolution {
    #[must_use]
    pub fn variant_id(&self) -> &str {
        match self {
            Self::Resolved(p) => &p.variant_id,
            Self::Unresolved(u) => &u.variant_id,
        }
    }

    #[must_use]
    pub fn as_resolved(&self) -> Option<&ResolvedPosition> {
        match self {
            Self::Resolved(p) => Some(p),
            Self::Unresolved(_) => None,
        }
    }

    #[must_use]
    pub fn unresolved_reason(&self) -> Option<&UnresolvedReason> {
        match self {
            Self::Resolved(_) => None,
            Self::Unresolved(u) => Some(&u.reason),
        }
    }

    pub(crate) fn unresolved(variant_id: impl Into<String>, reason: UnresolvedReason) -> Self {
        Self::Unresolved(Unresolved {
            variant_id: variant_id.into(),
            reason,
        })
    }
}
