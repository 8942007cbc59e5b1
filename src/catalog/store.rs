//! JSON artifacts kept in the data directory.
//!
//! Every artifact carries a `version` and `created_at` envelope and is
//! written to a temporary file in the target directory, then renamed into
//! place. Unknown fields are ignored on read.

use std::collections::{BTreeMap, HashSet};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::entry::DuplicateRecord;
use crate::core::position::{ResolvedPosition, Resolution};
use crate::scan::ScanOutput;
use crate::utils::validation::compute_fingerprint;

/// Store format version for compatibility checking
pub const STORE_VERSION: &str = "1.0.0";

pub const POSITION_CACHE_FILE: &str = "rsid_positions.json";
pub const DUPLICATE_REPORT_FILE: &str = "duplicate_rsids.json";
pub const SCAN_RESULTS_FILE: &str = "scan_results.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt store {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read a JSON artifact. `Ok(None)` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Write a JSON artifact atomically: temp file in the same directory, then rename
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush().map_err(|e| StoreError::io(path, e))?;
    }
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn check_version(found: &str, path: &Path) {
    // Version mismatch is not fatal; unknown fields are ignored anyway
    if found != STORE_VERSION {
        warn!(
            "Store version mismatch in {} (expected {STORE_VERSION}, found {found})",
            path.display()
        );
    }
}

/// Serialized position cache
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PositionCacheData {
    version: String,
    created_at: String,
    /// Fingerprint of the identifier set the cache was last reconciled with
    #[serde(default)]
    fingerprint: String,
    #[serde(default)]
    entries: BTreeMap<String, Resolution>,
}

/// Persistent identifier → resolution cache.
///
/// Holds resolved coordinates and permanent negative outcomes. Transient
/// failures are never stored, so they are retried on the next run.
#[derive(Debug, Default)]
pub struct PositionCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Resolution>,
    fingerprint: String,
    dirty: bool,
}

impl PositionCache {
    /// Cache that is never written to disk
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache at `path`.
    ///
    /// A missing file gives an empty cache. A corrupt file is logged and
    /// treated as empty; it is replaced on the next flush.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let mut cache = Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        };

        match read_json::<PositionCacheData>(path) {
            Ok(Some(data)) => {
                check_version(&data.version, path);
                cache.entries = data.entries;
                cache.fingerprint = data.fingerprint;
                debug!(
                    entries = cache.entries.len(),
                    "Loaded position cache {}",
                    path.display()
                );
            }
            Ok(None) => debug!("No position cache at {}", path.display()),
            Err(e @ StoreError::Corrupt { .. }) => {
                warn!("{e}; starting with an empty cache");
                cache.dirty = true;
            }
            Err(e) => return Err(e),
        }

        Ok(cache)
    }

    #[must_use]
    pub fn get(&self, variant_id: &str) -> Option<&Resolution> {
        self.entries.get(variant_id)
    }

    /// Store a resolution. Transient failures are ignored; returns whether
    /// the entry was stored.
    pub fn record(&mut self, resolution: Resolution) -> bool {
        if resolution
            .unresolved_reason()
            .is_some_and(|reason| !reason.is_permanent())
        {
            return false;
        }
        self.entries
            .insert(resolution.variant_id().to_string(), resolution);
        self.dirty = true;
        true
    }

    /// Reconcile with the current identifier set.
    ///
    /// When the fingerprint of `ids` differs from the stored one, entries
    /// for identifiers no longer requested are dropped and the cache is
    /// marked for rewrite. Returns the number of dropped entries.
    pub fn reconcile<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let ids: Vec<&str> = ids.iter().map(|s| s.as_ref()).collect();
        let fingerprint = compute_fingerprint(&ids);
        if fingerprint == self.fingerprint {
            return 0;
        }

        let wanted: HashSet<&str> = ids.into_iter().collect();
        let before = self.entries.len();
        self.entries.retain(|id, _| wanted.contains(id.as_str()));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            info!(dropped, "Dropped cached positions no longer in the catalog");
        }

        self.fingerprint = fingerprint;
        self.dirty = true;
        dropped
    }

    /// Resolved coordinates in the cache
    pub fn resolved(&self) -> impl Iterator<Item = &ResolvedPosition> {
        self.entries.values().filter_map(Resolution::as_resolved)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write pending changes to disk. A no-op for in-memory caches and when
    /// nothing changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be serialized or written.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        let data = PositionCacheData {
            version: STORE_VERSION.to_string(),
            created_at: now_rfc3339(),
            fingerprint: self.fingerprint.clone(),
            entries: self.entries.clone(),
        };
        write_json_atomic(path, &data)?;
        self.dirty = false;
        debug!(entries = self.entries.len(), "Flushed position cache");
        Ok(())
    }
}

/// Audit artifact listing identifiers that recur across catalog entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub version: String,
    pub created_at: String,
    pub summary: DuplicateSummary,
    pub duplicates: DuplicateRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateSummary {
    /// Identifiers occurring in more than one entry
    pub duplicate_ids: usize,
    /// Entries beyond the first occurrence of each identifier
    pub redundant_entries: usize,
}

impl DuplicateReport {
    #[must_use]
    pub fn new(duplicates: &DuplicateRecord) -> Self {
        Self {
            version: STORE_VERSION.to_string(),
            created_at: now_rfc3339(),
            summary: DuplicateSummary {
                duplicate_ids: duplicates.len(),
                redundant_entries: duplicates.values().map(|c| c.len().saturating_sub(1)).sum(),
            },
            duplicates: duplicates.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the report cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        write_json_atomic(path, self)
    }

    /// # Errors
    ///
    /// Returns an error if the file is missing or corrupt.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        read_json(path)?.ok_or_else(|| {
            StoreError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "duplicate report not found"),
            )
        })
    }
}

/// Identity of one scan: which file, in which state, against which targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanKey {
    pub vcf_path: String,
    pub size: u64,
    pub modified: String,
    pub index_fingerprint: String,
    #[serde(default)]
    pub sample: Option<String>,
}

impl ScanKey {
    /// Build a key from the file's current metadata.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file metadata cannot be read.
    pub fn for_file(
        vcf: &Path,
        index_fingerprint: &str,
        sample: Option<&str>,
    ) -> Result<Self, StoreError> {
        let meta = std::fs::metadata(vcf).map_err(|e| StoreError::io(vcf, e))?;
        let modified = meta
            .modified()
            .ok()
            .filter(|t| *t >= UNIX_EPOCH)
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339())
            .unwrap_or_default();
        let vcf_path = vcf
            .canonicalize()
            .unwrap_or_else(|_| vcf.to_path_buf())
            .display()
            .to_string();

        Ok(Self {
            vcf_path,
            size: meta.len(),
            modified,
            index_fingerprint: index_fingerprint.to_string(),
            sample: sample.map(str::to_string),
        })
    }
}

/// Scan results saved for reuse when neither the file nor the targets changed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanArtifact {
    pub version: String,
    pub created_at: String,
    pub key: ScanKey,
    pub output: ScanOutput,
}

impl ScanArtifact {
    #[must_use]
    pub fn new(key: ScanKey, output: ScanOutput) -> Self {
        Self {
            version: STORE_VERSION.to_string(),
            created_at: now_rfc3339(),
            key,
            output,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the artifact cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        write_json_atomic(path, self)
    }

    /// Saved output for `key`, if an artifact exists and matches it.
    /// Corrupt or stale artifacts give `None`.
    #[must_use]
    pub fn load_matching(path: &Path, key: &ScanKey) -> Option<ScanOutput> {
        match read_json::<Self>(path) {
            Ok(Some(artifact)) if artifact.key == *key => {
                check_version(&artifact.version, path);
                Some(artifact.output)
            }
            Ok(Some(_)) => {
                debug!("Scan artifact {} is stale", path.display());
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("{e}; rescanning");
                None
            }
        }
    }
}
