//! Staged end-to-end run: catalog → coordinates → genotypes → report rows.
//!
//! Every stage leaves its result under the data directory, so an
//! interrupted run picks up where it stopped. Resolution is incremental
//! through the position cache, and an unchanged re-run reuses the saved
//! scan instead of reading the variant file again.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::catalog::index::PositionIndex;
use crate::catalog::normalize::{CatalogNormalizer, NormalizeOutput};
use crate::catalog::store::{
    DuplicateReport, PositionCache, ScanArtifact, ScanKey, DUPLICATE_REPORT_FILE,
    POSITION_CACHE_FILE, SCAN_RESULTS_FILE,
};
use crate::core::entry::CatalogSnapshot;
use crate::locate::{
    ClientConfig, LocateOutput, LocatorConfig, LookupService, NcbiVariationClient, VariantLocator,
};
use crate::report::{build_report_rows, ReportRow, RunSummary};
use crate::scan::{ScanConfig, ScanOutput, VariantFileScanner};

/// Default location of the cache files
pub const DEFAULT_DATA_DIR: &str = "data";

/// Settings for one [`Pipeline`] run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub catalog: PathBuf,
    /// Sample VCF; when `None` the run stops after resolution
    pub vcf: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub normalizer: CatalogNormalizer,
    pub locator: LocatorConfig,
    pub scan: ScanConfig,
    /// Ignore a saved scan even if it matches
    pub force_rescan: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::new(),
            vcf: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            normalizer: CatalogNormalizer::default(),
            locator: LocatorConfig::default(),
            scan: ScanConfig::default(),
            force_rescan: false,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join(POSITION_CACHE_FILE)
    }

    #[must_use]
    pub fn duplicate_report_path(&self) -> PathBuf {
        self.data_dir.join(DUPLICATE_REPORT_FILE)
    }

    #[must_use]
    pub fn scan_results_path(&self) -> PathBuf {
        self.data_dir.join(SCAN_RESULTS_FILE)
    }
}

/// Genotype stage result
#[derive(Debug, Clone)]
pub struct ScanStage {
    pub output: ScanOutput,
    /// Loaded from `scan_results.json` rather than scanned
    pub reused: bool,
}

/// Everything a run produced
#[derive(Debug)]
pub struct PipelineOutput {
    pub catalog: NormalizeOutput,
    pub located: LocateOutput,
    pub scan: Option<ScanStage>,
    pub rows: Vec<ReportRow>,
    pub summary: RunSummary,
}

pub struct Pipeline<S> {
    config: PipelineConfig,
    locator: VariantLocator<S>,
}

impl Pipeline<NcbiVariationClient> {
    /// Pipeline backed by the NCBI Variation Services client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_ncbi(config: PipelineConfig, client: ClientConfig) -> Result<Self> {
        let service =
            NcbiVariationClient::new(client).context("Failed to create lookup client")?;
        Ok(Self::new(config, service))
    }
}

impl<S: LookupService> Pipeline<S> {
    pub fn new(config: PipelineConfig, service: S) -> Self {
        let locator = VariantLocator::new(service, config.locator.clone());
        Self { config, locator }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage 1: normalize the catalog and save the duplicate report.
    ///
    /// # Errors
    ///
    /// Fails if the catalog is missing or empty, or the report cannot be
    /// written.
    pub fn load_catalog(&self) -> Result<NormalizeOutput> {
        let output = self
            .config
            .normalizer
            .load(&self.config.catalog)
            .with_context(|| format!("Failed to load catalog {}", self.config.catalog.display()))?;

        let report_path = self.config.duplicate_report_path();
        DuplicateReport::new(&output.snapshot.duplicates)
            .save(&report_path)
            .with_context(|| format!("Failed to write {}", report_path.display()))?;
        Ok(output)
    }

    /// Stage 2: resolve every resolvable identifier, cache first.
    ///
    /// # Errors
    ///
    /// Fails if the position cache cannot be read or written.
    pub async fn resolve(&self, snapshot: &CatalogSnapshot) -> Result<LocateOutput> {
        let ids = snapshot.resolvable_ids();
        let cache_path = self.config.cache_path();
        let mut cache = PositionCache::load(&cache_path)
            .with_context(|| format!("Failed to open {}", cache_path.display()))?;
        cache.reconcile(ids.as_slice());

        let located = self
            .locator
            .resolve(&ids, &mut cache)
            .await
            .with_context(|| format!("Failed to write {}", cache_path.display()))?;

        let stats = &located.stats;
        info!(
            requested = stats.requested,
            cache_hits = stats.cache_hits,
            lookups = stats.network_lookups,
            resolved = stats.resolved,
            unresolved = stats.unresolved,
            "Resolution complete"
        );
        Ok(located)
    }

    /// Stage 3: genotype every resolved identifier from `vcf`.
    ///
    /// # Errors
    ///
    /// See [`scan_variant_file`].
    pub async fn scan(&self, located: &LocateOutput, vcf: &Path) -> Result<ScanStage> {
        let index =
            PositionIndex::build(located.resolutions.values().filter_map(|r| r.as_resolved()));
        scan_variant_file(&self.config, index, vcf).await
    }

    /// Run every stage and build the report rows.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error of any stage.
    pub async fn run(&self) -> Result<PipelineOutput> {
        let catalog = self.load_catalog()?;
        let located = self.resolve(&catalog.snapshot).await?;

        let scan = match &self.config.vcf {
            Some(vcf) => Some(self.scan(&located, vcf).await?),
            None => None,
        };

        let scan_output = scan.as_ref().map(|s| &s.output);
        let rows = build_report_rows(&catalog.snapshot, &located.resolutions, scan_output);
        let summary = RunSummary::new(
            &catalog.snapshot,
            catalog.errors.len(),
            &located.stats,
            scan_output,
            scan.as_ref().is_some_and(|s| s.reused),
        );

        Ok(PipelineOutput {
            catalog,
            located,
            scan,
            rows,
            summary,
        })
    }
}

/// Genotype every target in `index` from `vcf`.
///
/// Reuses the saved scan when the file, its targets and the sample are
/// unchanged, unless `force_rescan` is set.
///
/// # Errors
///
/// Fails if the file is missing or unreadable, the assembly or sample
/// does not match, or the scan artifact cannot be written.
pub async fn scan_variant_file(
    config: &PipelineConfig,
    index: PositionIndex,
    vcf: &Path,
) -> Result<ScanStage> {
    if !vcf.exists() {
        bail!("Variant file not found: {}", vcf.display());
    }

    let key = ScanKey::for_file(vcf, &index.fingerprint(), config.scan.sample.as_deref())?;
    let artifact_path = config.scan_results_path();

    if !config.force_rescan {
        if let Some(output) = ScanArtifact::load_matching(&artifact_path, &key) {
            info!(
                "Reusing scan of {} from {}",
                vcf.display(),
                artifact_path.display()
            );
            return Ok(ScanStage {
                output,
                reused: true,
            });
        }
    }

    let scanner = VariantFileScanner::new(config.scan.clone());
    let path = vcf.to_path_buf();
    let output = tokio::task::spawn_blocking(move || scanner.scan_path(&path, &index))
        .await
        .context("Scan task failed")?
        .with_context(|| format!("Failed to scan {}", vcf.display()))?;

    ScanArtifact::new(key, output.clone())
        .save(&artifact_path)
        .with_context(|| format!("Failed to write {}", artifact_path.display()))?;

    Ok(ScanStage {
        output,
        reused: false,
    })
}
