//! Command-line interface for snp-resolver.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **catalog**: Normalize a variant catalog and report duplicates and edge cases
//! - **resolve**: Resolve catalog identifiers to genomic coordinates
//! - **scan**: Extract genotypes for cached coordinates from a VCF
//! - **run**: All of the above, producing one row per catalog entry
//!
//! ## Usage
//!
//! ```text
//! # Inspect a catalog
//! snp-resolver catalog snps.tsv
//!
//! # Resolve identifiers (results cached under data/)
//! NCBI_API_KEY=... snp-resolver resolve snps.tsv
//!
//! # Full run, JSON for downstream report generation
//! snp-resolver run snps.tsv --vcf sample.vcf.gz --format json --output rows.json
//!
//! # Re-run against the cache only
//! snp-resolver run snps.tsv --vcf sample.vcf.gz --skip-resolve
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::catalog::normalize::{CatalogNormalizer, CategoryDefault, FALLBACK_CATEGORY};
use crate::core::types::Assembly;
use crate::locate::client::DEFAULT_BASE_URL;
use crate::locate::retry::RetryPolicy;
use crate::locate::{ClientConfig, LocatorConfig};

pub mod catalog;
pub mod resolve;
pub mod run;
pub mod scan;

#[derive(Parser)]
#[command(name = "snp-resolver")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Resolve rsID catalogs against a personal VCF")]
#[command(
    long_about = "snp-resolver turns a curated catalog of rsIDs into genotype calls for one sample.\n\nIt normalizes the catalog, resolves each identifier to a coordinate through NCBI Variation Services (cached on disk), and reads the sample's VCF in a single pass:\n- Duplicate and non-point identifiers are reported, not dropped\n- Lookups are rate limited, retried and resumable\n- Positions absent from a variant-only VCF are reported as homozygous reference"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalize a catalog and report duplicates and edge cases
    Catalog(catalog::CatalogArgs),

    /// Resolve catalog identifiers to coordinates
    Resolve(resolve::ResolveArgs),

    /// Extract genotypes for cached coordinates from a VCF
    Scan(scan::ScanArgs),

    /// Normalize, resolve and scan in one run
    Run(run::RunArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// How rows without a category column get one
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum CategoryPolicy {
    /// Inherit the category of the nearest preceding row that has one
    #[default]
    NearestPrior,
    /// Always use `--default-category`
    Fixed,
}

/// Catalog input shared by every command that reads one
#[derive(clap::Args)]
pub struct CatalogInput {
    /// Catalog file (tab-separated: category, gene, rsID, description)
    #[arg(required = true)]
    pub catalog: PathBuf,

    /// Category for rows without one (fallback for nearest-prior)
    #[arg(long, default_value = FALLBACK_CATEGORY)]
    pub default_category: String,

    /// How rows without a category column are assigned one
    #[arg(long, value_enum, default_value = "nearest-prior")]
    pub category_policy: CategoryPolicy,
}

impl CatalogInput {
    #[must_use]
    pub fn normalizer(&self) -> CatalogNormalizer {
        let default = match self.category_policy {
            CategoryPolicy::NearestPrior => CategoryDefault::NearestPrior {
                fallback: self.default_category.clone(),
            },
            CategoryPolicy::Fixed => CategoryDefault::Fixed(self.default_category.clone()),
        };
        CatalogNormalizer::new(default)
    }
}

/// Lookup service settings
#[derive(clap::Args)]
pub struct NetworkArgs {
    /// NCBI API key; raises the request rate
    #[arg(long, env = "NCBI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Minimum milliseconds between requests (default 350, or 150 with a key)
    #[arg(long)]
    pub rate_limit_ms: Option<u64>,

    /// Attempts per identifier before giving up on transient errors
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_attempts: u32,

    /// Lookups in flight at once
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u64).range(1..=32))]
    pub concurrency: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "20")]
    pub timeout_secs: u64,

    /// Assembly to place variants on
    #[arg(long, default_value = "GRCh38")]
    pub assembly: String,

    /// Lookup service base URL
    #[arg(long, default_value = DEFAULT_BASE_URL, hide = true)]
    pub base_url: String,
}

impl NetworkArgs {
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone().filter(|k| !k.is_empty()),
            rate_limit: self.rate_limit_ms.map(Duration::from_millis),
            timeout: Duration::from_secs(self.timeout_secs),
            assembly: Assembly::parse(&self.assembly),
        }
    }

    #[must_use]
    pub fn locator_config(&self, offline: bool) -> LocatorConfig {
        #[allow(clippy::cast_possible_truncation)] // bounded to 32 by clap
        let max_concurrency = self.concurrency as usize;
        LocatorConfig {
            max_concurrency,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                ..RetryPolicy::default()
            },
            offline,
            ..LocatorConfig::default()
        }
    }
}

/// Writer for command output: the file given by `--output`, or stdout
///
/// # Errors
///
/// Returns an error if the output file cannot be created.
pub fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout().lock())),
    }
}

/// Multi-threaded runtime for the async stages
fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}
