use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;

use crate::catalog::index::PositionIndex;
use crate::catalog::store::PositionCache;
use crate::core::types::Assembly;
use crate::cli::{open_output, runtime, OutputFormat};
use crate::pipeline::{scan_variant_file, PipelineConfig, ScanStage, DEFAULT_DATA_DIR};
use crate::scan::ScanConfig;

#[derive(Args)]
pub struct ScanArgs {
    /// Sample VCF (plain or gzip/bgzip compressed)
    #[arg(required = true)]
    pub vcf: PathBuf,

    /// Directory holding the position cache written by `resolve`
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Sample column to read (default: the first sample)
    #[arg(long)]
    pub sample: Option<String>,

    /// Genome build the VCF must match (e.g. GRCh38, GRCh37). The builds of
    /// the cached coordinates are always checked.
    #[arg(long)]
    pub assembly: Option<String>,

    /// Scan again even if a saved scan matches
    #[arg(long)]
    pub force_rescan: bool,

    /// Write results to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute scan subcommand
///
/// # Errors
///
/// Returns an error if the cache holds no coordinates, the VCF is missing or
/// unreadable, or its assembly does not match the cached coordinates.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ScanArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = PipelineConfig {
        data_dir: args.data_dir.clone(),
        scan: ScanConfig {
            sample: args.sample.clone(),
            expected_assembly: args.assembly.as_deref().map(Assembly::parse),
            ..ScanConfig::default()
        },
        force_rescan: args.force_rescan,
        ..PipelineConfig::default()
    };

    let cache_path = config.cache_path();
    let cache = PositionCache::load(&cache_path)
        .with_context(|| format!("Failed to open {}", cache_path.display()))?;
    let index = PositionIndex::build(cache.resolved());
    if index.is_empty() {
        bail!(
            "No resolved positions in {}; run `snp-resolver resolve` first",
            cache_path.display()
        );
    }

    if verbose {
        eprintln!(
            "Scanning {} for {} targets at {} positions",
            args.vcf.display(),
            index.len(),
            index.bucket_count()
        );
    }

    let rt = runtime()?;
    let stage = rt.block_on(scan_variant_file(&config, index, &args.vcf))?;

    let mut out = open_output(args.output.as_deref())?;
    match format {
        OutputFormat::Text => print_text(&mut out, &stage)?,
        OutputFormat::Json => {
            let json = serde_json::json!({
                "reused": stage.reused,
                "stats": stage.output.stats,
                "calls": stage.output.calls,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Tsv => print_tsv(&mut out, &stage)?,
    }
    out.flush()?;

    Ok(())
}

fn print_text(out: &mut dyn Write, stage: &ScanStage) -> std::io::Result<()> {
    let stats = &stage.output.stats;
    writeln!(
        out,
        "{} calls ({} found in file, {} inferred reference){}",
        stage.output.calls.len(),
        stats.found_in_file,
        stats.inferred_reference,
        if stage.reused { " [saved scan]" } else { "" }
    )?;
    writeln!(out, "{}", "─".repeat(60))?;
    for call in &stage.output.calls {
        writeln!(
            out,
            "  {:<14} {}:{:<12} {:<6} {}",
            call.variant_id,
            call.contig,
            call.position,
            call.genotype_string(),
            call.zygosity
        )?;
    }
    Ok(())
}

fn print_tsv(out: &mut dyn Write, stage: &ScanStage) -> std::io::Result<()> {
    writeln!(out, "variant_id\tcontig\tposition\treference_allele\talternate_alleles\tgenotype\tzygosity\traw_genotype\tfound_in_file")?;
    for call in &stage.output.calls {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            call.variant_id,
            call.contig,
            call.position,
            call.reference_allele,
            call.alternate_alleles.join(","),
            call.genotype_string(),
            call.zygosity,
            call.raw_genotype_field,
            call.found_in_file
        )?;
    }
    Ok(())
}
