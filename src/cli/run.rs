use std::io::Write;
use std::path::PathBuf;

use clap::Args;

use crate::cli::{open_output, runtime, CatalogInput, NetworkArgs, OutputFormat};
use crate::core::types::Assembly;
use crate::pipeline::{Pipeline, PipelineConfig, DEFAULT_DATA_DIR};
use crate::report;
use crate::scan::ScanConfig;

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: CatalogInput,

    /// Sample VCF (plain or gzip/bgzip compressed); omit to stop after resolution
    #[arg(long)]
    pub vcf: Option<PathBuf>,

    #[command(flatten)]
    pub network: NetworkArgs,

    /// Directory for cache files
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Sample column to read (default: the first sample)
    #[arg(long)]
    pub sample: Option<String>,

    /// Use cached positions only; make no lookups
    #[arg(long)]
    pub skip_resolve: bool,

    /// Scan again even if a saved scan matches
    #[arg(long)]
    pub force_rescan: bool,

    /// Write rows to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute run subcommand
///
/// # Errors
///
/// Returns an error on any fatal stage failure: missing or empty catalog,
/// missing VCF, assembly mismatch, or unwritable cache files.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: RunArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = PipelineConfig {
        catalog: args.input.catalog.clone(),
        vcf: args.vcf.clone(),
        data_dir: args.data_dir.clone(),
        normalizer: args.input.normalizer(),
        locator: args.network.locator_config(args.skip_resolve),
        scan: ScanConfig {
            sample: args.sample.clone(),
            expected_assembly: Some(Assembly::parse(&args.network.assembly)),
            ..ScanConfig::default()
        },
        force_rescan: args.force_rescan,
    };
    let pipeline = Pipeline::with_ncbi(config, args.network.client_config())?;

    let rt = runtime()?;
    let output = rt.block_on(pipeline.run())?;

    if verbose {
        if let Some(scan) = &output.scan {
            eprintln!(
                "Read {} lines ({} data lines, {} matched)",
                scan.output.stats.lines_read,
                scan.output.stats.data_lines,
                scan.output.stats.matched_lines
            );
        }
    }

    let mut out = open_output(args.output.as_deref())?;
    match format {
        OutputFormat::Text => report::write_text(&mut out, &output.summary, &output.rows)?,
        OutputFormat::Json => report::write_json(&mut out, &output.summary, &output.rows)?,
        OutputFormat::Tsv => report::write_tsv(&mut out, &output.rows)?,
    }
    out.flush()?;

    if let Some(path) = &args.output {
        eprintln!("Wrote {} rows to {}", output.rows.len(), path.display());
    }

    Ok(())
}
