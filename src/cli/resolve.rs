use std::io::Write;
use std::path::PathBuf;

use clap::Args;

use crate::cli::{open_output, runtime, CatalogInput, NetworkArgs, OutputFormat};
use crate::core::position::Resolution;
use crate::locate::LocateOutput;
use crate::pipeline::{Pipeline, PipelineConfig, DEFAULT_DATA_DIR};

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub input: CatalogInput,

    #[command(flatten)]
    pub network: NetworkArgs,

    /// Directory for the position cache
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Use cached positions only; make no lookups
    #[arg(long)]
    pub skip_resolve: bool,

    /// Write results to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute resolve subcommand
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or the cache cannot be
/// read or written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ResolveArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = PipelineConfig {
        catalog: args.input.catalog.clone(),
        data_dir: args.data_dir.clone(),
        normalizer: args.input.normalizer(),
        locator: args.network.locator_config(args.skip_resolve),
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::with_ncbi(config, args.network.client_config())?;

    let catalog = pipeline.load_catalog()?;
    let rt = runtime()?;
    let located = rt.block_on(pipeline.resolve(&catalog.snapshot))?;

    if verbose {
        eprintln!(
            "{} identifiers: {} from cache, {} looked up ({} attempts)",
            located.stats.requested,
            located.stats.cache_hits,
            located.stats.network_lookups,
            located.stats.attempts
        );
    }

    let mut out = open_output(args.output.as_deref())?;
    match format {
        OutputFormat::Text => print_text(&mut out, &located)?,
        OutputFormat::Json => {
            let json = serde_json::json!({
                "stats": located.stats,
                "resolutions": located.resolutions,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Tsv => print_tsv(&mut out, &located)?,
    }
    out.flush()?;

    Ok(())
}

fn print_text(out: &mut dyn Write, located: &LocateOutput) -> std::io::Result<()> {
    writeln!(
        out,
        "Resolved {} of {} identifiers",
        located.stats.resolved, located.stats.requested
    )?;
    writeln!(out, "{}", "─".repeat(60))?;
    for (id, resolution) in &located.resolutions {
        match resolution {
            Resolution::Resolved(p) => writeln!(
                out,
                "  {:<14} {}:{} {}>{} ({})",
                id,
                p.contig,
                p.position,
                p.reference_allele,
                p.alternate_alleles.join(","),
                p.assembly_build
            )?,
            Resolution::Unresolved(u) => writeln!(out, "  {:<14} unresolved: {}", id, u.reason)?,
        }
    }
    Ok(())
}

fn print_tsv(out: &mut dyn Write, located: &LocateOutput) -> std::io::Result<()> {
    writeln!(out, "variant_id\tstatus\tcontig\tposition\treference_allele\talternate_alleles\tassembly\treason")?;
    for (id, resolution) in &located.resolutions {
        match resolution {
            Resolution::Resolved(p) => writeln!(
                out,
                "{}\tresolved\t{}\t{}\t{}\t{}\t{}\t",
                id,
                p.contig,
                p.position,
                p.reference_allele,
                p.alternate_alleles.join(","),
                p.assembly_build
            )?,
            Resolution::Unresolved(u) => {
                writeln!(out, "{}\tunresolved\t\t\t\t\t\t{}", id, u.reason)?;
            }
        }
    }
    Ok(())
}
