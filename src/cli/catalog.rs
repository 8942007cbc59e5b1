use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::catalog::store::{DuplicateReport, DUPLICATE_REPORT_FILE};
use crate::cli::{CatalogInput, OutputFormat};
use crate::pipeline::DEFAULT_DATA_DIR;

#[derive(Args)]
pub struct CatalogArgs {
    #[command(flatten)]
    pub input: CatalogInput,

    /// Directory for the duplicate report
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// List every entry, not just the summary
    #[arg(long)]
    pub entries: bool,
}

/// Execute catalog subcommand
///
/// # Errors
///
/// Returns an error if the catalog is missing or empty, or the duplicate
/// report cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: CatalogArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let output = args.input.normalizer().load(&args.input.catalog)?;
    let snapshot = &output.snapshot;

    let report_path = args.data_dir.join(DUPLICATE_REPORT_FILE);
    DuplicateReport::new(&snapshot.duplicates)
        .save(&report_path)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    if verbose {
        eprintln!("Wrote duplicate report to {}", report_path.display());
    }

    match format {
        OutputFormat::Text => {
            println!(
                "Catalog: {} ({} entries, {} unique identifiers)",
                args.input.catalog.display(),
                snapshot.entries.len(),
                snapshot.unique_id_count()
            );
            println!("{}", "─".repeat(60));

            let defaulted = snapshot
                .entries
                .iter()
                .filter(|e| e.category_defaulted)
                .count();
            if defaulted > 0 {
                println!("Rows with defaulted category: {defaulted}");
            }

            if !snapshot.duplicates.is_empty() {
                println!("\nDuplicates ({}):", snapshot.duplicates.len());
                for (id, categories) in &snapshot.duplicates {
                    println!("  {:<14} {}", id, categories.join(", "));
                }
            }

            if !snapshot.edge_cases.is_empty() {
                println!("\nEdge cases ({}):", snapshot.edge_cases.len());
                for edge in &snapshot.edge_cases {
                    println!("  {:<14} {}", edge.variant_id, edge.reason);
                }
            }

            if !output.errors.is_empty() {
                println!("\nRejected rows ({}):", output.errors.len());
                for e in &output.errors {
                    println!("  {e}");
                }
            }

            if args.entries {
                println!("\nEntries:");
                for entry in &snapshot.entries {
                    println!(
                        "  {:>5}  {:<24} {:<10} {:<14} {}",
                        entry.source_row_index,
                        entry.category,
                        entry.gene,
                        entry.variant_id,
                        entry.description
                    );
                }
            }
        }
        OutputFormat::Json => {
            let errors: Vec<String> = output.errors.iter().map(ToString::to_string).collect();
            let json = serde_json::json!({
                "catalog": args.input.catalog.display().to_string(),
                "entries": snapshot.entries,
                "unique_ids": snapshot.unique_id_count(),
                "duplicates": snapshot.duplicates,
                "edge_cases": snapshot.edge_cases,
                "rejected_rows": errors,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Tsv => {
            println!("row\tcategory\tgene\tvariant_id\tdescription\tcategory_defaulted\tis_duplicate\tedge_case");
            for entry in &snapshot.entries {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    entry.source_row_index,
                    entry.category,
                    entry.gene,
                    entry.variant_id,
                    entry.description,
                    entry.category_defaulted,
                    snapshot.is_duplicate(&entry.variant_id),
                    entry.edge_case.map(|r| r.to_string()).unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}
