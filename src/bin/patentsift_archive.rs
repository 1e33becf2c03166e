use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use patentsift::{init_tracing, process_archive, ArchiveJob, SchemaVariant};

#[derive(Parser, Debug)]
#[command(
    name = "patentsift-archive",
    about = "Extract relevant patent grants from a single bulk archive"
)]
struct ArchiveCli {
    /// Bulk archive to process
    archive: PathBuf,

    /// Artifact path (defaults to the archive stem with a .jsonl extension, next to the archive)
    #[arg(long, env = "PATENTSIFT_OUTPUT")]
    output: Option<PathBuf>,

    /// Force one schema variant for every member (legacy-text, xml-gen-a, xml-gen-b)
    #[arg(long, env = "PATENTSIFT_VARIANT")]
    variant: Option<SchemaVariant>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = ArchiveCli::parse();
    let output = cli
        .output
        .unwrap_or_else(|| cli.archive.with_extension("jsonl"));
    let mut job = ArchiveJob::new(&cli.archive, output);
    if let Some(variant) = cli.variant {
        job = job.with_variant(variant);
    }

    let result = process_archive(&job)
        .with_context(|| format!("failed to process {}", cli.archive.display()))?;
    println!("{}: {}", result.artifact.display(), result.summary);
    Ok(())
}
