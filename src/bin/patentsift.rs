use anyhow::{Context, Result};
use clap::Parser;
use patentsift::{init_tracing, run_batch, Cli};

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let controls = cli.build_controls();
    let report = run_batch(&controls).with_context(|| {
        format!(
            "batch over {} failed",
            controls.input_dir().display()
        )
    })?;
    report.report();
    Ok(())
}
