#![warn(missing_docs)]
//! Parallel extraction of relevant patent grants from bulk archives.
//!
//! Each archive is processed on its own worker: members are split into
//! documents and extracted by [`grant_parser`], relevant records are kept,
//! and one JSON Lines artifact is written per archive.

pub mod archive;
pub mod artifact;
pub mod controls;
pub mod manifest;
pub mod runtime;

pub use archive::{process_archive, ArchiveError, ArchiveJob, ArchiveOutput, ArchiveSummary};
pub use artifact::{read_artifact, write_artifact, ArtifactError};
pub use controls::{BatchControls, Cli};
pub use grant_parser::{DocumentType, PatentRecord, SchemaVariant};
pub use manifest::ManifestRecord;
pub use runtime::{run as run_batch, BatchError, BatchReport, JobOutcome, JobStatus};

use tracing_subscriber::EnvFilter;

/// Installs the global log subscriber for the binaries.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`. Logs go to stderr so
/// the printed report stays on stdout.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
