//! Batch inputs, pool sizing and archive selection knobs.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::thread;

/// Container extension enumerated by default.
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "zip";
/// Archives skipped by default; this weekly file is a known-corrupt container.
pub const DEFAULT_SKIP_LIST: &str = "pa030501.zip";
/// Extension of the per-archive record artifact.
pub const ARTIFACT_EXTENSION: &str = "jsonl";

/// Validated settings for one batch run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchControls {
    input_dir: PathBuf,
    output_dir: PathBuf,
    workers: usize,
    jobs_per_worker: usize,
    extension: String,
    skip: Vec<String>,
    manifest: Option<PathBuf>,
}

impl BatchControls {
    /// Creates controls for `input_dir` with default pool and filter settings.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            workers: default_pool_size(),
            jobs_per_worker: 1,
            extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
            skip: split_list(DEFAULT_SKIP_LIST),
            manifest: None,
        }
    }

    /// Sets the pool size; zero selects [`default_pool_size`].
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 {
            default_pool_size()
        } else {
            workers
        };
        self
    }

    /// Sets how many jobs a worker handles before it is replaced (minimum one).
    pub fn with_jobs_per_worker(mut self, jobs: usize) -> Self {
        self.jobs_per_worker = jobs.max(1);
        self
    }

    /// Sets the container extension, with or without a leading dot.
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim().trim_start_matches('.').to_string();
        self
    }

    /// Replaces the list of archive file names to skip.
    pub fn with_skip_list(mut self, names: Vec<String>) -> Self {
        self.skip = names;
        self
    }

    /// Requests a JSON Lines manifest of job outcomes at `path`.
    pub fn with_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest = Some(path.into());
        self
    }

    /// Directory scanned for archives.
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Directory receiving one artifact per archive.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Number of worker threads in the pool.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Jobs processed by one worker instance before it retires.
    pub fn jobs_per_worker(&self) -> usize {
        self.jobs_per_worker
    }

    /// Container extension without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Archive file names that are never enumerated.
    pub fn skip_list(&self) -> &[String] {
        &self.skip
    }

    /// Optional manifest output path.
    pub fn manifest(&self) -> Option<&Path> {
        self.manifest.as_deref()
    }

    /// Whether `file_name` is on the skip list.
    pub fn is_skipped(&self, file_name: &str) -> bool {
        self.skip.iter().any(|skipped| skipped == file_name)
    }

    /// Whether `path` carries the configured container extension.
    pub fn has_archive_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }

    /// Artifact location for an archive: its file stem plus the artifact
    /// extension, inside the output directory.
    pub fn artifact_path(&self, archive: &Path) -> PathBuf {
        artifact_path_in(&self.output_dir, archive)
    }
}

/// Artifact location for `archive` inside `output_dir`.
pub fn artifact_path_in(output_dir: &Path, archive: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    output_dir.join(format!("{stem}.{ARTIFACT_EXTENSION}"))
}

/// Available parallelism minus one, never below one.
pub fn default_pool_size() -> usize {
    thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// Command-line interface of the batch binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "patentsift",
    about = "Extract relevant patent grants from a directory of bulk archives"
)]
pub struct Cli {
    /// Directory containing the bulk archives
    #[arg(long, env = "PATENTSIFT_INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Directory receiving one JSON Lines artifact per archive
    #[arg(long, env = "PATENTSIFT_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Worker threads (0 = available parallelism minus one)
    #[arg(long, env = "PATENTSIFT_WORKERS", default_value_t = 0)]
    pub workers: usize,

    /// Archives a worker processes before it is replaced
    #[arg(long, env = "PATENTSIFT_JOBS_PER_WORKER", default_value_t = 1)]
    pub jobs_per_worker: usize,

    /// Archive file names to skip, comma separated
    #[arg(long, env = "PATENTSIFT_SKIP", default_value = DEFAULT_SKIP_LIST)]
    pub skip: String,

    /// Container extension to enumerate
    #[arg(long, env = "PATENTSIFT_EXTENSION", default_value = DEFAULT_ARCHIVE_EXTENSION)]
    pub extension: String,

    /// Optional JSON Lines manifest of job outcomes
    #[arg(long, env = "PATENTSIFT_MANIFEST")]
    pub manifest: Option<PathBuf>,
}

impl Cli {
    /// Converts the parsed CLI into `BatchControls`.
    pub fn build_controls(&self) -> BatchControls {
        let controls = BatchControls::new(&self.input_dir, &self.output_dir)
            .with_workers(self.workers)
            .with_jobs_per_worker(self.jobs_per_worker)
            .with_extension(&self.extension)
            .with_skip_list(split_list(&self.skip));
        match &self.manifest {
            Some(path) => controls.with_manifest(path),
            None => controls,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
