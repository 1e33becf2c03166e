//! Batch coordinator: enumerates archives and drives the worker pool.
//!
//! Jobs sit in one shared queue. Each worker thread takes at most
//! `jobs_per_worker` jobs and then retires; the coordinator replaces retired
//! workers while jobs remain, so no extraction state outlives its worker.
//! Outcomes are collected in arrival order and sorted by archive name for
//! the report.

use std::any::Any;
use std::error::Error as StdError;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::archive::{process_archive, ArchiveJob, ArchiveOutput, ArchiveSummary};
use crate::controls::BatchControls;
use crate::manifest::write_manifest;

/// Terminal state of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Artifact written.
    Completed(ArchiveOutput),
    /// Job failed with the given description; no artifact was written.
    Failed(String),
}

/// Outcome of one archive job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    /// Archive file name.
    pub archive: String,
    /// How the job ended.
    pub status: JobStatus,
}

impl JobOutcome {
    /// Whether the job produced an artifact.
    pub fn is_completed(&self) -> bool {
        matches!(self.status, JobStatus::Completed(_))
    }
}

/// Failures that stop a batch before or while it runs.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The input directory could not be listed.
    #[error("cannot list input directory {path}")]
    ReadInput {
        /// Input directory.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The output directory could not be created.
    #[error("cannot create output directory {path}")]
    CreateOutput {
        /// Output directory.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// A worker thread could not be started.
    #[error("failed to spawn worker {worker_id}")]
    Spawn {
        /// Identifier of the worker.
        worker_id: usize,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// All workers are gone while outcomes are still missing.
    #[error("worker pool stopped after {received} of {expected} job(s)")]
    WorkersLost {
        /// Jobs dispatched.
        expected: usize,
        /// Outcomes received.
        received: usize,
    },
    /// The manifest could not be written.
    #[error("cannot write manifest {path}")]
    Manifest {
        /// Manifest location.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Result of a batch run, sorted by archive name.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One outcome per enumerated archive.
    pub outcomes: Vec<JobOutcome>,
    /// Wall-clock duration of the batch.
    pub elapsed: Duration,
}

impl BatchReport {
    /// Number of jobs that wrote an artifact.
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_completed()).count()
    }

    /// Number of jobs that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.completed()
    }

    /// Counters summed over completed jobs.
    pub fn totals(&self) -> ArchiveSummary {
        let mut totals = ArchiveSummary::default();
        for outcome in &self.outcomes {
            if let JobStatus::Completed(output) = &outcome.status {
                totals.merge(&output.summary);
            }
        }
        totals
    }

    /// Prints the per-archive status list and aggregate counters.
    pub fn report(&self) {
        let secs = self.elapsed.as_secs_f32().max(f32::EPSILON);
        let totals = self.totals();
        println!("--- patentsift batch ({secs:.2}s) ---");
        for outcome in &self.outcomes {
            match &outcome.status {
                JobStatus::Completed(output) => println!(
                    "{}: {} ({})",
                    outcome.archive,
                    output.artifact.display(),
                    output.summary
                ),
                JobStatus::Failed(message) => println!("{}: error ({message})", outcome.archive),
            }
        }
        println!(
            "archives: {} completed, {} failed",
            self.completed(),
            self.failed()
        );
        println!("documents seen: {}", totals.documents_seen);
        println!("documents/sec: {:.2}", totals.documents_seen as f32 / secs);
        println!("records kept: {}", totals.records_kept);
        println!("international matches: {}", totals.international_matches);
        println!("cooperative matches: {}", totals.cooperative_matches);
        println!("members skipped: {}", totals.members_skipped);
    }
}

/// Lists the archives of a batch, sorted by path, and prepares the output
/// directory.
pub fn discover_jobs(controls: &BatchControls) -> Result<Vec<ArchiveJob>, BatchError> {
    let output_dir = controls.output_dir();
    fs::create_dir_all(output_dir).map_err(|source| BatchError::CreateOutput {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let input_dir = controls.input_dir();
    let read_error = |source| BatchError::ReadInput {
        path: input_dir.to_path_buf(),
        source,
    };
    let mut jobs = Vec::new();
    for entry in fs::read_dir(input_dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if !path.is_file() || !controls.has_archive_extension(&path) {
            continue;
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if controls.is_skipped(&name) {
            info!(archive = %name, "skipping listed archive");
            continue;
        }
        let artifact = controls.artifact_path(&path);
        jobs.push(ArchiveJob::new(path, artifact));
    }
    jobs.sort_by(|a, b| a.archive.cmp(&b.archive));
    Ok(jobs)
}

/// Runs a whole batch as configured by `controls`.
pub fn run(controls: &BatchControls) -> Result<BatchReport, BatchError> {
    let started = Instant::now();
    let jobs = discover_jobs(controls)?;
    info!(
        archives = jobs.len(),
        workers = controls.workers(),
        jobs_per_worker = controls.jobs_per_worker(),
        "starting batch"
    );

    let mut outcomes = run_jobs(jobs, controls.workers(), controls.jobs_per_worker())?;
    outcomes.sort_by(|a, b| a.archive.cmp(&b.archive));

    if let Some(path) = controls.manifest() {
        write_manifest(path, &outcomes).map_err(|source| BatchError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
    }

    Ok(BatchReport {
        outcomes,
        elapsed: started.elapsed(),
    })
}

enum WorkerEvent {
    Finished(JobOutcome),
    Retired { worker_id: usize },
}

/// Processes `jobs` on a pool of `workers` threads, each retiring after
/// `jobs_per_worker` jobs. Returns outcomes in completion order.
pub fn run_jobs(
    jobs: Vec<ArchiveJob>,
    workers: usize,
    jobs_per_worker: usize,
) -> Result<Vec<JobOutcome>, BatchError> {
    let total = jobs.len();
    let workers = workers.max(1);
    let budget = jobs_per_worker.max(1);

    let (job_tx, job_rx) = unbounded::<ArchiveJob>();
    let (event_tx, event_rx) = unbounded::<WorkerEvent>();
    for job in jobs {
        // The coordinator holds `job_rx`, so the queue cannot be disconnected here.
        if job_tx.send(job).is_err() {
            return Err(BatchError::WorkersLost {
                expected: total,
                received: 0,
            });
        }
    }
    drop(job_tx);

    let mut next_worker_id = 0usize;
    let mut live = 0usize;
    for _ in 0..workers.min(total) {
        spawn_worker(next_worker_id, &job_rx, &event_tx, budget)?;
        next_worker_id += 1;
        live += 1;
    }

    let mut outcomes = Vec::with_capacity(total);
    while outcomes.len() < total {
        let event = event_rx.recv().map_err(|_| BatchError::WorkersLost {
            expected: total,
            received: outcomes.len(),
        })?;
        match event {
            WorkerEvent::Finished(outcome) => outcomes.push(outcome),
            WorkerEvent::Retired { worker_id } => {
                live -= 1;
                debug!(worker_id, "worker retired");
                if !job_rx.is_empty() {
                    spawn_worker(next_worker_id, &job_rx, &event_tx, budget)?;
                    next_worker_id += 1;
                    live += 1;
                } else if live == 0 && outcomes.len() < total {
                    return Err(BatchError::WorkersLost {
                        expected: total,
                        received: outcomes.len(),
                    });
                }
            }
        }
    }
    Ok(outcomes)
}

fn spawn_worker(
    worker_id: usize,
    jobs: &Receiver<ArchiveJob>,
    events: &Sender<WorkerEvent>,
    budget: usize,
) -> Result<(), BatchError> {
    let jobs = jobs.clone();
    let events = events.clone();
    thread::Builder::new()
        .name(format!("patentsift-worker-{worker_id}"))
        .spawn(move || worker_loop(worker_id, jobs, events, budget))
        .map(|_| ())
        .map_err(|source| BatchError::Spawn { worker_id, source })
}

fn worker_loop(
    worker_id: usize,
    jobs: Receiver<ArchiveJob>,
    events: Sender<WorkerEvent>,
    budget: usize,
) {
    for job in jobs.iter().take(budget) {
        let outcome = run_job(worker_id, &job);
        if events.send(WorkerEvent::Finished(outcome)).is_err() {
            return;
        }
    }
    let _ = events.send(WorkerEvent::Retired { worker_id });
}

fn run_job(worker_id: usize, job: &ArchiveJob) -> JobOutcome {
    let archive = job.name();
    debug!(worker_id, archive = %archive, "job started");
    let status = match panic::catch_unwind(AssertUnwindSafe(|| process_archive(job))) {
        Ok(Ok(output)) => JobStatus::Completed(output),
        Ok(Err(err)) => {
            let message = describe(&err);
            warn!(worker_id, archive = %archive, error = %message, "archive failed");
            JobStatus::Failed(message)
        }
        Err(payload) => {
            let message = format!("worker panicked: {}", panic_message(payload.as_ref()));
            error!(worker_id, archive = %archive, error = %message, "archive job panicked");
            JobStatus::Failed(message)
        }
    };
    JobOutcome { archive, status }
}

/// Error message followed by its source chain.
fn describe(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
