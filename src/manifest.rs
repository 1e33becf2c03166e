//! Per-job manifest lines written after a batch for incremental re-runs.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::runtime::{JobOutcome, JobStatus};

/// Terminal state recorded for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestStatus {
    /// Artifact written.
    Completed,
    /// Job failed; no artifact.
    Failed,
}

/// Digest entry describing the outcome of one archive job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Archive file name.
    pub archive: String,
    /// Job state.
    pub status: ManifestStatus,
    /// Artifact path when completed.
    pub artifact: Option<String>,
    /// Artifact checksum (CRC32) when completed.
    pub checksum: Option<u32>,
    /// Documents seen in the archive.
    pub documents_seen: usize,
    /// Records written to the artifact.
    pub records_kept: usize,
    /// Failure description when failed.
    pub error: Option<String>,
}

impl ManifestRecord {
    /// Derives a manifest record from a job outcome.
    pub fn from_outcome(outcome: &JobOutcome) -> Self {
        match &outcome.status {
            JobStatus::Completed(output) => Self {
                archive: outcome.archive.clone(),
                status: ManifestStatus::Completed,
                artifact: Some(output.artifact.display().to_string()),
                checksum: Some(output.checksum),
                documents_seen: output.summary.documents_seen,
                records_kept: output.summary.records_kept,
                error: None,
            },
            JobStatus::Failed(message) => Self {
                archive: outcome.archive.clone(),
                status: ManifestStatus::Failed,
                artifact: None,
                checksum: None,
                documents_seen: 0,
                records_kept: 0,
                error: Some(message.clone()),
            },
        }
    }
}

/// Writes one manifest line per outcome, in the given order.
pub fn write_manifest(path: &Path, outcomes: &[JobOutcome]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for outcome in outcomes {
        serde_json::to_writer(&mut writer, &ManifestRecord::from_outcome(outcome))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Loads a manifest written by [`write_manifest`].
pub fn load_manifest(path: &Path) -> io::Result<Vec<ManifestRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::{load_manifest, write_manifest, ManifestRecord, ManifestStatus};
    use crate::archive::{ArchiveOutput, ArchiveSummary};
    use crate::runtime::{JobOutcome, JobStatus};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn round_trips_outcomes() {
        let outcomes = vec![
            JobOutcome {
                archive: "good.zip".to_string(),
                status: JobStatus::Completed(ArchiveOutput {
                    artifact: PathBuf::from("out/good.jsonl"),
                    checksum: 0xdead_beef,
                    summary: ArchiveSummary {
                        documents_seen: 4,
                        records_kept: 1,
                        ..ArchiveSummary::default()
                    },
                }),
            },
            JobOutcome {
                archive: "bad.zip".to_string(),
                status: JobStatus::Failed("archive bad.zip is not a valid container".to_string()),
            },
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.jsonl");
        write_manifest(&path, &outcomes).unwrap();

        let loaded = load_manifest(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].status, ManifestStatus::Completed);
        assert_eq!(loaded[0].checksum, Some(0xdead_beef));
        assert_eq!(loaded[0].records_kept, 1);
        assert_eq!(loaded[1], ManifestRecord::from_outcome(&outcomes[1]));
        assert_eq!(loaded[1].artifact, None);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.lines().nth(1).unwrap().contains("\"status\":\"failed\""));
    }
}
