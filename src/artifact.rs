//! JSON Lines artifacts holding the kept records of one archive.
//!
//! One record per line, fields in struct order, dates as `YYYY-MM-DD`. The
//! same records always encode to the same bytes, so re-runs are
//! byte-identical and the CRC32 of an artifact identifies its content.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use grant_parser::PatentRecord;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Failures while writing or reading an artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The artifact file could not be created, written or read.
    #[error("artifact I/O failed for {path}")]
    Io {
        /// Artifact location.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// A record could not be encoded.
    #[error("failed to encode record {index}")]
    Encode {
        /// Position of the record in the archive's kept list.
        index: usize,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// A line of an existing artifact is not a record.
    #[error("invalid record at {path}:{line}")]
    Decode {
        /// Artifact location.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// What was written by [`write_artifact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    /// Artifact location.
    pub path: PathBuf,
    /// Number of records written.
    pub records: usize,
    /// CRC32 of the artifact bytes.
    pub checksum: u32,
}

/// Writes `records` to `path`, replacing any previous artifact.
///
/// Records go to a temporary file next to `path` that is renamed into place
/// once flushed, so a failed write never leaves a partial artifact behind.
/// An empty slice produces an empty file; that is a complete artifact.
pub fn write_artifact(
    path: &Path,
    records: &[PatentRecord],
) -> Result<ArtifactInfo, ArtifactError> {
    let io_error = |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(dir).map_err(io_error)?;
    let mut writer = BufWriter::new(staged);
    let mut hasher = crc32fast::Hasher::new();
    let mut line = Vec::new();
    for (index, record) in records.iter().enumerate() {
        line.clear();
        serde_json::to_writer(&mut line, record)
            .map_err(|source| ArtifactError::Encode { index, source })?;
        line.push(b'\n');
        hasher.update(&line);
        writer.write_all(&line).map_err(io_error)?;
    }
    let staged = writer.into_inner().map_err(|err| io_error(err.into_error()))?;
    staged.persist(path).map_err(|err| io_error(err.error))?;
    Ok(ArtifactInfo {
        path: path.to_path_buf(),
        records: records.len(),
        checksum: hasher.finalize(),
    })
}

/// Reads every record of an artifact in stored order. Blank lines are ignored.
pub fn read_artifact(path: &Path) -> Result<Vec<PatentRecord>, ArtifactError> {
    let io_error = |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_error)?);
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(io_error)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| ArtifactError::Decode {
            path: path.to_path_buf(),
            line: line_no + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}
