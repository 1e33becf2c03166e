//! Processes one bulk archive end to end.
//!
//! Members are read in listing order, split into documents, extracted and
//! filtered; the kept records of the whole archive are written as a single
//! artifact. Document and member problems never fail the archive. Only an
//! unopenable container or an unwritable artifact does.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;

use grant_parser::{
    extract_document, is_extractable, is_relevant, ClassificationMatch, DocumentSplitter,
    PatentRecord, SchemaVariant,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::artifact::{write_artifact, ArtifactError};

/// One archive and where its artifact goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveJob {
    /// Archive to read.
    pub archive: PathBuf,
    /// Artifact to write.
    pub artifact: PathBuf,
    /// Forces one schema variant for every member instead of choosing by name.
    pub variant: Option<SchemaVariant>,
}

impl ArchiveJob {
    /// Creates a job that selects variants by member name.
    pub fn new(archive: impl Into<PathBuf>, artifact: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            artifact: artifact.into(),
            variant: None,
        }
    }

    /// Forces `variant` for all members.
    pub fn with_variant(mut self, variant: SchemaVariant) -> Self {
        self.variant = Some(variant);
        self
    }

    /// Archive file name used in reports.
    pub fn name(&self) -> String {
        self.archive
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.archive.display().to_string())
    }
}

/// Counters gathered while processing an archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    /// Logical documents extracted.
    pub documents_seen: usize,
    /// Relevant records written to the artifact.
    pub records_kept: usize,
    /// Documents with at least one relevant international code.
    pub international_matches: usize,
    /// Documents with at least one relevant cooperative code.
    pub cooperative_matches: usize,
    /// Members that were split and extracted.
    pub members_processed: usize,
    /// Members passed over (directories, other extensions, empty files, unreadable entries).
    pub members_skipped: usize,
}

impl ArchiveSummary {
    /// Counts `record` and reports whether it should be kept.
    pub fn observe(&mut self, record: &PatentRecord) -> bool {
        let matched = ClassificationMatch::of(record);
        self.documents_seen += 1;
        if matched.international {
            self.international_matches += 1;
        }
        if matched.cooperative {
            self.cooperative_matches += 1;
        }
        let keep = is_relevant(record);
        if keep {
            self.records_kept += 1;
        }
        keep
    }

    /// Adds another archive's counters to this one.
    pub fn merge(&mut self, other: &ArchiveSummary) {
        self.documents_seen += other.documents_seen;
        self.records_kept += other.records_kept;
        self.international_matches += other.international_matches;
        self.cooperative_matches += other.cooperative_matches;
        self.members_processed += other.members_processed;
        self.members_skipped += other.members_skipped;
    }
}

impl fmt::Display for ArchiveSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} patents parsed, {} exported, {} with matching international classifications, {} with matching cooperative classifications",
            self.documents_seen,
            self.records_kept,
            self.international_matches,
            self.cooperative_matches
        )
    }
}

/// Result of a successfully processed archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutput {
    /// Artifact written for the archive.
    pub artifact: PathBuf,
    /// CRC32 of the artifact bytes.
    pub checksum: u32,
    /// Processing counters.
    pub summary: ArchiveSummary,
}

/// Failures that end an archive job.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive file could not be opened.
    #[error("cannot open archive {path}")]
    Open {
        /// Archive location.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The file is not a readable container.
    #[error("archive {path} is not a valid container")]
    Container {
        /// Archive location.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: ZipError,
    },
    /// The artifact could not be written.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Processes `job` and writes its artifact.
///
/// No artifact is created when the container cannot be opened. An archive
/// without relevant records still produces an (empty) artifact.
pub fn process_archive(job: &ArchiveJob) -> Result<ArchiveOutput, ArchiveError> {
    let file = File::open(&job.archive).map_err(|source| ArchiveError::Open {
        path: job.archive.clone(),
        source,
    })?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|source| {
        ArchiveError::Container {
            path: job.archive.clone(),
            source,
        }
    })?;

    let archive_name = job.name();
    let mut summary = ArchiveSummary::default();
    let mut kept = Vec::new();

    for index in 0..zip.len() {
        let entry = match zip.by_index(index) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(archive = %archive_name, index, error = %err, "skipping unreadable member");
                summary.members_skipped += 1;
                continue;
            }
        };
        let member = entry.name().to_string();
        if entry.is_dir() {
            summary.members_skipped += 1;
            continue;
        }
        if !is_extractable(&member) {
            debug!(
                archive = %archive_name,
                member = %member,
                "skipping member with unsupported extension"
            );
            summary.members_skipped += 1;
            continue;
        }
        if entry.size() == 0 {
            warn!(archive = %archive_name, member = %member, "skipping empty member");
            summary.members_skipped += 1;
            continue;
        }

        let variant = job
            .variant
            .unwrap_or_else(|| SchemaVariant::from_member_name(&member));
        debug!(archive = %archive_name, member = %member, %variant, "processing member");
        process_member(&archive_name, &member, variant, entry, &mut summary, &mut kept);
        summary.members_processed += 1;
    }

    let written = write_artifact(&job.artifact, &kept)?;
    info!(
        archive = %archive_name,
        artifact = %job.artifact.display(),
        documents_seen = summary.documents_seen,
        records_kept = summary.records_kept,
        international_matches = summary.international_matches,
        cooperative_matches = summary.cooperative_matches,
        members_skipped = summary.members_skipped,
        "archive processed"
    );
    Ok(ArchiveOutput {
        artifact: written.path,
        checksum: written.checksum,
        summary,
    })
}

fn process_member<R: Read>(
    archive: &str,
    member: &str,
    variant: SchemaVariant,
    stream: R,
    summary: &mut ArchiveSummary,
    kept: &mut Vec<PatentRecord>,
) {
    let splitter = DocumentSplitter::new(BufReader::new(stream), variant.split_strategy());
    for document in splitter {
        match document {
            Ok(document) => {
                let record = extract_document(variant, &document);
                if summary.observe(&record) {
                    kept.push(record);
                }
            }
            Err(err) => {
                warn!(archive, member, error = %err, "member stream ended early");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ArchiveJob, ArchiveSummary};
    use grant_parser::{DocumentType, PatentRecord};
    use pretty_assertions::assert_eq;

    fn record(kind: DocumentType, ipc: &[&str], cpc: &[&str]) -> PatentRecord {
        PatentRecord {
            document_type: kind,
            international_classifications: ipc.iter().map(|s| s.to_string()).collect(),
            cooperative_classifications: cpc.iter().map(|s| s.to_string()).collect(),
            ..PatentRecord::default()
        }
    }

    #[test]
    fn counts_matches_independently_of_type() {
        let mut summary = ArchiveSummary::default();
        assert!(summary.observe(&record(DocumentType::Utility, &["H01L21/00"], &[])));
        assert!(!summary.observe(&record(DocumentType::Design, &["G06F3/00"], &["Y02E10/50"])));
        assert!(!summary.observe(&record(DocumentType::Utility, &["A01B1/00"], &[])));
        assert_eq!(
            summary,
            ArchiveSummary {
                documents_seen: 3,
                records_kept: 1,
                international_matches: 2,
                cooperative_matches: 1,
                ..ArchiveSummary::default()
            }
        );
    }

    #[test]
    fn merges_counters() {
        let mut total = ArchiveSummary::default();
        let one = ArchiveSummary {
            documents_seen: 5,
            records_kept: 2,
            members_skipped: 1,
            ..ArchiveSummary::default()
        };
        total.merge(&one);
        total.merge(&one);
        assert_eq!(total.documents_seen, 10);
        assert_eq!(total.records_kept, 4);
        assert_eq!(total.members_skipped, 2);
    }

    #[test]
    fn job_name_is_the_archive_file_name() {
        let job = ArchiveJob::new("/data/raw/ipg140107.zip", "/data/out/ipg140107.jsonl");
        assert_eq!(job.name(), "ipg140107.zip");
    }
}
