use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use patentsift::manifest::{load_manifest, ManifestStatus};
use patentsift::{
    process_archive, read_artifact, run_batch, ArchiveJob, ArchiveSummary, BatchControls,
    DocumentType, JobStatus, SchemaVariant,
};

const LEGACY_PAIR: &str = "HHHHHT APS1\n\
PATN\n\
WKU  039305848\n\
APN  4855226\n\
APT  1\n\
APD  19740627\n\
TTL  Semiconductor wafer carrier\n\
ISD  19760106\n\
INVT\n\
NAM  Doe; Jane\n\
CLAS\n\
ICL  H01L21/00\n\
ABST\n\
PAL  A carrier for semiconductor wafers.\n\
PATN\n\
WKU  D02383209\n\
APN  5543210\n\
APT  4\n\
TTL  Ornamental lamp\n\
ISD  19760106\n";

const IPG_SAMPLE: &str = include_str!("../grant-parser/tests/fixtures/ipg_sample.xml");

fn write_zip(path: &Path, members: &[(&str, &str)]) -> PathBuf {
    let file = File::create(path).expect("create archive");
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, body) in members {
        zip.start_file(*name, options).expect("start member");
        zip.write_all(body.as_bytes()).expect("write member");
    }
    zip.finish().expect("finish archive");
    path.to_path_buf()
}

#[test]
fn keeps_only_the_relevant_legacy_grant() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_zip(
        &dir.path().join("pftaps19760106_wk01.zip"),
        &[("pftaps19760106_wk01.txt", LEGACY_PAIR)],
    );
    let job = ArchiveJob::new(&archive, dir.path().join("pftaps19760106_wk01.jsonl"));

    let output = process_archive(&job).unwrap();
    assert_eq!(
        output.summary,
        ArchiveSummary {
            documents_seen: 2,
            records_kept: 1,
            international_matches: 1,
            cooperative_matches: 0,
            members_processed: 1,
            members_skipped: 0,
        }
    );

    let records = read_artifact(&output.artifact).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].publication_number, "039305848");
    assert_eq!(records[0].document_type, DocumentType::Utility);
    assert_eq!(records[0].international_classifications, vec!["H01L21/00"]);
    assert_eq!(records[0].inventors, vec!["Jane Doe"]);
}

#[test]
fn reprocessing_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_zip(
        &dir.path().join("ipg140107.zip"),
        &[
            ("ipg140107.xml", IPG_SAMPLE),
            ("pftaps19760106_wk01.txt", LEGACY_PAIR),
        ],
    );
    let job = ArchiveJob::new(&archive, dir.path().join("ipg140107.jsonl"));

    let first = process_archive(&job).unwrap();
    let first_bytes = fs::read(&first.artifact).unwrap();
    let second = process_archive(&job).unwrap();
    let second_bytes = fs::read(&second.artifact).unwrap();

    assert_eq!(first.summary.records_kept, 2);
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(first.checksum, second.checksum);
    assert_eq!(first.checksum, crc32fast::hash(&first_bytes));

    // Member listing order is record order.
    let records = read_artifact(&first.artifact).unwrap();
    assert_eq!(records[0].publication_number, "US08621662B2");
    assert_eq!(records[1].publication_number, "039305848");
}

#[test]
fn archive_without_relevant_records_still_writes_an_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_zip(
        &dir.path().join("quiet.zip"),
        &[
            ("README.md", "weekly grant release"),
            ("ipg140114.xml", ""),
            ("pftaps19760113_wk02.txt", "HHHHHT APS1\nPATN\nWKU  D02383210\nAPT  4\n"),
        ],
    );
    let job = ArchiveJob::new(&archive, dir.path().join("quiet.jsonl"));

    let output = process_archive(&job).unwrap();
    assert_eq!(output.summary.documents_seen, 1);
    assert_eq!(output.summary.records_kept, 0);
    assert_eq!(output.summary.members_processed, 1);
    assert_eq!(output.summary.members_skipped, 2);
    assert!(output.artifact.exists());
    assert_eq!(fs::metadata(&output.artifact).unwrap().len(), 0);
}

#[test]
fn forced_variant_overrides_member_names() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_zip(&dir.path().join("renamed.zip"), &[("week01.txt", LEGACY_PAIR)]);

    let by_name = process_archive(&ArchiveJob::new(&archive, dir.path().join("a.jsonl"))).unwrap();
    assert_eq!(by_name.summary.records_kept, 0);

    let forced = ArchiveJob::new(&archive, dir.path().join("b.jsonl"))
        .with_variant(SchemaVariant::LegacyText);
    assert_eq!(process_archive(&forced).unwrap().summary.records_kept, 1);
}

#[test]
fn corrupt_archive_fails_alone() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    fs::write(input.path().join("broken.zip"), b"this is not a zip container").unwrap();
    write_zip(
        &input.path().join("pftaps19760106_wk01.zip"),
        &[("pftaps19760106_wk01.txt", LEGACY_PAIR)],
    );
    fs::write(input.path().join("notes.txt"), b"ignored").unwrap();

    let manifest = output.path().join("manifest.jsonl");
    let controls = BatchControls::new(input.path(), output.path())
        .with_workers(2)
        .with_manifest(&manifest);
    let report = run_batch(&controls).unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.completed(), 1);
    assert_eq!(report.failed(), 1);

    let broken = &report.outcomes[0];
    assert_eq!(broken.archive, "broken.zip");
    match &broken.status {
        JobStatus::Failed(message) => {
            assert!(message.contains("not a valid container"), "{message}")
        }
        JobStatus::Completed(_) => panic!("corrupt archive completed"),
    }
    assert!(!output.path().join("broken.jsonl").exists());

    let good = &report.outcomes[1];
    match &good.status {
        JobStatus::Completed(result) => {
            assert_eq!(result.artifact, output.path().join("pftaps19760106_wk01.jsonl"));
            assert_eq!(read_artifact(&result.artifact).unwrap().len(), 1);
        }
        JobStatus::Failed(message) => panic!("valid archive failed: {message}"),
    }

    let lines = load_manifest(&manifest).unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].status, ManifestStatus::Failed);
    assert_eq!(lines[1].status, ManifestStatus::Completed);
    assert_eq!(lines[1].records_kept, 1);
}

#[test]
fn skip_list_and_worker_recycling() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_zip(
        &input.path().join("pa030501.zip"),
        &[("pftaps20030501.txt", LEGACY_PAIR)],
    );
    for week in 1..=6 {
        write_zip(
            &input.path().join(format!("pftaps1976010{week}.zip")),
            &[("pftaps19760106_wk01.txt", LEGACY_PAIR)],
        );
    }

    let controls = BatchControls::new(input.path(), output.path())
        .with_workers(2)
        .with_jobs_per_worker(2);
    let report = run_batch(&controls).unwrap();

    assert_eq!(report.outcomes.len(), 6);
    assert_eq!(report.completed(), 6);
    assert_eq!(report.totals().documents_seen, 12);
    assert_eq!(report.totals().records_kept, 6);
    assert!(report.outcomes.iter().all(|o| o.archive != "pa030501.zip"));
    assert!(!output.path().join("pa030501.jsonl").exists());

    let names: Vec<&str> = report.outcomes.iter().map(|o| o.archive.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}
