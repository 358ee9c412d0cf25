//! Source and sink tests over real archives written to temporary directories.
//!
//! Run with:
//!   cargo test -p ponto-ingest --test sources

use std::io::{Cursor, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use ponto_core::Document;
use ponto_ingest::{
    DirectorySink, DocumentSink, IngestError, LocalSource, PdfSource, object_key,
};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const PDF: &[u8] = b"%PDF-1.4\n%fake timesheet\n";

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn tar_gz_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    let tar_data = builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_data).unwrap();
    encoder.finish().unwrap()
}

fn write(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

fn filenames(source: &LocalSource) -> Vec<String> {
    source
        .fetch()
        .unwrap()
        .pdfs
        .into_iter()
        .map(|p| p.filename)
        .collect()
}

// ---------------------------------------------------------------------------
// Archives
// ---------------------------------------------------------------------------

#[test]
fn test_zip_source_filters_entries() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write(
        dir.path(),
        "inbox.zip",
        &zip_bytes(&[
            ("agosto/espelho_jane.pdf", PDF),
            ("__MACOSX/agosto/._espelho_jane.pdf", PDF),
            ("agosto/.hidden.pdf", PDF),
            ("agosto/leia-me.txt", b"not a pdf"),
            ("agosto/ESPELHO_JOAO.PDF", PDF),
        ]),
    );

    let source = LocalSource::from_path(&archive, 0);
    assert_eq!(filenames(&source), vec!["agosto/espelho_jane.pdf", "agosto/ESPELHO_JOAO.PDF"]);
}

#[test]
fn test_zip_entry_without_pdf_header_is_warning() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write(
        dir.path(),
        "inbox.zip",
        &zip_bytes(&[("fake.pdf", b"<html>"), ("real.pdf", PDF)]),
    );

    let batch = LocalSource::from_path(&archive, 0).fetch().unwrap();
    assert_eq!(batch.pdfs.len(), 1);
    assert_eq!(batch.pdfs[0].content, PDF);
    assert_eq!(batch.warnings.len(), 1);
}

#[test]
fn test_tar_gz_source() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write(
        dir.path(),
        "batch.tar.gz",
        &tar_gz_bytes(&[("a/espelho1.pdf", PDF), ("a/notes.md", b"# x"), ("espelho2.pdf", PDF)]),
    );

    let source = LocalSource::from_path(&archive, 0);
    assert_eq!(filenames(&source), vec!["a/espelho1.pdf", "espelho2.pdf"]);
}

#[test]
fn test_same_name_in_different_folders_keeps_both_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let archive = write(
        dir.path(),
        "inbox.zip",
        &zip_bytes(&[("jan/espelho.pdf", PDF), ("fev/espelho.pdf", PDF)]),
    );

    let batch = LocalSource::from_path(&archive, 0).fetch().unwrap();
    assert!(batch.warnings.is_empty());
    let keys: Vec<_> = batch
        .pdfs
        .iter()
        .map(|p| object_key(&p.filename, Some("processed/")))
        .collect();
    assert_eq!(keys, vec!["processed/jan/espelho.json", "processed/fev/espelho.json"]);

    let sink = DirectorySink::new(output.path());
    for key in &keys {
        sink.deliver(key, &Document::error("placeholder")).unwrap();
    }
    assert!(output.path().join("processed/jan/espelho.json").exists());
    assert!(output.path().join("processed/fev/espelho.json").exists());
}

#[test]
fn test_size_cap_stops_collection() {
    let dir = tempfile::tempdir().unwrap();
    let big = [PDF, &[b'x'; 1024][..]].concat();
    let archive = write(
        dir.path(),
        "batch.tgz",
        &tar_gz_bytes(&[("one.pdf", &big), ("two.pdf", &big)]),
    );

    let cap = big.len() as u64 + 10;
    let batch = LocalSource::from_path(&archive, cap).fetch().unwrap();
    assert_eq!(batch.pdfs.len(), 1);
    assert!(batch.warnings[0].contains("Size limit"));
}

#[test]
fn test_archive_without_pdfs_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write(dir.path(), "empty.zip", &zip_bytes(&[("readme.txt", b"hi")]));
    let err = LocalSource::from_path(&archive, 0).fetch().unwrap_err();
    assert!(matches!(err, IngestError::NoPdfs(_)));
}

#[test]
fn test_unknown_archive_bytes_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write(dir.path(), "odd.zip", b"definitely not an archive");
    let err = LocalSource::from_path(&archive, 0).fetch().unwrap_err();
    assert!(matches!(err, IngestError::Zip(_)));
}

// ---------------------------------------------------------------------------
// Directories and files
// ---------------------------------------------------------------------------

#[test]
fn test_directory_source_sorted() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "b.pdf", PDF);
    write(dir.path(), "a.PDF", PDF);
    write(dir.path(), ".c.pdf", PDF);
    write(dir.path(), "d.txt", b"text");
    write(dir.path(), "e.pdf", b"broken");
    std::fs::create_dir(dir.path().join("sub.pdf")).unwrap();

    let batch = LocalSource::from_path(dir.path(), 0).fetch().unwrap();
    let names: Vec<_> = batch.pdfs.iter().map(|p| p.filename.as_str()).collect();
    assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    assert_eq!(batch.warnings.len(), 1);
}

#[test]
fn test_empty_directory_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = LocalSource::from_path(dir.path(), 0).fetch().unwrap_err();
    assert!(matches!(err, IngestError::NoPdfs(_)));
}

#[test]
fn test_single_file_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "espelho.pdf", PDF);
    let batch = LocalSource::from_path(&path, 0).fetch().unwrap();
    assert_eq!(batch.pdfs.len(), 1);
    assert_eq!(batch.pdfs[0].filename, "espelho.pdf");
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

#[test]
fn test_fetch_then_deliver() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(input.path(), "Espelho_Agosto.PDF", PDF);

    let batch = LocalSource::from_path(input.path(), 0).fetch().unwrap();
    let sink = DirectorySink::new(output.path());
    for pdf in &batch.pdfs {
        let key = object_key(&pdf.filename, Some("processed/"));
        sink.deliver(&key, &Document::error("placeholder")).unwrap();
    }

    let written = output.path().join("processed").join("Espelho_Agosto.json");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(written).unwrap()).unwrap();
    assert_eq!(json["error"], true);
    assert_eq!(json["daily_records"], serde_json::json!([]));
}
