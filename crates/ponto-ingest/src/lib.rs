use std::path::PathBuf;

use thiserror::Error;

pub mod archive;
pub mod sink;
pub mod source;

pub use archive::is_archive_path;
pub use sink::{DirectorySink, DocumentSink, object_key};
pub use source::{Batch, InboundPdf, LocalSource, PdfSource};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open ZIP: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to read tar.gz: {0}")]
    Tar(#[source] std::io::Error),
    #[error("unsupported archive format: {}", .0.display())]
    UnsupportedArchive(PathBuf),
    #[error("{0} is not a PDF (missing %PDF- header)")]
    NotPdf(String),
    #[error("no PDF files found in {0}")]
    NoPdfs(String),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("refusing to write outside the output directory: {0}")]
    InvalidKey(String),
    #[error("failed to serialize document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
