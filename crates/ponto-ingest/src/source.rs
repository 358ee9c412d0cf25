use std::path::{Path, PathBuf};

use crate::IngestError;
use crate::archive::{is_archive_path, read_archive};

/// One PDF handed to the parser: the attachment filename and its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPdf {
    pub filename: String,
    pub content: Vec<u8>,
}

/// PDFs gathered from a source, plus anything skipped along the way.
#[derive(Debug, Default)]
pub struct Batch {
    pub pdfs: Vec<InboundPdf>,
    pub warnings: Vec<String>,
}

/// Upstream collaborator boundary. A mailbox poller would implement this by
/// returning unread attachments; the local implementations read from disk.
pub trait PdfSource: Send + Sync {
    fn fetch(&self) -> Result<Batch, IngestError>;
}

/// PDFs must start with `%PDF-`.
pub(crate) fn passes_magic_check(data: &[u8]) -> bool {
    data.starts_with(b"%PDF-")
}

/// Files, directories and archives on the local filesystem.
#[derive(Debug, Clone)]
pub enum LocalSource {
    File(PathBuf),
    Directory(PathBuf),
    Archive {
        path: PathBuf,
        /// Total extracted bytes allowed (0 = unlimited).
        max_size: u64,
    },
}

impl LocalSource {
    /// Pick the source kind for `path`: directory, archive, or single file.
    pub fn from_path(path: impl Into<PathBuf>, max_size: u64) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::Directory(path)
        } else if is_archive_path(&path) {
            Self::Archive { path, max_size }
        } else {
            Self::File(path)
        }
    }
}

impl PdfSource for LocalSource {
    fn fetch(&self) -> Result<Batch, IngestError> {
        match self {
            Self::File(path) => Ok(Batch {
                pdfs: vec![load_file(path)?],
                warnings: Vec::new(),
            }),
            Self::Directory(dir) => load_dir(dir),
            Self::Archive { path, max_size } => read_archive(path, *max_size),
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>, IngestError> {
    std::fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a single PDF from disk.
pub fn load_file(path: &Path) -> Result<InboundPdf, IngestError> {
    let filename = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let content = read(path)?;
    if !passes_magic_check(&content) {
        return Err(IngestError::NotPdf(filename));
    }
    Ok(InboundPdf { filename, content })
}

/// Load every `.pdf` directly inside `dir`, in filename order.
///
/// Hidden files and subdirectories are skipped. Files with a `.pdf`
/// extension that fail the magic check become warnings.
pub fn load_dir(dir: &Path) -> Result<Batch, IngestError> {
    let io_err = |source| IngestError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        if path.is_file() && !name.starts_with('.') && name.to_lowercase().ends_with(".pdf") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut batch = Batch::default();
    for path in paths {
        match load_file(&path) {
            Ok(pdf) => batch.pdfs.push(pdf),
            Err(e @ IngestError::NotPdf(_)) => {
                tracing::warn!(path = %path.display(), "skipping file without PDF header");
                batch.warnings.push(e.to_string());
            }
            Err(e) => return Err(e),
        }
    }

    if batch.pdfs.is_empty() {
        return Err(IngestError::NoPdfs(dir.display().to_string()));
    }
    tracing::info!(dir = %dir.display(), pdfs = batch.pdfs.len(), "directory read");
    Ok(batch)
}
