use std::io::{Cursor, Read};
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::IngestError;
use crate::source::{Batch, InboundPdf, passes_magic_check};

/// Returns true if the given path looks like a supported archive.
pub fn is_archive_path(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    name.ends_with(".zip") || name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Read an archive from disk and collect the PDFs inside it.
///
/// Type is detected by extension first, then by magic bytes. `max_size`
/// limits total extracted bytes (0 = unlimited); when it is reached,
/// collection stops and a warning is added to the batch.
pub fn read_archive(archive_path: &Path, max_size: u64) -> Result<Batch, IngestError> {
    let data = std::fs::read(archive_path).map_err(|source| IngestError::Io {
        path: archive_path.to_path_buf(),
        source,
    })?;

    let name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let batch = if name.ends_with(".zip") || data.starts_with(b"PK") {
        pdfs_from_zip(&data, max_size)?
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") || data.starts_with(&[0x1f, 0x8b])
    {
        pdfs_from_tar_gz(&data, max_size)?
    } else {
        return Err(IngestError::UnsupportedArchive(archive_path.to_path_buf()));
    };

    if batch.pdfs.is_empty() {
        return Err(IngestError::NoPdfs(archive_path.display().to_string()));
    }
    tracing::info!(
        archive = %archive_path.display(),
        pdfs = batch.pdfs.len(),
        warnings = batch.warnings.len(),
        "archive read"
    );
    Ok(batch)
}

/// Entries that are never timesheets: macOS resource forks, hidden files,
/// anything without a `.pdf` extension.
fn is_ignored(path: &Path) -> bool {
    if path.components().any(|c| c.as_os_str() == "__MACOSX") {
        return true;
    }
    match path.file_name() {
        None => true,
        Some(f) => {
            let f = f.to_string_lossy();
            f.starts_with('.') || !f.to_lowercase().ends_with(".pdf")
        }
    }
}

fn escapes_root(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}

/// Archive-relative name with `/` separators, so `jan/espelho.pdf` and
/// `fev/espelho.pdf` keep distinct object keys.
fn relative_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Shared bookkeeping for both archive formats.
struct Collector {
    max_size: u64,
    total_size: u64,
    batch: Batch,
}

impl Collector {
    fn new(max_size: u64) -> Self {
        Self {
            max_size,
            total_size: 0,
            batch: Batch::default(),
        }
    }

    /// Account for an entry of `size` bytes. False once the cap is exceeded.
    fn reserve(&mut self, size: u64) -> bool {
        if self.max_size == 0 {
            return true;
        }
        self.total_size = self.total_size.saturating_add(size);
        if self.total_size > self.max_size {
            let warning = format!(
                "Size limit ({}MB) reached after {} files, skipping remaining",
                self.max_size / 1024 / 1024,
                self.batch.pdfs.len()
            );
            tracing::warn!("{warning}");
            self.batch.warnings.push(warning);
            return false;
        }
        true
    }

    fn push(&mut self, path: &Path, content: Vec<u8>) {
        let filename = relative_name(path);
        if !passes_magic_check(&content) {
            self.batch
                .warnings
                .push(format!("skipping {filename}: not a PDF (missing %PDF- header)"));
            return;
        }
        self.batch.pdfs.push(InboundPdf { filename, content });
    }
}

/// Collect PDFs from an in-memory ZIP archive.
pub fn pdfs_from_zip(data: &[u8], max_size: u64) -> Result<Batch, IngestError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let mut collector = Collector::new(max_size);

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;

        // Path traversal attempts have no enclosed name
        let Some(path) = file.enclosed_name() else {
            continue;
        };
        let path = path.to_path_buf();
        if file.is_dir() || is_ignored(&path) {
            continue;
        }
        if !collector.reserve(file.size()) {
            break;
        }

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|source| IngestError::Io {
            path: path.clone(),
            source,
        })?;
        collector.push(&path, buf);
    }

    Ok(collector.batch)
}

/// Collect PDFs from an in-memory tar.gz archive.
pub fn pdfs_from_tar_gz(data: &[u8], max_size: u64) -> Result<Batch, IngestError> {
    let mut archive = Archive::new(GzDecoder::new(data));
    let mut collector = Collector::new(max_size);

    for entry in archive.entries().map_err(IngestError::Tar)? {
        let mut entry = entry.map_err(IngestError::Tar)?;
        let path = entry.path().map_err(IngestError::Tar)?.to_path_buf();

        if entry.header().entry_type().is_dir() || escapes_root(&path) || is_ignored(&path) {
            continue;
        }
        if !collector.reserve(entry.size()) {
            break;
        }

        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).map_err(IngestError::Tar)?;
        collector.push(&path, buf);
    }

    Ok(collector.batch)
}
