use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("document is empty")]
    EmptyInput,
    #[error("failed to open document: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for text extraction backends.
///
/// Implementors turn the raw bytes of a source document into one string per
/// page. The parsing pipeline (line classification, day aggregation, header
/// and summary extraction) lives in `ponto_parsing::TimesheetExtractor`.
pub trait TextBackend: Send + Sync {
    /// Extract the text of every page, in page order.
    fn extract_pages(&self, content: &[u8]) -> Result<Vec<String>, BackendError>;

    /// Read a file from disk and extract its pages.
    fn extract_pages_from_path(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        let content = std::fs::read(path)?;
        self.extract_pages(&content)
    }
}

/// Backend for documents whose text was already extracted upstream.
///
/// The content must be UTF-8. Form feeds (`\x0C`) separate pages, which is
/// what `pdftotext` and most extraction tools emit.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextBackend;

impl TextBackend for PlainTextBackend {
    fn extract_pages(&self, content: &[u8]) -> Result<Vec<String>, BackendError> {
        if content.is_empty() {
            return Err(BackendError::EmptyInput);
        }
        let text = std::str::from_utf8(content)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

        let mut pages: Vec<String> = text.split('\u{000C}').map(str::to_string).collect();
        // A trailing form feed closes the last page rather than opening a new one
        if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
            pages.pop();
        }
        Ok(pages)
    }
}
