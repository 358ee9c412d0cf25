use std::path::{Component, Path, PathBuf};

use ponto_core::Document;

use crate::SinkError;

/// Object name for the parsed form of `filename`: a trailing `.pdf`
/// (any case) becomes `.json`, and the optional `prefix` is prepended.
///
/// ```
/// use ponto_ingest::object_key;
/// assert_eq!(object_key("Espelho.PDF", Some("processed/")), "processed/Espelho.json");
/// ```
pub fn object_key(filename: &str, prefix: Option<&str>) -> String {
    let stem = match filename.len().checked_sub(4) {
        Some(cut)
            if filename.is_char_boundary(cut) && filename[cut..].eq_ignore_ascii_case(".pdf") =>
        {
            &filename[..cut]
        }
        _ => filename,
    };

    match prefix.map(|p| p.trim_end_matches('/')).filter(|p| !p.is_empty()) {
        Some(p) => format!("{p}/{stem}.json"),
        None => format!("{stem}.json"),
    }
}

/// Downstream collaborator boundary: accepts a document under a
/// caller-chosen key. An object-store uploader would implement this.
pub trait DocumentSink: Send + Sync {
    /// Store `document` under `key` and return where it went.
    fn deliver(&self, key: &str, document: &Document) -> Result<String, SinkError>;
}

/// Writes each document as a JSON file under a root directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    pretty: bool,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pretty: false,
        }
    }

    /// Indent the JSON output.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    fn target(&self, key: &str) -> Result<PathBuf, SinkError> {
        let rel = Path::new(key);
        let safe = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe || key.is_empty() {
            return Err(SinkError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl DocumentSink for DirectorySink {
    fn deliver(&self, key: &str, document: &Document) -> Result<String, SinkError> {
        let path = self.target(key)?;
        let body = if self.pretty {
            serde_json::to_vec_pretty(document)?
        } else {
            serde_json::to_vec(document)?
        };

        let io_err = |source| SinkError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&path, body).map_err(io_err)?;

        tracing::debug!(path = %path.display(), "document written");
        Ok(path.display().to_string())
    }
}
