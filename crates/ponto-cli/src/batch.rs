use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use ponto_core::TextBackend;
use ponto_ingest::{DocumentSink, InboundPdf, object_key};
use ponto_parsing::TimesheetExtractor;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// What happened to one inbound PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Delivered { location: String },
    /// The source could not be opened; the error document was still delivered.
    ErrorDocument { location: String, message: String },
    WriteFailed { message: String },
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub filename: String,
    pub days: usize,
    pub records: usize,
    pub diagnostics: usize,
    pub status: FileStatus,
}

#[derive(Debug, Default)]
pub struct BatchTally {
    pub reports: Vec<FileReport>,
    /// Ingest warnings (skipped entries, size cap).
    pub warnings: usize,
}

impl BatchTally {
    fn count(&self, f: impl Fn(&FileStatus) -> bool) -> usize {
        self.reports.iter().filter(|r| f(&r.status)).count()
    }

    pub fn delivered(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Delivered { .. }))
    }

    pub fn error_documents(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::ErrorDocument { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::WriteFailed { .. }))
    }
}

/// Parse one PDF and hand its document to `sink`. Never fails: a failed
/// write is reported in the returned status.
pub fn process_one(
    extractor: &TimesheetExtractor,
    backend: &dyn TextBackend,
    sink: &dyn DocumentSink,
    pdf: &InboundPdf,
    prefix: Option<&str>,
) -> FileReport {
    let outcome = extractor.parse_bytes(&pdf.content, backend);
    for d in &outcome.diagnostics {
        tracing::warn!(file = %pdf.filename, diagnostic = %d, "parse diagnostic");
    }

    let document = &outcome.document;
    let key = object_key(&pdf.filename, prefix);
    let status = match sink.deliver(&key, document) {
        Ok(location) if document.is_error() => FileStatus::ErrorDocument {
            location,
            message: document.message.clone().unwrap_or_default(),
        },
        Ok(location) => FileStatus::Delivered { location },
        Err(e) => {
            tracing::error!(file = %pdf.filename, key = %key, error = %e, "delivery failed");
            FileStatus::WriteFailed {
                message: e.to_string(),
            }
        }
    };

    FileReport {
        filename: pdf.filename.clone(),
        days: document.days.len(),
        records: document.record_count(),
        diagnostics: outcome.diagnostics.len(),
        status,
    }
}

/// Parse every PDF concurrently (at most `workers` at a time) and deliver the
/// results. Ctrl-C stops scheduling and returns what has finished so far.
pub async fn run_batch(
    pdfs: Vec<InboundPdf>,
    extractor: Arc<TimesheetExtractor>,
    backend: Arc<dyn TextBackend>,
    sink: Arc<dyn DocumentSink>,
    prefix: Option<String>,
    workers: usize,
) -> anyhow::Result<BatchTally> {
    let bar = ProgressBar::new(pdfs.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let prefix: Arc<Option<String>> = Arc::new(prefix);
    let mut tasks = JoinSet::new();

    for pdf in pdfs {
        let semaphore = Arc::clone(&semaphore);
        let (extractor, backend, sink, prefix) = (
            Arc::clone(&extractor),
            Arc::clone(&backend),
            Arc::clone(&sink),
            Arc::clone(&prefix),
        );
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let report = tokio::task::spawn_blocking(move || {
                process_one(
                    &extractor,
                    backend.as_ref(),
                    sink.as_ref(),
                    &pdf,
                    prefix.as_deref(),
                )
            })
            .await?;
            Ok::<_, anyhow::Error>(report)
        });
    }

    let mut tally = BatchTally::default();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            next = tasks.join_next() => {
                let Some(joined) = next else { break };
                let report = joined??;
                bar.set_message(report.filename.clone());
                bar.inc(1);
                tally.reports.push(report);
            }
            _ = &mut ctrl_c => {
                tracing::warn!(done = tally.reports.len(), "interrupted, abandoning remaining files");
                tasks.abort_all();
                bar.abandon_with_message("interrupted");
                return Ok(tally);
            }
        }
    }

    bar.finish_and_clear();
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponto_core::{BackendError, Document, PlainTextBackend};
    use ponto_ingest::{DirectorySink, SinkError};

    const TIMESHEET: &str = "\
Espelho de Ponto
Colaborador(a): Jane Doe (Matrícula: 12345)
01/08/2025  Trabalho  -  -  -  08:00  17:00  01:00  8:00
02/08/2025  Compensado
";

    struct BrokenSink;

    impl DocumentSink for BrokenSink {
        fn deliver(&self, _key: &str, _document: &Document) -> Result<String, SinkError> {
            Err(SinkError::InvalidKey("nope".to_string()))
        }
    }

    struct RejectingBackend;

    impl TextBackend for RejectingBackend {
        fn extract_pages(&self, _content: &[u8]) -> Result<Vec<String>, BackendError> {
            Err(BackendError::OpenError("encrypted".to_string()))
        }
    }

    fn pdf(name: &str, body: &str) -> InboundPdf {
        InboundPdf {
            filename: name.to_string(),
            content: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_process_one_delivers() {
        let out = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(out.path());
        let report = process_one(
            &TimesheetExtractor::new(),
            &PlainTextBackend,
            &sink,
            &pdf("Espelho.pdf", TIMESHEET),
            Some("processed/"),
        );

        assert_eq!(report.days, 2);
        assert_eq!(report.records, 2);
        assert!(matches!(report.status, FileStatus::Delivered { .. }));
        assert!(out.path().join("processed/Espelho.json").exists());
    }

    #[test]
    fn test_process_one_error_document_still_delivered() {
        let out = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(out.path());
        let report = process_one(
            &TimesheetExtractor::new(),
            &RejectingBackend,
            &sink,
            &pdf("locked.pdf", "%PDF-1.7"),
            None,
        );

        match report.status {
            FileStatus::ErrorDocument { message, .. } => assert!(message.contains("encrypted")),
            other => panic!("unexpected status {other:?}"),
        }
        assert!(out.path().join("locked.json").exists());
    }

    #[test]
    fn test_process_one_write_failure_reported() {
        let report = process_one(
            &TimesheetExtractor::new(),
            &PlainTextBackend,
            &BrokenSink,
            &pdf("a.pdf", TIMESHEET),
            None,
        );
        assert!(matches!(report.status, FileStatus::WriteFailed { .. }));
    }

    #[tokio::test]
    async fn test_run_batch_continues_after_failure() {
        let out = tempfile::tempdir().unwrap();
        let sink: Arc<dyn DocumentSink> = Arc::new(DirectorySink::new(out.path()));
        let pdfs = vec![
            pdf("a.pdf", TIMESHEET),
            pdf("b.pdf", ""),
            pdf("c.pdf", TIMESHEET),
        ];

        let tally = run_batch(
            pdfs,
            Arc::new(TimesheetExtractor::new()),
            Arc::new(PlainTextBackend),
            sink,
            None,
            2,
        )
        .await
        .unwrap();

        assert_eq!(tally.reports.len(), 3);
        assert_eq!(tally.delivered(), 2);
        assert_eq!(tally.error_documents(), 1);
        assert_eq!(tally.failed(), 0);
    }
}
