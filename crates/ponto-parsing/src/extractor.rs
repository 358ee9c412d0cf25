use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use ponto_core::{Document, HeaderInfo, Metadata, TextBackend};
use thiserror::Error;

use crate::ParsingError;
use crate::aggregator::{Aggregation, aggregate};
use crate::classifier::{self, LineKind};
use crate::config::ParsingConfig;
use crate::diagnostics::{Diagnostic, Stage};
use crate::{header, summary};

/// A parsed document plus the non-fatal problems met while producing it.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    fn failed(message: String) -> Self {
        tracing::warn!(error = %message, "document could not be opened");
        Self {
            diagnostics: vec![Diagnostic::stage(Stage::Extraction, message.clone())],
            document: Document::error(message),
        }
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

#[derive(Error, Debug)]
enum StageError {
    #[error(transparent)]
    Parsing(#[from] ParsingError),
    #[error("panicked: {0}")]
    Panicked(String),
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn run_stage<T>(f: impl FnOnce() -> Result<T, ParsingError>) -> Result<T, StageError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|p| StageError::Panicked(panic_message(p)))?
        .map_err(StageError::from)
}

/// Run one sub-extraction; on failure record a diagnostic and return the
/// neutral default.
fn attempt<T: Default>(
    stage: Stage,
    diagnostics: &mut Vec<Diagnostic>,
    f: impl FnOnce() -> Result<T, ParsingError>,
) -> T {
    match run_stage(f) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(%stage, error = %e, "stage failed, substituting default");
            diagnostics.push(Diagnostic::stage(stage, e.to_string()));
            T::default()
        }
    }
}

/// A configurable timesheet extraction pipeline.
///
/// Holds a [`ParsingConfig`] and exposes each pipeline step as a method.
/// The default constructor uses built-in defaults; use
/// [`TimesheetExtractor::with_config`] to supply custom markers and patterns.
///
/// Only a failure to read the source produces an error document. Every
/// later stage is guarded: a failure there leaves that part of the document
/// at its neutral default and adds a [`Diagnostic`].
#[derive(Debug, Clone, Default)]
pub struct TimesheetExtractor {
    config: ParsingConfig,
}

impl TimesheetExtractor {
    /// Create an extractor with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with a custom configuration.
    pub fn with_config(config: ParsingConfig) -> Self {
        Self { config }
    }

    /// Get a reference to the current config.
    pub fn config(&self) -> &ParsingConfig {
        &self.config
    }

    /// Split text into trimmed non-empty lines (step 1).
    pub fn split_lines(&self, text: &str) -> Vec<String> {
        classifier::split_lines(text)
    }

    /// Classify a single line given whether a day is currently open (step 2).
    pub fn classify_line(&self, line: &str, day_open: bool) -> LineKind {
        classifier::classify(line, day_open, &self.config)
    }

    /// Group lines into days (step 3).
    pub fn aggregate_days(&self, lines: &[String]) -> Aggregation {
        aggregate(lines, &self.config)
    }

    /// Scan the full text for employee and period headers (step 4).
    pub fn extract_header(&self, text: &str) -> HeaderInfo {
        header::extract_header(text, &self.config)
    }

    /// Read `path` through `backend` and run the full pipeline.
    pub fn parse_path(&self, path: &Path, backend: &dyn TextBackend) -> ParseOutcome {
        tracing::debug!(path = %path.display(), "parsing document");
        match run_stage(|| Ok(backend.extract_pages_from_path(path)?)) {
            Ok(pages) => self.parse_pages(&pages),
            Err(e) => ParseOutcome::failed(format!("{}: {e}", path.display())),
        }
    }

    /// Extract text from raw bytes through `backend` and run the full pipeline.
    pub fn parse_bytes(&self, content: &[u8], backend: &dyn TextBackend) -> ParseOutcome {
        if content.is_empty() {
            return ParseOutcome::failed(ponto_core::BackendError::EmptyInput.to_string());
        }
        match run_stage(|| Ok(backend.extract_pages(content)?)) {
            Ok(pages) => self.parse_pages(&pages),
            Err(e) => ParseOutcome::failed(e.to_string()),
        }
    }

    /// Run the pipeline over per-page text. Pages are joined with a newline.
    pub fn parse_pages(&self, pages: &[String]) -> ParseOutcome {
        self.run(&pages.join("\n"), pages.len())
    }

    /// Run the pipeline over already-extracted text, counted as one page.
    pub fn parse_text(&self, text: &str) -> ParseOutcome {
        self.run(text, 1)
    }

    fn run(&self, text: &str, page_count: usize) -> ParseOutcome {
        let mut diagnostics = Vec::new();
        let lines = self.split_lines(text);

        let aggregation = attempt(Stage::Days, &mut diagnostics, || {
            Ok(self.aggregate_days(&lines))
        });
        diagnostics.extend(aggregation.diagnostics.iter().cloned());

        let header = attempt(Stage::Header, &mut diagnostics, || {
            Ok(self.extract_header(text))
        });
        diagnostics.extend(unmatched_header_lines(&aggregation, &header));

        let days = aggregation.days;
        let totals = attempt(Stage::Summary, &mut diagnostics, || {
            summary::total_hours(&days)
        });
        let period_summary = attempt(Stage::Summary, &mut diagnostics, || {
            Ok(summary::summarize(&days, &totals))
        });
        let stats = attempt(Stage::Stats, &mut diagnostics, || {
            Ok(summary::processing_stats(&days, lines.len()))
        });

        tracing::debug!(
            lines = lines.len(),
            days = days.len(),
            records = stats.total_records,
            diagnostics = diagnostics.len(),
            "document parsed"
        );

        ParseOutcome {
            document: Document {
                metadata: Metadata::new(page_count),
                header,
                summary: period_summary,
                days,
                raw_lines: lines,
                processing_stats: stats,
                error: None,
                message: None,
            },
            diagnostics,
        }
    }
}

/// Diagnostics for header lines the classifier saw but the header patterns
/// could not read.
fn unmatched_header_lines(aggregation: &Aggregation, header: &HeaderInfo) -> Vec<Diagnostic> {
    let first_line = |kind: LineKind| {
        aggregation
            .kinds
            .iter()
            .position(|k| *k == kind)
            .map(|i| i + 1)
    };

    let mut out = Vec::new();
    let employee = &header.employee;
    if employee.name.is_none()
        && employee.registration.is_none()
        && let Some(line) = first_line(LineKind::EmployeeHeader)
    {
        out.push(Diagnostic::line(
            Stage::Header,
            line,
            "employee line present but name and registration not recognized",
        ));
    }
    if header.period.start_date.is_none()
        && let Some(line) = first_line(LineKind::PeriodHeader)
    {
        out.push(Diagnostic::line(
            Stage::Header,
            line,
            "period line present but no date range recognized",
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponto_core::{BackendError, PlainTextBackend};

    const SAMPLE: &str = "\
Espelho de Ponto
Colaborador(a): Jane Doe (Matrícula: 12345)
Período: 01/08/2025 a 31/08/2025
Data  Ocorrência  Justificativa  Projetos  Chamado  Início  Fim  Inativo  Horas  Motivo
01/08/2025  Trabalho  -  -  -  08:00  17:00  01:00  8:00
Sex  Hora Extra  Deploy  -  T-1  18:00  20:00  0:00  2:00
02/08/2025  Compensado  Banco de horas
";

    struct FailingBackend;

    impl TextBackend for FailingBackend {
        fn extract_pages(&self, _content: &[u8]) -> Result<Vec<String>, BackendError> {
            Err(BackendError::OpenError("not a PDF".into()))
        }
    }

    struct PanickingBackend;

    impl TextBackend for PanickingBackend {
        fn extract_pages(&self, _content: &[u8]) -> Result<Vec<String>, BackendError> {
            panic!("decoder blew up")
        }
    }

    #[test]
    fn test_parse_text_sample() {
        let outcome = TimesheetExtractor::new().parse_text(SAMPLE);
        let doc = &outcome.document;
        assert!(!doc.is_error());
        assert_eq!(doc.metadata.page_count, 1);
        assert_eq!(doc.header.employee.name.as_deref(), Some("Jane Doe"));
        assert_eq!(doc.header.period.month_year.as_deref(), Some("08/2025"));
        assert_eq!(doc.days.len(), 2);
        assert_eq!(doc.days[0].records.len(), 2);
        assert!(doc.days[1].is_compensated);
        assert_eq!(doc.summary.total_work_hours, "8:00");
        assert_eq!(doc.summary.total_overtime_hours, "2:00");
        assert_eq!(doc.summary.work_days_count, 1);
        assert_eq!(doc.processing_stats.total_lines, 7);
        assert_eq!(doc.processing_stats.overtime_records, 1);
        assert_eq!(doc.raw_lines.len(), 7);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_parse_bytes_through_backend() {
        let content = SAMPLE.replace("02/08/2025", "\u{000C}02/08/2025");
        let outcome = TimesheetExtractor::new().parse_bytes(content.as_bytes(), &PlainTextBackend);
        assert_eq!(outcome.document.metadata.page_count, 2);
        assert_eq!(outcome.document.days.len(), 2);
    }

    #[test]
    fn test_empty_bytes_is_error_document() {
        let outcome = TimesheetExtractor::new().parse_bytes(b"", &PlainTextBackend);
        assert!(outcome.document.is_error());
        assert!(outcome.document.days.is_empty());
        assert_eq!(outcome.diagnostics[0].stage, Stage::Extraction);
    }

    #[test]
    fn test_backend_failure_is_error_document() {
        let outcome = TimesheetExtractor::new().parse_bytes(b"%PDF-1.7", &FailingBackend);
        let doc = outcome.document;
        assert!(doc.is_error());
        assert!(doc.message.unwrap().contains("not a PDF"));
    }

    #[test]
    fn test_backend_panic_is_contained() {
        let outcome = TimesheetExtractor::new().parse_bytes(b"%PDF-1.7", &PanickingBackend);
        assert!(outcome.document.is_error());
        assert!(outcome.diagnostics[0].message.contains("decoder blew up"));
    }

    #[test]
    fn test_missing_file_is_error_document() {
        let outcome = TimesheetExtractor::new()
            .parse_path(Path::new("/nonexistent/ponto/espelho.pdf"), &PlainTextBackend);
        assert!(outcome.document.is_error());
    }

    #[test]
    fn test_attempt_substitutes_default() {
        let mut diagnostics = Vec::new();
        let value: u32 = attempt(Stage::Summary, &mut diagnostics, || {
            Err(ParsingError::DurationOverflow)
        });
        assert_eq!(value, 0);

        let header: HeaderInfo = attempt(Stage::Header, &mut diagnostics, || panic!("boom"));
        assert_eq!(header, HeaderInfo::default());

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].stage, Stage::Summary);
        assert!(diagnostics[1].message.contains("boom"));
    }

    #[test]
    fn test_hours_overflow_keeps_day_counts() {
        let huge = format!("{}:00", u64::MAX / 60);
        let text = format!(
            "01/08/2025  Trabalho  -  -  -  08:00  17:00  01:00  {huge}\n\
             02/08/2025  Trabalho  -  -  -  08:00  17:00  01:00  {huge}\n\
             03/08/2025  Compensado"
        );
        let outcome = TimesheetExtractor::new().parse_text(&text);
        let summary = &outcome.document.summary;
        assert_eq!(summary.total_work_hours, "0:00");
        assert_eq!(summary.work_days_count, 2);
        assert_eq!(summary.compensated_days_count, 1);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].stage, Stage::Summary);
    }

    #[test]
    fn test_unrecognized_header_line_is_reported() {
        let text = "Colaborador: (sem matrícula)\nPeríodo: agosto\n01/08/2025  Trabalho";
        let outcome = TimesheetExtractor::new().parse_text(text);
        assert_eq!(outcome.document.header, HeaderInfo::default());
        let lines: Vec<_> = outcome.diagnostics.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![Some(1), Some(2)]);
        assert_eq!(outcome.document.days.len(), 1);
    }

    #[test]
    fn test_classify_line_uses_config() {
        let config = crate::ParsingConfigBuilder::new()
            .title_phrase("Folha de Ponto")
            .build()
            .unwrap();
        let extractor = TimesheetExtractor::with_config(config);
        assert_eq!(extractor.classify_line("Folha de Ponto", false), LineKind::Title);
        assert_eq!(extractor.classify_line("Espelho de Ponto", false), LineKind::Noise);
    }
}
