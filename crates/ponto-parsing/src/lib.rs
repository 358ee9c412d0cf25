use std::path::Path;

use thiserror::Error;

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod diagnostics;
pub mod extractor;
pub mod header;
pub mod record;
pub mod summary;
pub mod tokenizer;

pub use aggregator::{Aggregation, DayAggregator, HeaderLines, aggregate};
pub use classifier::{LineKind, classify, split_lines};
pub use config::{ConfigError, ListOverride, MonthYearPolicy, ParsingConfig, ParsingConfigBuilder};
pub use diagnostics::{Diagnostic, Stage};
pub use extractor::{ParseOutcome, TimesheetExtractor};
pub use summary::{format_minutes_to_hours, parse_hours_to_minutes};
// Re-export domain types from core (canonical definitions live there)
pub use ponto_core::{
    BackendError, Day, Document, HeaderInfo, PeriodSummary, ProcessingStats, Record, TextBackend,
};

#[derive(Error, Debug)]
pub enum ParsingError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("record line has {found} field(s), at least 2 required")]
    TooFewFields { found: usize },
    #[error("duration total does not fit in 64 bits of minutes")]
    DurationOverflow,
}

/// Parse already-extracted timesheet text with the default configuration.
pub fn parse_text(text: &str) -> ParseOutcome {
    TimesheetExtractor::new().parse_text(text)
}

/// Parse a timesheet file using the given backend for text extraction.
///
/// Pipeline:
/// 1. Extract per-page text via `backend` (failure yields the error document)
/// 2. Split into trimmed non-empty lines
/// 3. Classify each line and group records under date anchors
/// 4. Scan the full text for employee and period headers
/// 5. Sum hours into work, overtime and project buckets
/// 6. Count days, records and flags
pub fn parse_document(path: &Path, backend: &dyn TextBackend) -> ParseOutcome {
    TimesheetExtractor::new().parse_path(path, backend)
}
