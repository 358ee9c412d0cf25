use serde::{Deserialize, Serialize};

pub mod backend;
pub mod config_file;

// Re-export for convenience
pub use backend::{BackendError, PlainTextBackend, TextBackend};

/// Tag written into [`Metadata::document_type`] for every parsed document.
pub const DOCUMENT_TYPE: &str = "espelho_de_ponto";

/// Version of the JSON output layout.
pub const FORMAT_VERSION: &str = "1.0";

/// Neutral value for every duration bucket in [`PeriodSummary`].
pub const ZERO_DURATION: &str = "0:00";

/// A parsed timesheet document.
///
/// The serialized key names are a fixed contract for downstream consumers:
/// `metadata`, `header_info`, `period_summary`, `daily_records`, `raw_lines`,
/// `processing_stats` and the optional `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub metadata: Metadata,
    #[serde(rename = "header_info")]
    pub header: HeaderInfo,
    #[serde(rename = "period_summary")]
    pub summary: PeriodSummary,
    #[serde(rename = "daily_records")]
    pub days: Vec<Day>,
    pub raw_lines: Vec<String>,
    pub processing_stats: ProcessingStats,
    /// Set to `Some(true)` only when the source could not be opened at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Document {
    /// Build the error-document shape: every structural field present but empty.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            metadata: Metadata::new(0),
            header: HeaderInfo::default(),
            summary: PeriodSummary::default(),
            days: Vec::new(),
            raw_lines: Vec::new(),
            processing_stats: ProcessingStats::default(),
            error: Some(true),
            message: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.unwrap_or(false)
    }

    /// Total number of records across all days.
    pub fn record_count(&self) -> usize {
        self.days.iter().map(|d| d.records.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub document_type: String,
    pub page_count: usize,
    /// RFC 3339 timestamp (UTC) of when the document was parsed.
    pub extraction_date: String,
    pub version: String,
}

impl Metadata {
    pub fn new(page_count: usize) -> Self {
        Self {
            document_type: DOCUMENT_TYPE.to_string(),
            page_count,
            extraction_date: chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%SZ")
                .to_string(),
            version: FORMAT_VERSION.to_string(),
        }
    }
}

/// Employee identity and period bounds found anywhere in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub employee: Employee,
    pub period: Period,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub name: Option<String>,
    pub registration: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub month_year: Option<String>,
}

/// One calendar day of the timesheet, opened by a date-anchor line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    /// Literal `DD/MM/YYYY` text as it appeared in the source.
    pub date: String,
    pub records: Vec<Record>,
    /// True iff every record is compensated (vacuously true when empty).
    pub is_compensated: bool,
}

impl Day {
    /// Seal a day from its records, deriving `is_compensated`.
    pub fn new(date: impl Into<String>, records: Vec<Record>) -> Self {
        let is_compensated = records.iter().all(|r| r.is_compensated);
        Self {
            date: date.into(),
            records,
            is_compensated,
        }
    }
}

/// The nine positional columns of a timesheet record line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFields {
    pub occurrence_type: Option<String>,
    pub justification: Option<String>,
    pub projects: Option<String>,
    pub ticket: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub inactive_time: Option<String>,
    pub hours: Option<String>,
    pub reason: Option<String>,
}

/// A single time-tracking entry within a day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub occurrence_type: Option<String>,
    pub justification: Option<String>,
    pub projects: Option<String>,
    pub ticket: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub inactive_time: Option<String>,
    pub hours: Option<String>,
    pub reason: Option<String>,
    pub is_compensated: bool,
    pub is_manual: bool,
    pub is_overtime: bool,
}

impl Record {
    /// Build a record, deriving the boolean flags from `occurrence_type`.
    pub fn from_fields(fields: RecordFields) -> Self {
        let occurrence = fields.occurrence_type.as_deref().unwrap_or("");
        let is_compensated = occurrence.contains("Compensado");
        let is_manual = occurrence.contains("Manual");
        let is_overtime = occurrence.to_lowercase().contains("extra");

        Self {
            occurrence_type: fields.occurrence_type,
            justification: fields.justification,
            projects: fields.projects,
            ticket: fields.ticket,
            start_time: fields.start_time,
            end_time: fields.end_time,
            inactive_time: fields.inactive_time,
            hours: fields.hours,
            reason: fields.reason,
            is_compensated,
            is_manual,
            is_overtime,
        }
    }

    /// True when the occurrence type marks project time.
    pub fn is_project(&self) -> bool {
        self.occurrence_type
            .as_deref()
            .is_some_and(|o| o.contains("Projeto"))
    }
}

/// Aggregated durations (`H:MM`) and day-type counts for the whole period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub total_work_hours: String,
    pub total_overtime_hours: String,
    pub total_project_hours: String,
    pub work_days_count: usize,
    pub compensated_days_count: usize,
}

impl Default for PeriodSummary {
    fn default() -> Self {
        Self {
            total_work_hours: ZERO_DURATION.to_string(),
            total_overtime_hours: ZERO_DURATION.to_string(),
            total_project_hours: ZERO_DURATION.to_string(),
            work_days_count: 0,
            compensated_days_count: 0,
        }
    }
}

/// Counts derived from the parsed days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub total_lines: usize,
    pub total_days: usize,
    pub total_records: usize,
    pub compensated_days: usize,
    pub manual_records: usize,
    pub overtime_records: usize,
}
