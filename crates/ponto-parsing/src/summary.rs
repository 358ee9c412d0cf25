use ponto_core::{Day, PeriodSummary, ProcessingStats};

use crate::ParsingError;

/// Convert an `H:MM` or bare-hours string into minutes.
///
/// Anything that does not parse (including overflow) counts as zero.
pub fn parse_hours_to_minutes(value: &str) -> u64 {
    try_parse_minutes(value.trim()).unwrap_or(0)
}

fn try_parse_minutes(value: &str) -> Option<u64> {
    if value.is_empty() {
        return Some(0);
    }
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    match value.split_once(':') {
        Some((h, m)) if digits(h) && digits(m) => {
            let hours: u64 = h.parse().ok()?;
            let minutes: u64 = m.parse().ok()?;
            hours.checked_mul(60)?.checked_add(minutes)
        }
        Some(_) => None,
        None if digits(value) => value.parse::<u64>().ok()?.checked_mul(60),
        None => None,
    }
}

/// Format minutes as `H:MM`. Hours are unbounded.
pub fn format_minutes_to_hours(minutes: u64) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// Minutes per hours category, summed over every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HourTotals {
    pub work: u64,
    pub overtime: u64,
    pub project: u64,
}

impl HourTotals {
    fn add(&mut self, bucket: Bucket, minutes: u64) -> Result<(), ParsingError> {
        let slot = match bucket {
            Bucket::Overtime => &mut self.overtime,
            Bucket::Project => &mut self.project,
            Bucket::Work => &mut self.work,
        };
        *slot = slot
            .checked_add(minutes)
            .ok_or(ParsingError::DurationOverflow)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Overtime,
    Project,
    Work,
}

/// Sum record hours by category over every day.
///
/// Each record lands in exactly one bucket: overtime, then project, then
/// ordinary work.
pub fn total_hours(days: &[Day]) -> Result<HourTotals, ParsingError> {
    let mut totals = HourTotals::default();

    for record in days.iter().flat_map(|d| &d.records) {
        let minutes = record
            .hours
            .as_deref()
            .map(parse_hours_to_minutes)
            .unwrap_or(0);
        let bucket = if record.is_overtime {
            Bucket::Overtime
        } else if record.is_project() {
            Bucket::Project
        } else {
            Bucket::Work
        };
        totals.add(bucket, minutes)?;
    }
    Ok(totals)
}

/// Build the period summary from hour totals. Days that are not fully
/// compensated count as work days; the day counts never depend on `totals`.
pub fn summarize(days: &[Day], totals: &HourTotals) -> PeriodSummary {
    let compensated_days_count = days.iter().filter(|d| d.is_compensated).count();
    PeriodSummary {
        total_work_hours: format_minutes_to_hours(totals.work),
        total_overtime_hours: format_minutes_to_hours(totals.overtime),
        total_project_hours: format_minutes_to_hours(totals.project),
        work_days_count: days.len() - compensated_days_count,
        compensated_days_count,
    }
}

/// Hour totals and day counts in one step.
pub fn calculate_summary(days: &[Day]) -> Result<PeriodSummary, ParsingError> {
    Ok(summarize(days, &total_hours(days)?))
}

/// Derived counts over the parsed days.
pub fn processing_stats(days: &[Day], total_lines: usize) -> ProcessingStats {
    let records = || days.iter().flat_map(|d| &d.records);
    ProcessingStats {
        total_lines,
        total_days: days.len(),
        total_records: records().count(),
        compensated_days: days.iter().filter(|d| d.is_compensated).count(),
        manual_records: records().filter(|r| r.is_manual).count(),
        overtime_records: records().filter(|r| r.is_overtime).count(),
    }
}
