use std::io::Write;

use owo_colors::OwoColorize;
use ponto_core::Document;
use ponto_parsing::{Diagnostic, LineKind};

use crate::batch::{BatchTally, FileStatus};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn paint_line(kind: LineKind, text: &str, color: ColorMode) -> String {
    if !color.enabled() {
        return text.to_string();
    }
    match kind {
        LineKind::Title => text.bold().to_string(),
        LineKind::EmployeeHeader | LineKind::PeriodHeader => text.cyan().to_string(),
        LineKind::DateAnchor => text.yellow().bold().to_string(),
        LineKind::Record => text.green().to_string(),
        LineKind::Noise => text.dimmed().to_string(),
    }
}

/// Print every line with its classification, then counts and the summary.
pub fn print_dry_run(
    w: &mut dyn Write,
    file_name: &str,
    lines: &[String],
    kinds: &[LineKind],
    document: &Document,
    diagnostics: &[Diagnostic],
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(
            w,
            "{} {} ({} lines)\n",
            "DRY RUN:".bold().cyan(),
            file_name.bold(),
            lines.len()
        )?;
    } else {
        writeln!(w, "DRY RUN: {} ({} lines)\n", file_name, lines.len())?;
    }

    for (i, (line, kind)) in lines.iter().zip(kinds).enumerate() {
        writeln!(
            w,
            "{:>4} {:<8} {}",
            i + 1,
            format!("[{}]", kind.label()),
            paint_line(*kind, line, color)
        )?;
    }
    writeln!(w)?;

    let count = |k: LineKind| kinds.iter().filter(|x| **x == k).count();
    writeln!(
        w,
        "Lines: {} header, {} date, {} record, {} noise",
        kinds.iter().filter(|k| k.is_header()).count(),
        count(LineKind::DateAnchor),
        count(LineKind::Record),
        count(LineKind::Noise)
    )?;
    writeln!(
        w,
        "Days: {} ({} compensated), records: {}",
        document.days.len(),
        document.processing_stats.compensated_days,
        document.record_count()
    )?;

    let employee = &document.header.employee;
    writeln!(
        w,
        "Employee: {} ({})",
        employee.name.as_deref().unwrap_or("-"),
        employee.registration.as_deref().unwrap_or("-")
    )?;
    let period = &document.header.period;
    writeln!(
        w,
        "Period: {} to {}",
        period.start_date.as_deref().unwrap_or("-"),
        period.end_date.as_deref().unwrap_or("-")
    )?;

    let s = &document.summary;
    writeln!(
        w,
        "Hours: work {}, overtime {}, project {}; work days {}",
        s.total_work_hours, s.total_overtime_hours, s.total_project_hours, s.work_days_count
    )?;

    print_diagnostics(w, diagnostics, color)
}

pub fn print_diagnostics(
    w: &mut dyn Write,
    diagnostics: &[Diagnostic],
    color: ColorMode,
) -> std::io::Result<()> {
    if diagnostics.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    for d in diagnostics {
        if color.enabled() {
            writeln!(w, "{} {}", "warning:".yellow().bold(), d)?;
        } else {
            writeln!(w, "warning: {}", d)?;
        }
    }
    Ok(())
}

/// Print one line per processed file and the final tally.
pub fn print_batch_summary(
    w: &mut dyn Write,
    tally: &BatchTally,
    color: ColorMode,
) -> std::io::Result<()> {
    for report in &tally.reports {
        let (mark, detail) = match &report.status {
            FileStatus::Delivered { location } => (
                "ok",
                format!(
                    "{} day(s), {} record(s) -> {}",
                    report.days, report.records, location
                ),
            ),
            FileStatus::ErrorDocument { location, message } => {
                ("error-doc", format!("{} -> {}", message, location))
            }
            FileStatus::WriteFailed { message } => ("FAILED", message.clone()),
        };
        if color.enabled() {
            let mark = match &report.status {
                FileStatus::Delivered { .. } => mark.green().to_string(),
                FileStatus::ErrorDocument { .. } => mark.yellow().to_string(),
                FileStatus::WriteFailed { .. } => mark.red().bold().to_string(),
            };
            writeln!(w, "[{}] {}: {}", mark, report.filename.bold(), detail)?;
        } else {
            writeln!(w, "[{}] {}: {}", mark, report.filename, detail)?;
        }
    }

    let line = format!(
        "{} file(s): {} delivered, {} error document(s), {} failed, {} warning(s)",
        tally.reports.len(),
        tally.delivered(),
        tally.error_documents(),
        tally.failed(),
        tally.warnings
    );
    writeln!(w)?;
    if color.enabled() && tally.failed() > 0 {
        writeln!(w, "{}", line.red())?;
    } else if color.enabled() {
        writeln!(w, "{}", line.green())?;
    } else {
        writeln!(w, "{}", line)?;
    }
    Ok(())
}
