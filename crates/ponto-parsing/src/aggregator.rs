use ponto_core::{Day, Record};

use crate::classifier::{LineKind, classify, leading_date};
use crate::config::ParsingConfig;
use crate::diagnostics::{Diagnostic, Stage};
use crate::record::{parse_anchor_record, parse_record_line};

/// Header lines seen while walking the document, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderLines {
    pub title: Vec<String>,
    pub employee: Vec<String>,
    pub period: Vec<String>,
}

/// Output of a full pass over the document lines.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Sealed days in date-anchor encounter order.
    pub days: Vec<Day>,
    pub header_lines: HeaderLines,
    /// Classification of each input line, parallel to the input.
    pub kinds: Vec<LineKind>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
enum DayState {
    NoOpenDay,
    DayOpen { date: String, records: Vec<Record> },
}

/// Fold state for grouping records under the most recent date anchor.
///
/// Drive it with [`step`](Self::step) once per line, then [`finish`](Self::finish).
/// Classification is delegated to [`classify`], which is told whether a day
/// is open; the aggregator is the only owner of that state.
#[derive(Debug)]
pub struct DayAggregator<'a> {
    config: &'a ParsingConfig,
    state: DayState,
    days: Vec<Day>,
    header_lines: HeaderLines,
    kinds: Vec<LineKind>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> DayAggregator<'a> {
    pub fn new(config: &'a ParsingConfig) -> Self {
        Self {
            config,
            state: DayState::NoOpenDay,
            days: Vec::new(),
            header_lines: HeaderLines::default(),
            kinds: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn is_day_open(&self) -> bool {
        matches!(self.state, DayState::DayOpen { .. })
    }

    /// Consume one trimmed line. `line_no` is 1-based and only used for diagnostics.
    pub fn step(mut self, line_no: usize, line: &str) -> Self {
        let kind = classify(line, self.is_day_open(), self.config);
        self.kinds.push(kind);

        match kind {
            LineKind::Title => self.header_lines.title.push(line.to_string()),
            LineKind::EmployeeHeader => self.header_lines.employee.push(line.to_string()),
            LineKind::PeriodHeader => self.header_lines.period.push(line.to_string()),
            LineKind::DateAnchor => self.open_day(line_no, line),
            LineKind::Record => self.push_record(line_no, line),
            LineKind::Noise => tracing::trace!(line = line_no, "noise line dropped"),
        }
        self
    }

    /// Seal the open day, if any, and return everything collected.
    pub fn finish(mut self) -> Aggregation {
        self.seal();
        Aggregation {
            days: self.days,
            header_lines: self.header_lines,
            kinds: self.kinds,
            diagnostics: self.diagnostics,
        }
    }

    fn seal(&mut self) {
        if let DayState::DayOpen { date, records } =
            std::mem::replace(&mut self.state, DayState::NoOpenDay)
        {
            self.days.push(Day::new(date, records));
        }
    }

    fn open_day(&mut self, line_no: usize, line: &str) {
        let Some(date) = leading_date(line) else {
            self.diagnostics.push(Diagnostic::line(
                Stage::Days,
                line_no,
                "date anchor without a leading date",
            ));
            return;
        };

        self.seal();
        let records: Vec<Record> = parse_anchor_record(line, date, self.config)
            .into_iter()
            .collect();
        tracing::debug!(line = line_no, date, records = records.len(), "day opened");
        self.state = DayState::DayOpen {
            date: date.to_string(),
            records,
        };
    }

    fn push_record(&mut self, line_no: usize, line: &str) {
        let DayState::DayOpen { ref mut records, .. } = self.state else {
            return;
        };
        match parse_record_line(line, self.config) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::debug!(line = line_no, error = %e, "record line skipped");
                self.diagnostics
                    .push(Diagnostic::line(Stage::Record, line_no, e.to_string()));
            }
        }
    }
}

/// Group `lines` into days with a single left-to-right fold.
pub fn aggregate(lines: &[String], config: &ParsingConfig) -> Aggregation {
    lines
        .iter()
        .enumerate()
        .fold(DayAggregator::new(config), |agg, (i, line)| {
            agg.step(i + 1, line)
        })
        .finish()
}
