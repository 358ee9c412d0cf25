use std::str::FromStr;

use ponto_core::config_file::ParsingSection;
use regex::Regex;
use thiserror::Error;

use crate::record::FIELD_NAMES;

/// Fixed phrase that identifies the report title line.
pub const DEFAULT_TITLE_PHRASE: &str = "Espelho de Ponto";
/// Token that marks the employee header line.
pub const DEFAULT_EMPLOYEE_MARKER: &str = "Colaborador";
/// Token that marks the period header line.
pub const DEFAULT_PERIOD_MARKER: &str = "Período";
/// Lines at or below this many characters are never records.
pub const DEFAULT_MIN_RECORD_LEN: usize = 5;

/// Column-header terms; a line containing any of them is the table header, not a record.
pub const DEFAULT_HEADER_EXCLUSIONS: &[&str] =
    &["Ocorrência", "Justificativa", "Projetos", "Tempo Inativo"];

/// Controls how a list of values is overridden from its defaults.
#[derive(Debug, Clone, Default)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

/// How `header_info.period.month_year` is filled in.
///
/// Report revisions disagree on this field, so it is a policy rather than a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MonthYearPolicy {
    /// `MM/YYYY` taken from the period start date.
    #[default]
    FromStartDate,
    /// Always `null`.
    Omit,
}

impl FromStr for MonthYearPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "from_start_date" | "start_date" => Ok(Self::FromStartDate),
            "none" | "omit" => Ok(Self::Omit),
            other => Err(ConfigError::UnknownMonthYearPolicy(other.to_string())),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),
    #[error("unknown month_year policy: {0:?} (expected \"from_start_date\" or \"none\")")]
    UnknownMonthYearPolicy(String),
    #[error("record pattern has no named group for any record field")]
    RecordPatternWithoutFields,
}

/// Configuration for the timesheet parsing pipeline.
///
/// Regex fields are `Option<Regex>`; `None` means "use the built-in default".
/// Use [`ParsingConfigBuilder`] to construct with string patterns.
#[derive(Debug, Clone)]
pub struct ParsingConfig {
    // ── classifier.rs ──
    pub(crate) title_phrase: String,
    pub(crate) employee_marker: String,
    pub(crate) period_marker: String,
    /// Resolved column-header exclusion terms.
    pub(crate) header_exclusions: Vec<String>,
    pub(crate) min_record_len: usize,

    // ── record.rs ──
    /// Named-capture pattern tried before positional mapping.
    pub(crate) record_re: Option<Regex>,

    // ── header.rs ──
    pub(crate) employee_re: Option<Regex>,
    pub(crate) period_re: Option<Regex>,
    pub(crate) month_year: MonthYearPolicy,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            title_phrase: DEFAULT_TITLE_PHRASE.to_string(),
            employee_marker: DEFAULT_EMPLOYEE_MARKER.to_string(),
            period_marker: DEFAULT_PERIOD_MARKER.to_string(),
            header_exclusions: default_header_exclusions(),
            min_record_len: DEFAULT_MIN_RECORD_LEN,
            record_re: None,
            employee_re: None,
            period_re: None,
            month_year: MonthYearPolicy::default(),
        }
    }
}

fn default_header_exclusions() -> Vec<String> {
    DEFAULT_HEADER_EXCLUSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl ParsingConfig {
    /// The resolved column-header exclusion terms.
    pub fn header_exclusions(&self) -> &[String] {
        &self.header_exclusions
    }

    pub fn min_record_len(&self) -> usize {
        self.min_record_len
    }

    pub fn month_year_policy(&self) -> MonthYearPolicy {
        self.month_year
    }
}

/// Builder for [`ParsingConfig`].
///
/// Accepts string patterns that are compiled to `Regex` in [`build()`](Self::build).
/// Fails fast with [`ConfigError`] if any pattern is invalid.
#[derive(Debug, Clone, Default)]
pub struct ParsingConfigBuilder {
    title_phrase: Option<String>,
    employee_marker: Option<String>,
    period_marker: Option<String>,
    header_exclusions: ListOverride<String>,
    min_record_len: Option<usize>,
    record_re: Option<String>,
    employee_re: Option<String>,
    period_re: Option<String>,
    month_year: Option<MonthYearPolicy>,
}

impl ParsingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a builder from the `[parsing]` section of a config file.
    pub fn from_section(section: &ParsingSection) -> Result<Self, ConfigError> {
        let mut builder = Self::new();
        if let Some(ref phrase) = section.title_phrase {
            builder = builder.title_phrase(phrase);
        }
        if let Some(ref marker) = section.employee_marker {
            builder = builder.employee_marker(marker);
        }
        if let Some(ref marker) = section.period_marker {
            builder = builder.period_marker(marker);
        }
        if let Some(ref terms) = section.header_exclusions {
            builder = builder.set_header_exclusions(terms.clone());
        }
        if let Some(ref extra) = section.extra_header_exclusions {
            for term in extra {
                builder = builder.add_header_exclusion(term.clone());
            }
        }
        if let Some(len) = section.min_record_len {
            builder = builder.min_record_len(len);
        }
        if let Some(ref pattern) = section.record_pattern {
            builder = builder.record_regex(pattern);
        }
        if let Some(ref policy) = section.month_year {
            builder = builder.month_year(policy.parse()?);
        }
        Ok(builder)
    }

    // ── Markers ──

    pub fn title_phrase(mut self, phrase: &str) -> Self {
        self.title_phrase = Some(phrase.to_string());
        self
    }

    pub fn employee_marker(mut self, marker: &str) -> Self {
        self.employee_marker = Some(marker.to_string());
        self
    }

    pub fn period_marker(mut self, marker: &str) -> Self {
        self.period_marker = Some(marker.to_string());
        self
    }

    // ── Exclusion terms ──

    pub fn set_header_exclusions(mut self, terms: Vec<String>) -> Self {
        self.header_exclusions = ListOverride::Replace(terms);
        self
    }

    /// Append a term. Extends whatever the list currently resolves to.
    pub fn add_header_exclusion(mut self, term: String) -> Self {
        match &mut self.header_exclusions {
            ListOverride::Extend(v) | ListOverride::Replace(v) => v.push(term),
            ListOverride::Default => self.header_exclusions = ListOverride::Extend(vec![term]),
        }
        self
    }

    // ── Scalars ──

    pub fn min_record_len(mut self, len: usize) -> Self {
        self.min_record_len = Some(len);
        self
    }

    pub fn month_year(mut self, policy: MonthYearPolicy) -> Self {
        self.month_year = Some(policy);
        self
    }

    // ── Patterns ──

    /// Named-capture record pattern, e.g.
    /// `^(?P<date>\S+)\s{2,}(?P<occurrence_type>.+?)\s{2,}(?P<hours>\d+:\d{2})$`.
    pub fn record_regex(mut self, pattern: &str) -> Self {
        self.record_re = Some(pattern.to_string());
        self
    }

    /// Employee identity pattern; group 1 is the name, group 2 the registration.
    pub fn employee_regex(mut self, pattern: &str) -> Self {
        self.employee_re = Some(pattern.to_string());
        self
    }

    /// Period pattern; group 1 is the start date, group 2 the end date.
    pub fn period_regex(mut self, pattern: &str) -> Self {
        self.period_re = Some(pattern.to_string());
        self
    }

    /// Compile all string patterns into regexes and produce a [`ParsingConfig`].
    pub fn build(self) -> Result<ParsingConfig, ConfigError> {
        let compile = |opt: Option<String>| -> Result<Option<Regex>, regex::Error> {
            opt.map(|p| Regex::new(&p)).transpose()
        };

        let record_re = compile(self.record_re)?;
        if let Some(ref re) = record_re {
            let has_field = re
                .capture_names()
                .flatten()
                .any(|name| FIELD_NAMES.contains(&name));
            if !has_field {
                return Err(ConfigError::RecordPatternWithoutFields);
            }
        }

        Ok(ParsingConfig {
            title_phrase: self
                .title_phrase
                .unwrap_or_else(|| DEFAULT_TITLE_PHRASE.to_string()),
            employee_marker: self
                .employee_marker
                .unwrap_or_else(|| DEFAULT_EMPLOYEE_MARKER.to_string()),
            period_marker: self
                .period_marker
                .unwrap_or_else(|| DEFAULT_PERIOD_MARKER.to_string()),
            header_exclusions: self.header_exclusions.resolve(&default_header_exclusions()),
            min_record_len: self.min_record_len.unwrap_or(DEFAULT_MIN_RECORD_LEN),
            record_re,
            employee_re: compile(self.employee_re)?,
            period_re: compile(self.period_re)?,
            month_year: self.month_year.unwrap_or_default(),
        })
    }
}
