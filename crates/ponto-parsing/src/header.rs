use once_cell::sync::Lazy;
use ponto_core::{Employee, HeaderInfo, Period};
use regex::Regex;

use crate::config::{MonthYearPolicy, ParsingConfig};

/// `Colaborador(a): Jane Doe (Matrícula: 12345)`; the label is optional.
static EMPLOYEE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:Colaborador(?:\(a\))?\s*:\s*)?([^\n():]+?)\s*\(\s*Matr[íi]cula\s*:\s*(\d+)\s*\)",
    )
    .unwrap()
});

/// `01/08/2025 a 31/08/2025`
static PERIOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2}/\d{2}/\d{4})\s+a\s+(\d{2}/\d{2}/\d{4})").unwrap());

/// Scan the full document text for employee identity and period bounds.
///
/// This runs over the whole text rather than over classified header lines,
/// so a header line the classifier missed is still recovered. Fields that
/// are not found stay `None`.
pub fn extract_header(text: &str, config: &ParsingConfig) -> HeaderInfo {
    HeaderInfo {
        employee: extract_employee(text, config),
        period: extract_period(text, config),
    }
}

/// First employee identity match, or the empty default.
pub fn extract_employee(text: &str, config: &ParsingConfig) -> Employee {
    let re = config.employee_re.as_ref().unwrap_or(&*EMPLOYEE_RE);
    let Some(caps) = re.captures(text) else {
        return Employee::default();
    };

    let group = |i: usize| {
        caps.get(i)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Employee {
        name: group(1),
        registration: group(2),
    }
}

/// First period match, or the empty default.
pub fn extract_period(text: &str, config: &ParsingConfig) -> Period {
    let re = config.period_re.as_ref().unwrap_or(&*PERIOD_RE);
    let Some(caps) = re.captures(text) else {
        return Period::default();
    };

    let start_date = caps.get(1).map(|m| m.as_str().to_string());
    let end_date = caps.get(2).map(|m| m.as_str().to_string());
    let month_year = match config.month_year {
        MonthYearPolicy::FromStartDate => start_date.as_deref().and_then(month_year_of),
        MonthYearPolicy::Omit => None,
    };

    Period {
        start_date,
        end_date,
        month_year,
    }
}

/// `MM/YYYY` part of a `DD/MM/YYYY` date.
pub fn month_year_of(date: &str) -> Option<String> {
    let (day, rest) = date.split_once('/')?;
    if day.len() != 2 || rest.len() != 7 {
        return None;
    }
    Some(rest.to_string())
}
