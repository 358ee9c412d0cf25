use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::ParsingConfig;
use crate::tokenizer::has_column_gap;

/// Category assigned to a single text line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Title,
    EmployeeHeader,
    PeriodHeader,
    DateAnchor,
    Record,
    Noise,
}

impl LineKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::EmployeeHeader => "employee",
            Self::PeriodHeader => "period",
            Self::DateAnchor => "date",
            Self::Record => "record",
            Self::Noise => "noise",
        }
    }

    pub fn is_header(&self) -> bool {
        matches!(self, Self::Title | Self::EmployeeHeader | Self::PeriodHeader)
    }
}

static DATE_ANCHOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2}/\d{2}/\d{4})").unwrap());

/// Return the leading `DD/MM/YYYY` of a line, if any.
pub fn leading_date(line: &str) -> Option<&str> {
    DATE_ANCHOR_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Split extracted text into non-empty trimmed lines, in source order.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Classify one trimmed line. First match wins:
/// title, employee header, period header, date anchor, record, noise.
///
/// `day_open` is whether a day has been opened by an earlier date anchor;
/// only then can a line be a record. A record line must also be longer than
/// the minimum length and contain no column-header term. It also needs at
/// least one column gap, unless the configured record pattern matches it
/// (a line that yields neither is noise).
pub fn classify(line: &str, day_open: bool, config: &ParsingConfig) -> LineKind {
    if line.contains(config.title_phrase.as_str()) {
        return LineKind::Title;
    }
    if line.contains(config.employee_marker.as_str()) {
        return LineKind::EmployeeHeader;
    }
    if line.contains(config.period_marker.as_str()) {
        return LineKind::PeriodHeader;
    }
    if DATE_ANCHOR_RE.is_match(line) {
        return LineKind::DateAnchor;
    }
    if day_open && is_record_candidate(line, config) {
        return LineKind::Record;
    }
    LineKind::Noise
}

fn is_record_candidate(line: &str, config: &ParsingConfig) -> bool {
    if line.chars().count() <= config.min_record_len
        || config
            .header_exclusions
            .iter()
            .any(|term| line.contains(term.as_str()))
    {
        return false;
    }
    has_column_gap(line) || config.record_re.as_ref().is_some_and(|re| re.is_match(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParsingConfigBuilder;

    fn classify_default(line: &str, day_open: bool) -> LineKind {
        classify(line, day_open, &ParsingConfig::default())
    }

    #[test]
    fn test_split_lines_trims_and_drops_empty() {
        let lines = split_lines("  Espelho de Ponto  \n\n   \n01/08/2025  Falta\r\n");
        assert_eq!(lines, vec!["Espelho de Ponto", "01/08/2025  Falta"]);
    }

    #[test]
    fn test_header_precedence() {
        assert_eq!(classify_default("Espelho de Ponto - Agosto", false), LineKind::Title);
        assert_eq!(
            classify_default("Colaborador(a): Jane Doe (Matrícula: 1)", true),
            LineKind::EmployeeHeader
        );
        assert_eq!(
            classify_default("Período: 01/08/2025 a 31/08/2025", false),
            LineKind::PeriodHeader
        );
        // Title phrase wins over the employee marker on the same line
        assert_eq!(
            classify_default("Espelho de Ponto Colaborador", false),
            LineKind::Title
        );
    }

    #[test]
    fn test_date_anchor() {
        assert_eq!(classify_default("01/08/2025  Falta", false), LineKind::DateAnchor);
        assert_eq!(classify_default("01/08/2025", true), LineKind::DateAnchor);
        assert_eq!(classify_default("Dia 01/08/2025", false), LineKind::Noise);
        assert_eq!(classify_default("1/8/2025  Falta", false), LineKind::Noise);
    }

    #[test]
    fn test_record_requires_open_day() {
        let line = "Seg  Trabalho  Normal  ProjetoX";
        assert_eq!(classify_default(line, false), LineKind::Noise);
        assert_eq!(classify_default(line, true), LineKind::Record);
    }

    #[test]
    fn test_record_length_threshold() {
        assert_eq!(classify_default("ab  c", true), LineKind::Noise);
        assert_eq!(classify_default("ab  cd", true), LineKind::Record);
        // Characters, not bytes
        assert_eq!(classify_default("é  éé", true), LineKind::Noise);
    }

    #[test]
    fn test_garbage_without_columns_is_noise() {
        assert_eq!(classify_default("#$%&*garbage!!", true), LineKind::Noise);
        assert_eq!(classify_default("Página 1 de 2", true), LineKind::Noise);
    }

    #[test]
    fn test_record_pattern_admits_single_spaced_line() {
        let config = ParsingConfigBuilder::new()
            .record_regex(r"^(?P<day>\w{3}) (?P<occurrence_type>Compensado) (?P<hours>\d+:\d{2})$")
            .build()
            .unwrap();
        assert_eq!(classify("Sex Compensado 4:00", true, &config), LineKind::Record);
        assert_eq!(classify("Sex Compensado 4:00", false, &config), LineKind::Noise);
        // No match and no gap: still noise
        assert_eq!(classify("#$%&*garbage!!", true, &config), LineKind::Noise);
        assert_eq!(classify_default("Sex Compensado 4:00", true), LineKind::Noise);
    }

    #[test]
    fn test_column_header_excluded() {
        let header = "Data  Ocorrência  Justificativa  Projetos  Chamado  Início  Fim";
        assert_eq!(classify_default(header, true), LineKind::Noise);
    }

    #[test]
    fn test_custom_exclusions() {
        let config = ParsingConfigBuilder::new()
            .set_header_exclusions(vec!["TOTAL".to_string()])
            .build()
            .unwrap();
        assert_eq!(classify("TOTAL  160:00", true, &config), LineKind::Noise);
        assert_eq!(
            classify("Ocorrência  Justificativa", true, &config),
            LineKind::Record
        );
    }

    #[test]
    fn test_leading_date() {
        assert_eq!(leading_date("01/08/2025  Falta"), Some("01/08/2025"));
        assert_eq!(leading_date("Falta 01/08/2025"), None);
    }
}
