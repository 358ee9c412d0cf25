use once_cell::sync::Lazy;
use regex::Regex;

/// Column boundary: two or more consecutive whitespace characters.
static COLUMN_GAP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Split a record line into positional fields.
///
/// Single spaces stay inside a field ("Hora Extra", "Jane Doe"); runs of two
/// or more whitespace characters separate fields. Empty fields are dropped.
pub fn tokenize(line: &str) -> Vec<String> {
    COLUMN_GAP_RE
        .split(line.trim())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// True when the line has at least one column boundary, i.e. it can yield
/// two or more fields.
pub fn has_column_gap(line: &str) -> bool {
    COLUMN_GAP_RE.is_match(line.trim())
}
