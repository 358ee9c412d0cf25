use ponto_core::{Record, RecordFields};
use regex::{Captures, Regex};

use crate::ParsingError;
use crate::config::ParsingConfig;
use crate::tokenizer::tokenize;

/// Record columns in positional order. Token 0 is the leading date segment
/// and is not mapped, so token `i` fills `FIELD_NAMES[i - 1]`.
pub const FIELD_NAMES: [&str; 9] = [
    "occurrence_type",
    "justification",
    "projects",
    "ticket",
    "start_time",
    "end_time",
    "inactive_time",
    "hours",
    "reason",
];

/// Minimum number of tokens for a line to carry a record.
pub const MIN_RECORD_TOKENS: usize = 2;

/// Map tokenizer output positionally onto the nine record fields.
///
/// Missing trailing columns become `None`; tokens past the ninth field are ignored.
pub fn normalize(tokens: &[String]) -> Record {
    let field = |i: usize| tokens.get(i).cloned();
    Record::from_fields(RecordFields {
        occurrence_type: field(1),
        justification: field(2),
        projects: field(3),
        ticket: field(4),
        start_time: field(5),
        end_time: field(6),
        inactive_time: field(7),
        hours: field(8),
        reason: field(9),
    })
}

/// Map the named groups of a configured record pattern onto the record fields.
fn from_captures(caps: &Captures<'_>) -> Record {
    let field = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Record::from_fields(RecordFields {
        occurrence_type: field("occurrence_type"),
        justification: field("justification"),
        projects: field("projects"),
        ticket: field("ticket"),
        start_time: field("start_time"),
        end_time: field("end_time"),
        inactive_time: field("inactive_time"),
        hours: field("hours"),
        reason: field("reason"),
    })
}

fn match_named(re: &Regex, line: &str) -> Option<Record> {
    re.captures(line).map(|caps| from_captures(&caps))
}

/// Parse one record line (a date-anchor line or a record-candidate line).
///
/// A configured named-capture pattern is tried first; when it is absent or
/// does not match, fields are mapped by position.
pub fn parse_record_line(line: &str, config: &ParsingConfig) -> Result<Record, ParsingError> {
    if let Some(ref re) = config.record_re
        && let Some(record) = match_named(re, line)
    {
        return Ok(record);
    }

    let tokens = tokenize(line);
    if tokens.len() < MIN_RECORD_TOKENS {
        return Err(ParsingError::TooFewFields {
            found: tokens.len(),
        });
    }
    Ok(normalize(&tokens))
}

/// Parse the record carried on a date-anchor line, after its leading `date`.
///
/// Returns `None` when nothing follows the date. The date always occupies
/// token 0, even when only a single space separates it from the next column.
pub fn parse_anchor_record(line: &str, date: &str, config: &ParsingConfig) -> Option<Record> {
    let rest = line.strip_prefix(date).unwrap_or(line).trim();
    if rest.is_empty() {
        return None;
    }

    if let Some(ref re) = config.record_re
        && let Some(record) = match_named(re, line)
    {
        return Some(record);
    }

    let tokens: Vec<String> = std::iter::once(date.to_string())
        .chain(tokenize(rest))
        .collect();
    Some(normalize(&tokens))
}
