use std::fmt;

use serde::Serialize;

/// Pipeline stage a diagnostic was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Record,
    Days,
    Header,
    Summary,
    Stats,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extraction => "extraction",
            Self::Record => "record",
            Self::Days => "days",
            Self::Header => "header",
            Self::Summary => "summary",
            Self::Stats => "stats",
        };
        f.write_str(name)
    }
}

/// A non-fatal problem found while parsing. The affected line or stage was
/// skipped or replaced by its neutral default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    /// 1-based index into `raw_lines`, when the problem is tied to one line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn stage(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            line: None,
            message: message.into(),
        }
    }

    pub fn line(stage: Stage, line: usize, message: impl Into<String>) -> Self {
        Self {
            stage,
            line: Some(line),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "[{}] line {}: {}", self.stage, line, self.message),
            None => write!(f, "[{}] {}", self.stage, self.message),
        }
    }
}
