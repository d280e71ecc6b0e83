//! Log level vocabulary and line classification.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::sanitize::sanitize;

/// Severity level detected on a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Error,
    Critical,
    Fatal,
    Warn,
    Warning,
    Info,
    Debug,
    Unknown,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
            Self::Fatal => "FATAL",
            Self::Warn => "WARN",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        KEYWORD_ORDER
            .iter()
            .copied()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
    }

    /// Levels that open an error block and get persisted as issues.
    pub fn is_escalation(&self) -> bool {
        matches!(self, Self::Error | Self::Critical | Self::Fatal)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword scan order. The first listed keyword present anywhere in the
/// line wins, not the left-most one in the text.
pub const KEYWORD_ORDER: [Level; 7] = [
    Level::Error,
    Level::Warn,
    Level::Warning,
    Level::Info,
    Level::Debug,
    Level::Critical,
    Level::Fatal,
];

static KEYWORD_PATTERNS: OnceLock<Vec<(Level, Regex)>> = OnceLock::new();

/// Whole-word, case-insensitive matcher per keyword, in scan order.
pub(crate) fn keyword_patterns() -> &'static [(Level, Regex)] {
    KEYWORD_PATTERNS.get_or_init(|| {
        KEYWORD_ORDER
            .iter()
            .map(|level| {
                let re = Regex::new(&format!(r"(?i)\b{}\b", level.as_str())).unwrap();
                (*level, re)
            })
            .collect()
    })
}

/// Classify a raw line.
pub fn classify_level(line: &str) -> Level {
    classify_clean(&sanitize(line))
}

/// Classify a line that is already sanitized.
pub(crate) fn classify_clean(clean: &str) -> Level {
    keyword_patterns()
        .iter()
        .find(|(_, re)| re.is_match(clean))
        .map(|(level, _)| *level)
        .unwrap_or(Level::Unknown)
}
