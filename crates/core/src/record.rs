use serde::{Deserialize, Serialize};

use crate::level::Level;

/// One detected error block.
///
/// `error_context` always starts with `error_line`; continuation lines
/// follow, newline-joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// ISO-8601, see [`crate::timestamp::normalize_timestamp`].
    pub timestamp: String,
    pub level: Level,
    pub error_line: String,
    pub error_context: String,
    pub source: String,
}

impl ErrorRecord {
    /// Number of lines in the block, including the first.
    pub fn line_count(&self) -> usize {
        self.error_context.lines().count()
    }
}
