//! Multi-line error block extraction.
//!
//! Walks a batch of raw lines. A line classified ERROR, CRITICAL or FATAL
//! opens a block; every following line without its own timestamp (stack
//! frames, wrapped messages) is folded into it. The block closes at the
//! next timestamped line, whatever its level, or at the end of the batch.

use tracing::{debug, warn};

use crate::error::LineError;
use crate::level::{classify_clean, Level};
use crate::record::ErrorRecord;
use crate::sanitize::sanitize;
use crate::timestamp::{find_timestamp, normalize_timestamp};

/// Lines longer than this are skipped and counted as failures.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Result of one extraction pass.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<ErrorRecord>,
    /// Lines that could not be processed and were skipped.
    pub failed_lines: usize,
}

struct LineInfo {
    clean: String,
    timestamp: Option<String>,
    level: Level,
}

pub struct ErrorBlockExtractor {
    source: String,
    max_line_bytes: usize,
}

impl ErrorBlockExtractor {
    /// `source` is recorded on every emitted record (normally the file path).
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Extract every error block from `lines`, in input order.
    pub fn extract<S: AsRef<str>>(&self, lines: &[S]) -> Extraction {
        let mut out = Extraction::default();
        let mut i = 0;

        while i < lines.len() {
            let head = match self.inspect(i, lines[i].as_ref()) {
                Ok(info) => info,
                Err(e) => {
                    warn!(error = %e, source = %self.source, "Skipping unprocessable line");
                    out.failed_lines += 1;
                    i += 1;
                    continue;
                }
            };
            i += 1;

            if !head.level.is_escalation() {
                continue;
            }

            let mut context = vec![head.clean];
            while i < lines.len() {
                match self.inspect(i, lines[i].as_ref()) {
                    Ok(next) if next.timestamp.is_some() => break,
                    Ok(next) => context.push(next.clean),
                    Err(e) => {
                        // The skipped line may have opened a new entry.
                        warn!(error = %e, source = %self.source, "Closing block at unprocessable line");
                        out.failed_lines += 1;
                        i += 1;
                        break;
                    }
                }
                i += 1;
            }

            let record = ErrorRecord {
                timestamp: normalize_timestamp(head.timestamp.as_deref()),
                level: head.level,
                error_line: context[0].clone(),
                error_context: context.join("\n"),
                source: self.source.clone(),
            };
            debug!(
                level = %record.level,
                lines = context.len(),
                error_line = %record.error_line,
                "Error block extracted"
            );
            out.records.push(record);
        }

        out
    }

    fn inspect(&self, index: usize, raw: &str) -> Result<LineInfo, LineError> {
        if raw.len() > self.max_line_bytes {
            return Err(LineError::TooLong {
                index,
                len: raw.len(),
                max: self.max_line_bytes,
            });
        }
        let clean = sanitize(raw);
        let timestamp = find_timestamp(&clean).map(str::to_string);
        let level = classify_clean(&clean);
        Ok(LineInfo {
            clean,
            timestamp,
            level,
        })
    }
}
