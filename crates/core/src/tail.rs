//! Incremental reader for a growing log file.
//!
//! Tracks a byte offset so that successive polls return only the lines
//! appended since the previous poll. The file is opened, read and closed
//! on every poll; no descriptor is held between polls.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::TailError;

/// Persistable tail position: which file, and how far it has been consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailCursor {
    pub path: PathBuf,
    pub offset: u64,
}

impl TailCursor {
    /// Load a checkpoint written by [`TailCursor::save`].
    ///
    /// Returns `None` when the checkpoint is missing, unreadable or was
    /// written for a different log file.
    pub async fn load(checkpoint: &Path, log_path: &Path) -> Option<Self> {
        let raw = tokio::fs::read_to_string(checkpoint).await.ok()?;
        let cursor: TailCursor = match serde_json::from_str(&raw) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %checkpoint.display(), error = %e, "Ignoring malformed tail checkpoint");
                return None;
            }
        };
        (cursor.path == log_path).then_some(cursor)
    }

    pub async fn save(&self, checkpoint: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string(self).map_err(std::io::Error::other)?;
        tokio::fs::write(checkpoint, json).await
    }
}

/// Tracks a byte offset into one file for incremental line reading.
pub struct LogTailer {
    path: PathBuf,
    /// Byte offset just past the last complete line handed out.
    offset: u64,
}

impl LogTailer {
    /// Start at the beginning of the file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
        }
    }

    /// Resume from a saved cursor.
    pub fn from_cursor(cursor: TailCursor) -> Self {
        Self {
            path: cursor.path,
            offset: cursor.offset,
        }
    }

    /// Read all complete lines appended since the last read.
    ///
    /// - A missing file yields no lines and leaves the offset alone.
    /// - An unterminated trailing line is held back until its `\n` arrives.
    /// - If the file shrank below the offset (truncated or rotated), reading
    ///   restarts from byte 0.
    /// - Invalid UTF-8 bytes are dropped, never rejected, so a stray byte
    ///   does not change the dedup title.
    pub async fn read_new_lines(&mut self) -> Result<Vec<String>, TailError> {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(TailError::io(&self.path, e)),
        };
        let file_len = file
            .metadata()
            .await
            .map_err(|e| TailError::io(&self.path, e))?
            .len();

        if file_len < self.offset {
            tracing::info!(
                path = %self.path.display(),
                old_offset = self.offset,
                file_len,
                "Log file shrank below cursor, re-reading from start"
            );
            self.offset = 0;
        }
        if file_len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(std::io::SeekFrom::Start(self.offset))
            .await
            .map_err(|e| TailError::io(&self.path, e))?;
        let mut buf = Vec::with_capacity((file_len - self.offset) as usize);
        file.read_to_end(&mut buf)
            .await
            .map_err(|e| TailError::io(&self.path, e))?;

        Ok(self.take_complete_lines(&buf))
    }

    fn take_complete_lines(&mut self, bytes: &[u8]) -> Vec<String> {
        let Some(last_newline) = bytes.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        self.offset += last_newline as u64 + 1;

        bytes[..last_newline]
            .split(|&b| b == b'\n')
            .map(|line| {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                decode_dropping_invalid(line)
            })
            .collect()
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cursor(&self) -> TailCursor {
        TailCursor {
            path: self.path.clone(),
            offset: self.offset,
        }
    }
}

fn decode_dropping_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}
