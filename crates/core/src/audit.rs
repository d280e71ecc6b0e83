//! Append-only JSON audit trail of every extracted error record.
//!
//! The file holds a single JSON array. Each append reads the array, pushes
//! the record and replaces the whole file through a temp file and rename,
//! so a crash mid-write leaves the previous array intact. Nothing in the
//! monitor reads it back.

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::AuditError;
use crate::record::ErrorRecord;

pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Open the audit file, creating it as `[]` if it does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();
        if !tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_err(&path, e))?
        {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_err(&path, e))?;
            }
            tokio::fs::write(&path, "[]")
                .await
                .map_err(|e| io_err(&path, e))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &ErrorRecord) -> Result<(), AuditError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| io_err(&self.path, e))?;

        let mut entries: Vec<Value> = if raw.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&raw).map_err(|e| AuditError::Malformed {
                path: self.path.clone(),
                message: e.to_string(),
            })?
        };
        let value = serde_json::to_value(record).map_err(|e| AuditError::Malformed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        entries.push(value);

        let json = serde_json::to_string_pretty(&entries).map_err(|e| AuditError::Malformed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        // Write atomically (temp file + rename)
        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| io_err(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| io_err(&self.path, e))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_err(path: &Path, source: std::io::Error) -> AuditError {
    AuditError::Io {
        path: path.to_path_buf(),
        source,
    }
}
