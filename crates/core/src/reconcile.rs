//! Create-or-update decision for a detected error block.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::issue::{IssueStore, IssueUpdate, NewIssue, Severity, StoreError};
use crate::record::ErrorRecord;

/// `error_type` assigned to every issue the monitor creates.
pub const DEFAULT_ERROR_TYPE: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Updated { issue_id: Uuid, occurrence: i64 },
    Created { issue_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    /// Keep an existing issue's title and description on a dedup match.
    /// When `false` they are overwritten with the new block's content.
    pub preserve_original_title: bool,
    pub application_type: Option<String>,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            preserve_original_title: true,
            application_type: None,
        }
    }
}

pub struct IssueReconciler {
    store: Arc<dyn IssueStore>,
    options: ReconcilerOptions,
}

impl IssueReconciler {
    pub fn new(store: Arc<dyn IssueStore>) -> Self {
        Self {
            store,
            options: ReconcilerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReconcilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ReconcilerOptions {
        &self.options
    }

    /// Match `title` against existing issues and record this occurrence.
    ///
    /// Not atomic: the lookup and the write are separate store calls, so two
    /// monitors on the same file can both create an issue for one title.
    pub async fn reconcile(
        &self,
        record: &ErrorRecord,
        title: &str,
        description: &str,
    ) -> Result<ReconcileOutcome, StoreError> {
        if let Some(existing) = self.store.get_by_title(title).await? {
            let occurrence = existing.occurrence + 1;
            let mut issue_logs = existing.issue_logs;
            issue_logs.push(record.error_context.clone());

            let (new_title, new_description) = if self.options.preserve_original_title {
                (None, None)
            } else {
                (Some(title.to_string()), Some(description.to_string()))
            };

            let updated = self
                .store
                .update(
                    existing.id,
                    IssueUpdate {
                        occurrence,
                        issue_logs,
                        title: new_title,
                        description: new_description,
                    },
                )
                .await?;
            info!(issue_id = %updated.id, occurrence = updated.occurrence, "Updated existing issue");
            return Ok(ReconcileOutcome::Updated {
                issue_id: updated.id,
                occurrence: updated.occurrence,
            });
        }

        let severity = if record.level.is_escalation() {
            Severity::High
        } else {
            Severity::Medium
        };
        let created = self
            .store
            .create(NewIssue {
                title: title.to_string(),
                description: Some(description.to_string()),
                application_type: self.options.application_type.clone(),
                occurrence: 1,
                issue_logs: vec![record.error_context.clone()],
                severity,
                error_type: Some(DEFAULT_ERROR_TYPE.to_string()),
            })
            .await?;
        info!(issue_id = %created.id, title = %created.title, "Created new issue");
        Ok(ReconcileOutcome::Created {
            issue_id: created.id,
        })
    }
}
