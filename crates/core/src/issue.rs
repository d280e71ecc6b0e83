//! Issue entity and the storage capability the reconciler depends on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// A ticket aggregating every occurrence of one dedup title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub analysis: Option<String>,
    pub application_type: Option<String>,
    pub occurrence: i64,
    pub issue_logs: Vec<String>,
    pub status: IssueStatus,
    pub severity: Severity,
    pub error_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating an issue. Status starts as `Open`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    pub title: String,
    pub description: Option<String>,
    pub application_type: Option<String>,
    pub occurrence: i64,
    pub issue_logs: Vec<String>,
    pub severity: Severity,
    pub error_type: Option<String>,
}

/// Fields written on a dedup match. `None` leaves the column untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueUpdate {
    pub occurrence: i64,
    pub issue_logs: Vec<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Issue not found: {0}")]
    NotFound(Uuid),

    #[error("Issue store error: {0}")]
    Backend(String),
}

/// Persistence capability for issues.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Exact title match. When several issues share a title the oldest wins.
    async fn get_by_title(&self, title: &str) -> Result<Option<Issue>, StoreError>;

    async fn create(&self, issue: NewIssue) -> Result<Issue, StoreError>;

    async fn update(&self, id: Uuid, update: IssueUpdate) -> Result<Issue, StoreError>;
}

/// In-process store. Used by tests and `--memory-store` runs.
#[derive(Default)]
pub struct MemoryIssueStore {
    issues: Mutex<Vec<Issue>>,
}

impl MemoryIssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Issue> {
        self.issues.lock().await.clone()
    }
}

#[async_trait]
impl IssueStore for MemoryIssueStore {
    async fn get_by_title(&self, title: &str) -> Result<Option<Issue>, StoreError> {
        let issues = self.issues.lock().await;
        Ok(issues.iter().find(|i| i.title == title).cloned())
    }

    async fn create(&self, issue: NewIssue) -> Result<Issue, StoreError> {
        let now = Utc::now();
        let created = Issue {
            id: Uuid::new_v4(),
            title: issue.title,
            description: issue.description,
            analysis: None,
            application_type: issue.application_type,
            occurrence: issue.occurrence,
            issue_logs: issue.issue_logs,
            status: IssueStatus::Open,
            severity: issue.severity,
            error_type: issue.error_type,
            created_at: now,
            updated_at: now,
        };
        self.issues.lock().await.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, update: IssueUpdate) -> Result<Issue, StoreError> {
        let mut issues = self.issues.lock().await;
        let issue = issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(StoreError::NotFound(id))?;
        issue.occurrence = update.occurrence;
        issue.issue_logs = update.issue_logs;
        if let Some(title) = update.title {
            issue.title = title;
        }
        if let Some(description) = update.description {
            issue.description = Some(description);
        }
        issue.updated_at = Utc::now();
        Ok(issue.clone())
    }
}
