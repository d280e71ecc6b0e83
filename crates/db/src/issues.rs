//! Issue queries and the `IssueStore` implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log_triage_core::{Issue, IssueStatus, IssueStore, IssueUpdate, NewIssue, Severity, StoreError};
use uuid::Uuid;

use crate::{Database, DbError, DbResult};

type IssueTuple = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
    String,
    String,
    String,
    Option<String>,
    i64,
    i64,
);

const ISSUE_COLUMNS: &str = "id, title, description, analysis, application_type, occurrence, issue_logs, status, severity, error_type, created_at, updated_at";

fn row_to_issue(row: IssueTuple) -> DbResult<Issue> {
    let (
        id,
        title,
        description,
        analysis,
        application_type,
        occurrence,
        issue_logs,
        status,
        severity,
        error_type,
        created_at,
        updated_at,
    ) = row;

    let corrupt = |message: String| DbError::CorruptRow {
        id: id.clone(),
        message,
    };
    let parsed_id = Uuid::parse_str(&id).map_err(|e| corrupt(e.to_string()))?;
    let issue_logs: Vec<String> =
        serde_json::from_str(&issue_logs).map_err(|e| corrupt(format!("issue_logs: {e}")))?;
    let status =
        IssueStatus::parse(&status).ok_or_else(|| corrupt(format!("unknown status {status:?}")))?;
    let severity = Severity::parse(&severity)
        .ok_or_else(|| corrupt(format!("unknown severity {severity:?}")))?;

    Ok(Issue {
        id: parsed_id,
        title,
        description,
        analysis,
        application_type,
        occurrence,
        issue_logs,
        status,
        severity,
        error_type,
        created_at: from_micros(created_at),
        updated_at: from_micros(updated_at),
    })
}

fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}

fn logs_json(logs: &[String]) -> String {
    serde_json::to_string(logs).unwrap_or_else(|_| "[]".to_string())
}

impl Database {
    pub async fn get_issue(&self, id: Uuid) -> DbResult<Option<Issue>> {
        let row = sqlx::query_as::<_, IssueTuple>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(self.pool())
        .await?;
        row.map(row_to_issue).transpose()
    }

    /// Oldest issue with exactly this title.
    pub async fn find_issue_by_title(&self, title: &str) -> DbResult<Option<Issue>> {
        let row = sqlx::query_as::<_, IssueTuple>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE title = ? ORDER BY created_at ASC, rowid ASC LIMIT 1"
        ))
        .bind(title)
        .fetch_optional(self.pool())
        .await?;
        row.map(row_to_issue).transpose()
    }

    /// All issues, most recently updated first.
    pub async fn list_issues(&self) -> DbResult<Vec<Issue>> {
        let rows = sqlx::query_as::<_, IssueTuple>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues ORDER BY updated_at DESC, rowid DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(row_to_issue).collect()
    }

    pub async fn insert_issue(&self, issue: NewIssue) -> DbResult<Issue> {
        let id = Uuid::new_v4();
        let now = Utc::now().timestamp_micros();
        sqlx::query(
            r#"INSERT INTO issues (id, title, description, application_type, occurrence, issue_logs, status, severity, error_type, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id.to_string())
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(&issue.application_type)
        .bind(issue.occurrence)
        .bind(logs_json(&issue.issue_logs))
        .bind(IssueStatus::Open.as_str())
        .bind(issue.severity.as_str())
        .bind(&issue.error_type)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(Issue {
            id,
            title: issue.title,
            description: issue.description,
            analysis: None,
            application_type: issue.application_type,
            occurrence: issue.occurrence,
            issue_logs: issue.issue_logs,
            status: IssueStatus::Open,
            severity: issue.severity,
            error_type: issue.error_type,
            created_at: from_micros(now),
            updated_at: from_micros(now),
        })
    }

    /// Apply a dedup update. Returns `None` when no issue has this id.
    pub async fn update_issue(&self, id: Uuid, update: IssueUpdate) -> DbResult<Option<Issue>> {
        let result = sqlx::query(
            r#"UPDATE issues
               SET occurrence = ?,
                   issue_logs = ?,
                   title = COALESCE(?, title),
                   description = COALESCE(?, description),
                   updated_at = ?
               WHERE id = ?"#,
        )
        .bind(update.occurrence)
        .bind(logs_json(&update.issue_logs))
        .bind(&update.title)
        .bind(&update.description)
        .bind(Utc::now().timestamp_micros())
        .bind(id.to_string())
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_issue(id).await
    }

    pub async fn count_issues(&self) -> DbResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM issues")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }
}

fn backend(e: DbError) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl IssueStore for Database {
    async fn get_by_title(&self, title: &str) -> Result<Option<Issue>, StoreError> {
        self.find_issue_by_title(title).await.map_err(backend)
    }

    async fn create(&self, issue: NewIssue) -> Result<Issue, StoreError> {
        self.insert_issue(issue).await.map_err(backend)
    }

    async fn update(&self, id: Uuid, update: IssueUpdate) -> Result<Issue, StoreError> {
        self.update_issue(id, update)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn new_issue(title: &str) -> NewIssue {
        NewIssue {
            title: title.to_string(),
            description: Some("first sighting".into()),
            application_type: Some("Test".into()),
            occurrence: 1,
            issue_logs: vec!["ERROR a\n  at b".into()],
            severity: Severity::High,
            error_type: Some("general".into()),
        }
    }

    #[tokio::test]
    async fn insert_then_read_back() {
        let db = Database::new_in_memory().await.unwrap();
        let created = db.insert_issue(new_issue("queue consumer crashed")).await.unwrap();

        let fetched = db.get_issue(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.status, IssueStatus::Open);
        assert_eq!(fetched.issue_logs, vec!["ERROR a\n  at b".to_string()]);
    }

    #[tokio::test]
    async fn title_lookup_is_exact() {
        let db = Database::new_in_memory().await.unwrap();
        db.insert_issue(new_issue("queue consumer crashed")).await.unwrap();

        assert!(db.find_issue_by_title("queue consumer crashed").await.unwrap().is_some());
        assert!(db.find_issue_by_title("Queue consumer crashed").await.unwrap().is_none());
        assert!(db.find_issue_by_title("queue consumer").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_keeps_title_unless_given() {
        let db = Database::new_in_memory().await.unwrap();
        let created = db.insert_issue(new_issue("queue consumer crashed")).await.unwrap();

        let updated = db
            .update_issue(
                created.id,
                IssueUpdate {
                    occurrence: 2,
                    issue_logs: vec!["one".into(), "two".into()],
                    title: None,
                    description: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.occurrence, 2);
        assert_eq!(updated.title, "queue consumer crashed");
        assert_eq!(updated.description.as_deref(), Some("first sighting"));
        assert!(updated.updated_at >= created.updated_at);

        let updated = db
            .update_issue(
                created.id,
                IssueUpdate {
                    occurrence: 3,
                    issue_logs: vec![],
                    title: None,
                    description: Some("rewritten".into()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("rewritten"));
    }

    #[tokio::test]
    async fn update_missing_id_is_not_found() {
        let db = Database::new_in_memory().await.unwrap();
        let id = Uuid::new_v4();
        let err = IssueStore::update(
            &db,
            id,
            IssueUpdate {
                occurrence: 2,
                issue_logs: vec![],
                title: None,
                description: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn corrupt_logs_column_is_an_error() {
        let db = Database::new_in_memory().await.unwrap();
        let created = db.insert_issue(new_issue("queue consumer crashed")).await.unwrap();
        sqlx::query("UPDATE issues SET issue_logs = 'not json' WHERE id = ?")
            .bind(created.id.to_string())
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.get_issue(created.id).await.unwrap_err();
        assert!(matches!(err, DbError::CorruptRow { .. }));
        assert!(IssueStore::get_by_title(&db, "queue consumer crashed").await.is_err());
    }
}
