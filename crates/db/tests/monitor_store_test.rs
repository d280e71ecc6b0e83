//! End-to-end: log file → monitor → SQLite issue store.

use std::io::Write;
use std::sync::Arc;

use log_triage_core::{IssueStore, LogMonitor, MonitorConfig, Severity};
use log_triage_db::Database;
use pretty_assertions::assert_eq;

fn append(path: &std::path::Path, text: &str) {
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    f.write_all(text.as_bytes()).unwrap();
}

#[tokio::test]
async fn repeated_errors_collapse_into_one_issue() {
    let dir = tempfile::tempdir().unwrap();
    let config = MonitorConfig {
        log_file: dir.path().join("service.log"),
        output_file: dir.path().join("errors.json"),
        database_path: Some(dir.path().join("issues.db")),
        ..MonitorConfig::default()
    };
    let db = Arc::new(Database::new(config.database_path.as_deref().unwrap()).await.unwrap());
    let mut monitor = LogMonitor::from_config(&config, db.clone()).await.unwrap();

    append(
        &config.log_file,
        "2024-03-01 08:00:00 INFO worker started\n\
         2024-03-01 08:00:01 ERROR [billing] invoice export failed for tenant 42\n\
         Traceback (most recent call last):\n\
         \x20 File \"export.py\", line 10, in run\n\
         2024-03-01 08:00:02 WARNING retry scheduled\n",
    );
    let first = monitor.poll_once().await;
    assert_eq!(first.errors_found, 1);
    assert_eq!(first.issues_created, 1);

    append(
        &config.log_file,
        "2024-03-01 09:00:01 ERROR [billing] invoice export failed for tenant 42\n",
    );
    let second = monitor.poll_once().await;
    assert_eq!(second.issues_updated, 1);

    let issues = db.list_issues().await.unwrap();
    assert_eq!(issues.len(), 1);
    let issue = &issues[0];
    assert_eq!(issue.occurrence, 2);
    assert_eq!(issue.severity, Severity::High);
    assert_eq!(issue.application_type.as_deref(), Some("Test"));
    assert_eq!(issue.issue_logs.len(), 2);
    assert!(issue.issue_logs[0].contains("Traceback (most recent call last):"));
    assert!(!issue.issue_logs[0].contains("retry scheduled"));
    assert!(issue.title.contains("invoice export failed for tenant 42"));

    let found = db.get_by_title(&issue.title).await.unwrap().unwrap();
    assert_eq!(found.id, issue.id);

    let audit: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&config.output_file).unwrap()).unwrap();
    assert_eq!(audit.len(), 2);
}

#[tokio::test]
async fn store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issues.db");
    let config = MonitorConfig {
        log_file: dir.path().join("service.log"),
        output_file: dir.path().join("errors.json"),
        ..MonitorConfig::default()
    };
    append(&config.log_file, "CRITICAL certificate for api.example.com expired\n");

    {
        let db = Arc::new(Database::new(&path).await.unwrap());
        let mut monitor = LogMonitor::from_config(&config, db).await.unwrap();
        assert_eq!(monitor.poll_once().await.issues_created, 1);
    }

    // No cursor checkpoint: the restarted monitor replays the file and the
    // replayed block lands on the existing issue.
    let db = Arc::new(Database::new(&path).await.unwrap());
    let mut monitor = LogMonitor::from_config(&config, db.clone()).await.unwrap();
    assert_eq!(monitor.poll_once().await.issues_updated, 1);
    assert_eq!(db.count_issues().await.unwrap(), 1);
}
