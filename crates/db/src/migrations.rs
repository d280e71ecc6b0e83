/// Inline SQL migrations for the issue database.
///
/// Applied in order; the index of each entry (1-based) is its version in
/// the `_migrations` table.

pub const MIGRATIONS: &[&str] = &[
    // Migration 1: issues table
    r#"
CREATE TABLE IF NOT EXISTS issues (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    analysis TEXT,
    application_type TEXT,
    occurrence INTEGER NOT NULL DEFAULT 1,
    issue_logs TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'open',
    severity TEXT NOT NULL DEFAULT 'medium',
    error_type TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
"#,
    // Migration 2: dedup lookups are by exact title
    r#"
CREATE INDEX IF NOT EXISTS idx_issues_title ON issues(title);
"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status, updated_at DESC);
"#,
];
