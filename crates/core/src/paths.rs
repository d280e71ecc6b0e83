//! Default storage locations.

use std::path::PathBuf;

/// App cache root: `~/Library/Caches/log-triage/` (macOS) or `~/.cache/log-triage/` (Linux).
pub fn app_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("log-triage"))
}

/// SQLite issue database: `<app_cache_dir>/issues.db`.
pub fn db_path() -> Option<PathBuf> {
    app_cache_dir().map(|d| d.join("issues.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_path_lives_in_cache_dir() {
        if let (Some(cache), Some(db)) = (app_cache_dir(), db_path()) {
            assert!(db.starts_with(&cache));
            assert!(db.ends_with("issues.db"));
        }
    }
}
