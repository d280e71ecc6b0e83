//! Heuristic dedup titles.
//!
//! Strips the noise that makes identical errors look unique (timestamps,
//! severity tags, logger names, thread ids) and keeps the message text.

use regex_lite::Regex;
use std::sync::OnceLock;

use crate::level::keyword_patterns;
use crate::sanitize::sanitize;
use crate::timestamp::timestamp_regex;

/// Title used when too little text survives stripping.
pub const FALLBACK_TITLE: &str = "Error detected in logs";
pub const MIN_TITLE_CHARS: usize = 10;
pub const MAX_TITLE_CHARS: usize = 200;

struct PrefixPatterns {
    separators: Regex,
    logger: Regex,
    digits: Regex,
    brackets: Regex,
}

static PREFIXES: OnceLock<PrefixPatterns> = OnceLock::new();

fn prefixes() -> &'static PrefixPatterns {
    PREFIXES.get_or_init(|| PrefixPatterns {
        separators: Regex::new(r"^[\[\]\s\-_|]+").unwrap(),
        logger: Regex::new(r"^[A-Za-z0-9._-]+\s*:").unwrap(),
        digits: Regex::new(r"^\s*\d+\s*").unwrap(),
        brackets: Regex::new(r"^\s*[\[\](){}]+\s*").unwrap(),
    })
}

/// Derive the dedup title from an error block's first line.
pub fn extract_title(error_line: &str) -> String {
    let p = prefixes();

    let mut title = timestamp_regex()
        .replace_all(&sanitize(error_line), "")
        .into_owned();
    for (_, re) in keyword_patterns() {
        title = re.replace_all(&title, "").into_owned();
    }
    for re in [&p.separators, &p.logger, &p.digits, &p.brackets] {
        title = re.replace(&title, "").into_owned();
    }
    let title = title.trim();

    let chars = title.chars().count();
    if chars < MIN_TITLE_CHARS {
        return FALLBACK_TITLE.to_string();
    }
    if chars > MAX_TITLE_CHARS {
        let mut cut: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
        cut.push_str("...");
        return cut;
    }
    title.to_string()
}
