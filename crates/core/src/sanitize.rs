//! ANSI escape stripping for raw log lines.

use regex_lite::Regex;
use std::sync::OnceLock;

static ANSI_ESCAPE: OnceLock<Regex> = OnceLock::new();

fn ansi_escape() -> &'static Regex {
    ANSI_ESCAPE.get_or_init(|| {
        // Two-byte Fe escapes and CSI sequences (ESC [ params intermediates final).
        Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").unwrap()
    })
}

/// Remove ANSI escape sequences and trailing whitespace from a raw line.
///
/// Stripping repeats until no sequence is left, so an escape split around
/// another one (`ESC ESC[0m [0m`) cannot reappear after removal. That keeps
/// `sanitize(sanitize(x)) == sanitize(x)` for every input.
pub fn sanitize(line: &str) -> String {
    let re = ansi_escape();
    let mut clean = line.to_string();
    while re.is_match(&clean) {
        clean = re.replace_all(&clean, "").into_owned();
    }
    clean.truncate(clean.trim_end().len());
    clean
}
