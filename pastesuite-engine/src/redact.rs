//! Preview redaction
//!
//! Applied only to previews stored in events and history, never to text sent
//! to providers.

use regex::Regex;
use std::sync::LazyLock;

pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Number of characters kept in a preview
pub const PREVIEW_CHARS: usize = 50;

static SECRET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // provider API keys
        r"(?i)sk-[a-z0-9]{20,}",
        // long base64 runs
        r"(?i)[a-z0-9+/]{40,}={0,2}",
        r"(?i)password\s*[:=]\s*\S+",
        r"(?i)api[ _-]?key\s*[:=]\s*\S+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("redaction patterns are hardcoded and must be valid"))
    .collect()
});

/// Replaces every secret-shaped substring with [`REDACTION_MARKER`]
pub fn redact(text: &str) -> String {
    let mut redacted = text.to_string();
    for pattern in SECRET_PATTERNS.iter() {
        if pattern.is_match(&redacted) {
            redacted = pattern.replace_all(&redacted, REDACTION_MARKER).into_owned();
        }
    }
    redacted
}

/// Redacted prefix of `text`, at most [`PREVIEW_CHARS`] characters.
///
/// Redaction runs on the full text first so a secret straddling the cut is
/// still recognized.
pub fn preview(text: &str) -> String {
    redact(text).chars().take(PREVIEW_CHARS).collect()
}
