//! Post-processing of captured process output: secret redaction and
//! size truncation. Redaction always runs first so a secret straddling the
//! cut point is never half-exposed.

use std::sync::LazyLock;

use regex::Regex;

/// The replacement text for redacted secrets.
pub const REDACTED: &str = "[REDACTED]";

/// Appended to a stream that was cut at the output limit.
pub const TRUNCATION_SUFFIX: &str = "\n...[TRUNCATED]";

/// `key<sep>value` where key looks like a credential name. The key and
/// separator (including surrounding quotes) are kept; only the value goes.
static SECRET_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(api[_-]?key|token|password|secret)(["']?\s*[:=]\s*["']?)([^\s"',;]+)"#)
        .expect("secret pattern must compile")
});

/// Replace secret-shaped assignments with `[REDACTED]`.
pub fn redact_secrets(text: &str) -> String {
    SECRET_ASSIGNMENT
        .replace_all(text, format!("${{1}}${{2}}{REDACTED}"))
        .into_owned()
}

/// Cut `text` to at most `max_bytes` (on a char boundary) and append the
/// truncation marker. Returns whether anything was cut.
pub fn truncate_output(mut text: String, max_bytes: usize) -> (String, bool) {
    if text.len() <= max_bytes {
        return (text, false);
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str(TRUNCATION_SUFFIX);
    (text, true)
}

/// Redact then truncate one stream. `overflowed` marks a capture that
/// already dropped bytes, which always counts as truncated.
pub fn sanitize(raw: &str, max_bytes: usize, overflowed: bool) -> (String, bool) {
    let (mut text, cut) = truncate_output(redact_secrets(raw), max_bytes);
    if overflowed && !cut {
        text.push_str(TRUNCATION_SUFFIX);
    }
    (text, cut || overflowed)
}
