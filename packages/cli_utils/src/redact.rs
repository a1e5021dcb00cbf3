//! Scrubbing of URLs and credentials from free text.

use std::sync::LazyLock;

use regex::Regex;

/// Replacement for any `http(s)://` URL.
pub const REDACTED_URL: &str = "<REDACTED_URL>";

/// Replacement for a credential assignment such as `api-key=...`.
pub const REDACTED_TOKEN: &str = "<REDACTED_TOKEN>";

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("URL pattern is valid"));

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(api[_-]?key|authorization|token)\s*[:=]\s*(bearer\s+)?['"]?\S+"#,
    )
    .expect("token pattern is valid")
});

/// Replaces URLs and credential-looking substrings in `text`.
#[must_use]
pub fn redact(text: &str) -> String {
    let text = URL_RE.replace_all(text, REDACTED_URL);
    TOKEN_RE.replace_all(&text, REDACTED_TOKEN).into_owned()
}
