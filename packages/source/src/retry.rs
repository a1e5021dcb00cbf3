//! Classification of HTTP outcomes into retryable and fatal failures.
//!
//! The run loop owns the actual retry/backoff policy; this module only
//! decides which side of the line a response or transport error falls on.
//!
//! | Outcome | Class |
//! |---|---|
//! | 429, 500, 502, 503, 504 | transient |
//! | any other 4xx / 5xx | fatal |
//! | timeout, connect, body read, other transport errors | transient |
//! | anything else | proceed to body parsing |

use reqwest::StatusCode;

use crate::FetchError;

/// HTTP statuses that are worth retrying.
pub const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Maximum number of characters of a response body kept for diagnostics.
pub const BODY_PREVIEW_LEN: usize = 2_000;

/// How a response status should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Read and parse the body.
    Proceed,
    /// Retry later.
    Transient,
    /// Abort the run.
    Fatal,
}

/// Classifies a response status.
#[must_use]
pub fn classify_status(status: StatusCode) -> StatusClass {
    if TRANSIENT_STATUSES.contains(&status.as_u16()) {
        StatusClass::Transient
    } else if status.is_client_error() || status.is_server_error() {
        StatusClass::Fatal
    } else {
        StatusClass::Proceed
    }
}

/// Returns at most `max` characters of `text`, cut on a char boundary.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> &str {
    text.char_indices()
        .nth(max)
        .map_or(text, |(idx, _)| &text[..idx])
}

/// Returns the leading [`BODY_PREVIEW_LEN`] characters of a response body.
#[must_use]
pub fn body_preview(text: &str) -> String {
    truncate_chars(text, BODY_PREVIEW_LEN).to_string()
}

/// Wraps a transport-level `reqwest` failure as a transient fetch error.
///
/// The request URL (which carries the API key) is stripped from the
/// error before it is rendered.
#[must_use]
pub fn transport_error(e: reqwest::Error) -> FetchError {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else if e.is_body() || e.is_decode() {
        "response body could not be read"
    } else {
        "request failed"
    };
    FetchError::Transient {
        message: format!("{kind}: {}", e.without_url()),
        preview: None,
    }
}
