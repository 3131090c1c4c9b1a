//! Unified error type for model clients.

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Endpoint was empty or not http(s).
    #[error("invalid model endpoint: {0}")]
    InvalidEndpoint(String),

    /// Transport/HTTP client failure (DNS, connect, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status from the provider.
    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        /// Short body excerpt; never contains auth material.
        snippet: String,
    },

    /// Response body did not match the expected shape.
    #[error("failed to decode model response: {0}")]
    Decode(String),

    /// The provider returned an empty result where content was required.
    #[error("model returned no content")]
    Empty,

    /// The call exceeded its configured budget.
    #[error("model call timed out")]
    Timeout,
}

/// Clips a response body for error messages. Keeps errors greppable
/// without dumping whole payloads into logs.
pub(crate) fn body_snippet(text: &str) -> String {
    const MAX: usize = 200;
    let t = text.trim();
    if t.len() <= MAX {
        t.to_string()
    } else {
        let mut end = MAX;
        while end > 0 && !t.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &t[..end])
    }
}
