//! Failure taxonomy for metric retrieval.
//!
//! These errors stay inside the source crates: the public `MetricsSource`
//! contract absorbs them into empty tables and zero summaries, and reports
//! the message through the source's last-error cell and a `tracing` warning.
//! Nothing above the source boundary handles them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Credentials absent, unreadable, or unparseable. Leaves the source
    /// permanently uninitialized for its lifetime.
    #[error("credentials unavailable: {0}")]
    Credentials(String),

    /// The service-account token exchange failed.
    #[error("token exchange failed: {0}")]
    Auth(String),

    /// Transport-level failure (DNS, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered 2xx but the body did not decode.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl SourceError {
    /// HTTP status, when the failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Api { status, .. } => Some(*status),
            SourceError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
