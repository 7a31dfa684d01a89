//! Error types for meridian-marathon.

/// Result type alias using [`MarathonError`].
pub type MarathonResult<T> = Result<T, MarathonError>;

/// Errors raised by the Marathon client.
#[derive(Debug, thiserror::Error)]
pub enum MarathonError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A non-2xx response.
    #[error("unexpected response {status} from {url}")]
    UnexpectedStatus {
        /// The HTTP status received.
        status: reqwest::StatusCode,
        /// The URL that produced it.
        url: String,
    },

    /// An app definition without an id cannot be addressed.
    #[error("app definition does not contain an id")]
    MissingAppId,

    /// The event stream violated the server-sent-events framing rules.
    #[error("event stream protocol error: {0}")]
    Protocol(String),
}

impl MarathonError {
    /// Create a protocol error.
    #[must_use]
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}
