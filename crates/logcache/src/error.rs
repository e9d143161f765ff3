//! Error types for log-cache reads and token acquisition

/// Errors returned by readers, the HTTP transport and the OAuth2 wrapper
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured address could not be parsed or joined
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] url::ParseError),

    /// A request could not be assembled from its parts
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ureq::http::Error),

    /// A header value contained characters HTTP does not allow
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] ureq::http::header::InvalidHeaderValue),

    /// Connection, timeout or protocol failure in the HTTP agent
    #[error("request failed: {0}")]
    Transport(#[from] ureq::Error),

    /// The log cache answered with something other than 200
    #[error("unexpected status code {0}")]
    UnexpectedStatus(u16),

    /// The response body was not the expected JSON
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The token endpoint refused to issue a token
    #[error("token request failed with status {0}")]
    TokenRequest(u16),

    /// The read was abandoned because its context was cancelled or timed out
    #[error("read cancelled")]
    Cancelled,

    /// The blocking task running a request panicked or was aborted
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// True if the error represents cancellation rather than a failed read
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
