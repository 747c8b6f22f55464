//! Errors raised while fetching search pages.

/// A page could not be retrieved or decoded. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("Failed to connect to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// No response within the per-request timeout.
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// The server rejected the credentials.
    #[error("Upstream rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The body is not a searchset Bundle.
    #[error("Failed to decode Bundle from {url}: {message}")]
    Decode { url: String, message: String },

    /// The configured base URL is unusable.
    #[error("Invalid base URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { url: url.to_string() }
        } else {
            Self::Transport {
                url: url.to_string(),
                source: err,
            }
        }
    }

    #[must_use]
    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status } | Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
