//! Error types for webmirror-fetch.
//!
//! None of these escape [`Fetcher::fetch`](crate::Fetcher::fetch): every variant is
//! folded into a placeholder result there. They exist so clients can report what
//! went wrong and so the placeholder can carry a reason.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout")]
    Timeout,

    #[error("denied by robots rules")]
    Denied,

    #[error("download size limit of {limit} bytes reached")]
    SizeLimit { limit: u64 },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else if let Some(status) = e.status() {
            Error::Status(status.as_u16())
        } else if e.is_builder() {
            Error::ClientBuild(e.to_string())
        } else {
            Error::Network(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
