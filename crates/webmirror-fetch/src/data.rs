//! Data layer: fetch configuration, responses and results.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;

/// Body written in place of anything that could not be downloaded.
pub const PLACEHOLDER_BODY: &[u8] =
    b"This File could not be downloaded because the server returned an error response!";

pub const PLACEHOLDER_CONTENT_TYPE: &str = "text/plain";

/// Configuration for HTTP fetching.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Per-request timeout. A lapse counts as a transport failure.
    pub timeout: Duration,
    pub user_agent: String,
    /// Once the shared counter passes this many bytes, further fetches are
    /// answered with placeholders.
    pub size_limit: Option<u64>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("webmirror/", env!("CARGO_PKG_VERSION")).to_string(),
            size_limit: None,
        }
    }
}

impl FetchOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn size_limit(mut self, limit: Option<u64>) -> Self {
        self.size_limit = limit;
        self
    }
}

/// Raw response as seen by an [`HttpClient`](crate::HttpClient).
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// Declared `Content-Length`, if the server sent one.
    pub content_length: Option<u64>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Media type without parameters, lower-cased.
    pub fn mime(&self) -> Option<String> {
        self.content_type.as_deref().map(mime_essence)
    }
}

pub(crate) fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Where the bytes of a [`FetchResult`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOrigin {
    Network { status: u16 },
    /// Synthesized after a transport failure or permission denial.
    Placeholder { reason: String },
}

/// Outcome of [`Fetcher::fetch`](crate::Fetcher::fetch). Always carries a body.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub origin: FetchOrigin,
}

impl FetchResult {
    pub fn placeholder(reason: impl fmt::Display) -> Self {
        Self {
            body: Bytes::from_static(PLACEHOLDER_BODY),
            content_type: Some(PLACEHOLDER_CONTENT_TYPE.to_string()),
            origin: FetchOrigin::Placeholder {
                reason: reason.to_string(),
            },
        }
    }

    pub fn ok(&self) -> bool {
        matches!(self.origin, FetchOrigin::Network { .. })
    }

    pub fn is_placeholder(&self) -> bool {
        !self.ok()
    }

    pub fn mime(&self) -> Option<String> {
        self.content_type.as_deref().map(mime_essence)
    }
}

/// Shared, monotonically increasing byte counter.
#[derive(Debug, Clone, Default)]
pub struct DownloadCounter(Arc<AtomicU64>);

impl DownloadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, bytes: u64) -> u64 {
        self.0.fetch_add(bytes, Ordering::Relaxed) + bytes
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_tagged() {
        let result = FetchResult::placeholder("HTTP status 404");
        assert!(result.is_placeholder());
        assert_eq!(&result.body[..], PLACEHOLDER_BODY);
        assert_eq!(result.mime().as_deref(), Some("text/plain"));
    }

    #[test]
    fn mime_strips_parameters() {
        assert_eq!(mime_essence("Text/CSS; charset=utf-8"), "text/css");
    }

    #[test]
    fn counter_is_shared_between_clones() {
        let counter = DownloadCounter::new();
        let other = counter.clone();
        counter.add(10);
        assert_eq!(other.add(5), 15);
        assert_eq!(counter.get(), 15);
    }
}
