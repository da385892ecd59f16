//! In-memory [`HttpClient`] for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use url::Url;

use crate::data::HttpResponse;
use crate::effects::HttpClient;
use crate::error::{Error, Result};

/// Serves canned responses keyed by absolute URL and counts requests.
///
/// Unknown URLs answer 404; URLs marked [`unreachable`](Self::unreachable) fail
/// at the transport level.
#[derive(Default)]
pub struct MockClient {
    routes: HashMap<String, HttpResponse>,
    unreachable: HashSet<String>,
    delay: Option<Duration>,
    hits: Mutex<HashMap<String, usize>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, content_type: &str, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.routes.insert(
            url.to_string(),
            HttpResponse {
                status: 200,
                content_type: Some(content_type.to_string()),
                content_length: Some(body.len() as u64),
                body,
            },
        );
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.routes.insert(
            url.to_string(),
            HttpResponse {
                status,
                content_type: Some("text/html".to_string()),
                content_length: None,
                body: Bytes::from_static(b"error page"),
            },
        );
        self
    }

    pub fn unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    /// Delay every response, to widen race windows in concurrency tests.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits
            .lock()
            .map(|hits| hits.get(url).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().map(|hits| hits.values().sum()).unwrap_or(0)
    }
}

impl HttpClient for MockClient {
    type Error = Error;

    async fn get(&self, url: &Url) -> Result<HttpResponse> {
        if let Ok(mut hits) = self.hits.lock() {
            *hits.entry(url.to_string()).or_default() += 1;
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.unreachable.contains(url.as_str()) {
            return Err(Error::Network(format!("connection refused: {url}")));
        }

        Ok(self.routes.get(url.as_str()).cloned().unwrap_or(HttpResponse {
            status: 404,
            content_type: Some("text/html".to_string()),
            content_length: None,
            body: Bytes::from_static(b"not found"),
        }))
    }
}
