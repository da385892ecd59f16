use std::future::Future;

use url::Url;

use crate::data::HttpResponse;

/// Asynchronous HTTP client abstraction.
///
/// Implementations return non-2xx responses as `Ok`; the
/// [`Fetcher`](crate::Fetcher) decides what counts as a failure.
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - `MockClient` (feature `testing`): canned in-memory responses
pub trait HttpClient: Send + Sync {
    /// Error type for transport-level failures.
    type Error: std::error::Error + Send + 'static;

    /// Issue a GET request and buffer the full response body.
    fn get(&self, url: &Url) -> impl Future<Output = Result<HttpResponse, Self::Error>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;
    use crate::data::FetchOptions;
    use crate::error::{Error, Result};

    /// Production HTTP client implementation using reqwest.
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new(options: &FetchOptions) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(options.timeout)
                .user_agent(options.user_agent.as_str())
                .build()
                .map_err(|e| Error::ClientBuild(e.to_string()))?;
            Ok(Self { client })
        }
    }

    impl HttpClient for ReqwestClient {
        type Error = Error;

        async fn get(&self, url: &Url) -> Result<HttpResponse> {
            let response = self.client.get(url.clone()).send().await?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let content_length = response.content_length();
            let body = response.bytes().await?;

            Ok(HttpResponse {
                status,
                content_type,
                content_length,
                body,
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
