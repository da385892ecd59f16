use tracing::{error, info, warn};
use url::Url;

use crate::data::{DownloadCounter, FetchOptions, FetchOrigin, FetchResult};
use crate::effects::http::HttpClient;
use crate::error::Error;
use crate::permission::{AllowAll, PermissionOracle};

/// Fail-safe fetcher.
///
/// [`fetch`](Self::fetch) never returns an error: a denied, failed or timed out
/// request yields a [`FetchResult::placeholder`] so that one unreachable asset
/// cannot abort the mirror around it.
pub struct Fetcher<C: HttpClient, P: PermissionOracle = AllowAll> {
    client: C,
    oracle: P,
    counter: DownloadCounter,
    options: FetchOptions,
}

impl<C: HttpClient> Fetcher<C, AllowAll> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            oracle: AllowAll,
            counter: DownloadCounter::new(),
            options: FetchOptions::default(),
        }
    }
}

impl<C: HttpClient, P: PermissionOracle> Fetcher<C, P> {
    pub fn with_oracle<Q: PermissionOracle>(self, oracle: Q) -> Fetcher<C, Q> {
        Fetcher {
            client: self.client,
            oracle,
            counter: self.counter,
            options: self.options,
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_counter(mut self, counter: DownloadCounter) -> Self {
        self.counter = counter;
        self
    }

    pub fn counter(&self) -> &DownloadCounter {
        &self.counter
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn fetch(&self, url: &Url) -> FetchResult {
        match self.try_fetch(url).await {
            Ok(result) => result,
            Err(e) => {
                error!(url = %url, reason = %e, "failed to download, substituting placeholder");
                FetchResult::placeholder(e)
            }
        }
    }

    async fn try_fetch(&self, url: &Url) -> Result<FetchResult, Error> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(url.to_string()));
        }

        if !self.oracle.is_allowed(url) {
            warn!(url = %url, "robots rules deny access");
            return Err(Error::Denied);
        }

        if let Some(limit) = self.options.size_limit
            && self.counter.get() >= limit
        {
            return Err(Error::SizeLimit { limit });
        }

        let response = self
            .client
            .get(url)
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.is_success() {
            return Err(Error::Status(response.status));
        }

        let declared = response
            .content_length
            .unwrap_or(response.body.len() as u64);
        let total = self.counter.add(declared);

        info!(
            url = %url,
            status = response.status,
            bytes = declared,
            total_bytes = total,
            "downloaded"
        );

        Ok(FetchResult {
            body: response.body,
            content_type: response.content_type,
            origin: FetchOrigin::Network {
                status: response.status,
            },
        })
    }
}
