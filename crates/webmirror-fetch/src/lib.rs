//! Fail-safe HTTP fetching for the mirroring engine.
//!
//! # Architecture
//!
//! - [`data`] - options, responses, results and the shared byte counter
//! - [`effects`] - the [`HttpClient`] seam and the [`Fetcher`] built on it
//! - [`permission`] - the permission oracle and a `robots.txt` implementation
//!
//! A failed fetch is data, not an error: [`Fetcher::fetch`] always returns a
//! [`FetchResult`], substituting a tagged placeholder body on failure.

pub mod data;
pub mod effects;
mod error;
pub mod permission;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use data::{
    DownloadCounter, FetchOptions, FetchOrigin, FetchResult, HttpResponse, PLACEHOLDER_BODY,
    PLACEHOLDER_CONTENT_TYPE,
};
pub use effects::{Fetcher, HttpClient};
pub use error::{Error, Result};
pub use permission::{AllowAll, PermissionOracle, RobotsRules};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;
