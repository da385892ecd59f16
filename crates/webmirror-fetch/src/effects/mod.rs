mod fetcher;
mod http;

pub use fetcher::Fetcher;
pub use http::HttpClient;

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
