//! Error types for webmirror-core.
//!
//! Transport failures never appear here; the fetcher turns them into
//! placeholder content. What remains is either fatal before work starts
//! ([`Error::Config`], [`Error::InvalidUrl`]) or local to one resource.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to load configuration from '{path}': {reason}")]
    ConfigFile { path: PathBuf, reason: String },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("file extension {extension:?} is not allowed for '{path}'")]
    DisallowedExtension { extension: String, path: PathBuf },

    #[error("'{path}' is a directory, not a file")]
    IsDirectory { path: PathBuf },

    #[error(transparent)]
    Fs(#[from] webmirror_fs::Error),

    #[error("fetch setup failed: {0}")]
    Fetch(#[from] webmirror_fetch::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
