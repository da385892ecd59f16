//! Run configuration.
//!
//! Every field has a default except `destination`. Files are TOML:
//!
//! ```toml
//! destination = "/tmp/mirror"
//! overwrite = true
//! allowed_extensions = [".html", ".css", ".png"]
//! download_size_limit = 50_000_000
//! max_pages = 20
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use webmirror_fetch::FetchOptions;

use crate::error::{Error, Result};
use crate::extension::{DEFAULT_ALLOWED, DEFAULT_MEMO_CAPACITY, ExtensionPolicy};

pub const DEFAULT_MAX_PAGES: usize = 50;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    /// Root directory of the mirror output.
    pub destination: PathBuf,
    pub overwrite: bool,
    pub allowed_extensions: Vec<String>,
    /// Once this many bytes have been downloaded, further assets are
    /// written as placeholders.
    pub download_size_limit: Option<u64>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Skip the `robots.txt` check.
    pub bypass_robots: bool,
    pub zip_project: bool,
    pub delete_project_folder: bool,
    pub extension_cache_capacity: usize,
    /// Upper bound on pages mirrored when crawling a whole site, the start
    /// page included.
    pub max_pages: usize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        let fetch = FetchOptions::default();
        Self {
            destination: PathBuf::new(),
            overwrite: false,
            allowed_extensions: DEFAULT_ALLOWED.iter().map(|e| e.to_string()).collect(),
            download_size_limit: None,
            request_timeout_secs: fetch.timeout.as_secs(),
            user_agent: fetch.user_agent,
            bypass_robots: true,
            zip_project: true,
            delete_project_folder: false,
            extension_cache_capacity: DEFAULT_MEMO_CAPACITY,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl MirrorConfig {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| Error::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = destination.into();
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn download_size_limit(mut self, limit: Option<u64>) -> Self {
        self.download_size_limit = limit;
        self
    }

    pub fn bypass_robots(mut self, bypass: bool) -> Self {
        self.bypass_robots = bypass;
        self
    }

    pub fn zip_project(mut self, zip: bool) -> Self {
        self.zip_project = zip;
        self
    }

    pub fn delete_project_folder(mut self, delete: bool) -> Self {
        self.delete_project_folder = delete;
        self
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.destination.as_os_str().is_empty() {
            return Err(Error::Config("destination folder is required".to_string()));
        }
        if self.allowed_extensions.is_empty() {
            return Err(Error::Config("allowed_extensions must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be positive".to_string()));
        }
        if self.max_pages == 0 {
            return Err(Error::Config("max_pages must be positive".to_string()));
        }
        if self.delete_project_folder && !self.zip_project {
            return Err(Error::Config(
                "delete_project_folder requires zip_project, the mirror would be lost".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::default()
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .user_agent(self.user_agent.clone())
            .size_limit(self.download_size_limit)
    }

    pub fn extension_policy(&self) -> ExtensionPolicy {
        ExtensionPolicy::new(&self.allowed_extensions).with_capacity(self.extension_cache_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_need_a_destination() {
        assert!(matches!(MirrorConfig::default().validate(), Err(Error::Config(_))));
        assert!(MirrorConfig::new("/tmp/out").validate().is_ok());
    }

    #[test]
    fn zero_page_budget_is_rejected() {
        assert!(MirrorConfig::new("/tmp/out").max_pages(0).validate().is_err());
        assert_eq!(MirrorConfig::default().max_pages, DEFAULT_MAX_PAGES);
    }

    #[test]
    fn deleting_without_zipping_is_rejected() {
        let config = MirrorConfig::new("/tmp/out").zip_project(false).delete_project_folder(true);
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_partial_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mirror.toml");
        std::fs::write(
            &path,
            "destination = \"/srv/mirror\"\noverwrite = true\nallowed_extensions = [\".css\", \"PNG\"]\n",
        )
        .unwrap();

        let config = MirrorConfig::from_path(&path).unwrap();

        assert_eq!(config.destination, PathBuf::from("/srv/mirror"));
        assert!(config.overwrite);
        assert!(config.bypass_robots);
        assert_eq!(config.request_timeout_secs, 30);
        let policy = config.extension_policy();
        assert!(policy.is_allowed(".png"));
        assert!(!policy.is_allowed(".html"));
    }

    #[test]
    fn unknown_keys_are_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mirror.toml");
        std::fs::write(&path, "destination = \"/srv\"\nthreads = 4\n").unwrap();

        assert!(matches!(MirrorConfig::from_path(&path), Err(Error::ConfigFile { .. })));
    }

    #[test]
    fn fetch_options_follow_config() {
        let config = MirrorConfig::new("/tmp/out").download_size_limit(Some(10));
        let options = config.fetch_options();
        assert_eq!(options.size_limit, Some(10));
        assert_eq!(options.timeout, Duration::from_secs(30));
    }
}
