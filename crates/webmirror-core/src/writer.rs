use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use webmirror_fs::AtomicWriteOptions;

use crate::error::{Error, Result};
use crate::extension::{self, ExtensionPolicy};
use crate::path_map::extension_of;
use crate::watermark;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    /// The file was already there and overwrite is off.
    Skipped(PathBuf),
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Written(path) | Self::Skipped(path) => path,
        }
    }
}

/// Writes mirrored bytes to disk, appending a watermark to text assets.
#[derive(Debug, Clone)]
pub struct FileWriter {
    policy: Arc<ExtensionPolicy>,
    overwrite: bool,
    options: AtomicWriteOptions,
}

impl FileWriter {
    pub fn new(policy: Arc<ExtensionPolicy>) -> Self {
        Self {
            policy,
            overwrite: false,
            options: AtomicWriteOptions::new(),
        }
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn is_overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn policy(&self) -> &ExtensionPolicy {
        &self.policy
    }

    /// Write `body` to `path`.
    ///
    /// `extension` is the type the body was accepted as; it decides the policy
    /// check and the watermark style. When `None`, the path's own extension is
    /// used.
    pub fn write(
        &self,
        path: &Path,
        body: &[u8],
        source_url: &str,
        extension: Option<&str>,
    ) -> Result<WriteOutcome> {
        if path.is_dir() {
            return Err(Error::IsDirectory {
                path: path.to_path_buf(),
            });
        }
        if path.is_file() {
            if !self.overwrite {
                debug!(path = %path.display(), "file exists, skipping");
                return Ok(WriteOutcome::Skipped(path.to_path_buf()));
            }
            webmirror_fs::remove_file_if_exists(path)?;
            debug!(path = %path.display(), "removed existing file");
        }

        webmirror_fs::ensure_parent(path)?;

        let extension = extension
            .and_then(extension::normalize)
            .or_else(|| extension_of(path));
        let allowed = extension.as_deref().is_some_and(|ext| self.policy.is_allowed(ext));
        if !allowed {
            return Err(Error::DisallowedExtension {
                extension: extension.unwrap_or_default(),
                path: path.to_path_buf(),
            });
        }

        let mark = watermark::render(extension.as_deref(), source_url, Utc::now());
        webmirror_fs::atomic_write(path, &[body, mark.as_slice()], self.options)?;

        info!(path = %path.display(), bytes = body.len(), "wrote file");
        Ok(WriteOutcome::Written(path.to_path_buf()))
    }
}
