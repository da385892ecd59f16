use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use url::Url;

/// How a resource is treated once fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Fetched and written verbatim.
    Generic,
    /// Fetched, scanned for `url(...)` and `@import`, rewritten, written.
    Stylesheet,
    /// A link to another page. Never fetched or written.
    Anchor,
    /// An HTML document: fetched, scanned for tags, rewritten, written.
    Page,
}

impl ResourceKind {
    /// Extension assumed when neither the URL nor the content type yields one.
    pub fn default_extension(self) -> Option<&'static str> {
        match self {
            Self::Stylesheet => Some(".css"),
            Self::Page => Some(".html"),
            Self::Generic | Self::Anchor => None,
        }
    }

    pub fn is_scanned(self) -> bool {
        matches!(self, Self::Stylesheet | Self::Page)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Pending,
    Fetching,
    /// Embedded references are being mirrored and rewritten.
    Resolving,
    Writing,
    Skipped,
    Written,
    Failed,
}

impl ResourceState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Skipped | Self::Written | Self::Failed)
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Resolving => "resolving",
            Self::Writing => "writing",
            Self::Skipped => "skipped",
            Self::Written => "written",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One remote URL bound to one local file.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Absolute, fragment-free.
    pub url: Url,
    /// Document the reference was found in.
    pub base_url: Url,
    pub file_path: PathBuf,
    pub kind: ResourceKind,
    /// Overrides the kind's default, e.g. `.jpg` for an `<img>`.
    pub default_extension: Option<&'static str>,
    pub content: Option<Bytes>,
    pub state: ResourceState,
}

impl Resource {
    pub fn new(url: Url, base_url: Url, file_path: PathBuf, kind: ResourceKind) -> Self {
        Self {
            url,
            base_url,
            file_path,
            kind,
            default_extension: kind.default_extension(),
            content: None,
            state: ResourceState::Pending,
        }
    }

    pub fn with_default_extension(mut self, extension: Option<&'static str>) -> Self {
        if extension.is_some() {
            self.default_extension = extension;
        }
        self
    }

    pub(crate) fn transition(&mut self, state: ResourceState) {
        tracing::trace!(url = %self.url, from = %self.state, to = %state, "state change");
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_resources_start_pending() {
        let url = Url::parse("https://a.test/s.css").unwrap();
        let res = Resource::new(url.clone(), url, PathBuf::from("/m/a.test/s.css"), ResourceKind::Stylesheet);
        assert_eq!(res.state, ResourceState::Pending);
        assert_eq!(res.default_extension, Some(".css"));
        assert!(!res.state.is_terminal());
    }

    #[test]
    fn tag_default_overrides_kind_default() {
        let url = Url::parse("https://a.test/pixel").unwrap();
        let res = Resource::new(url.clone(), url, PathBuf::from("/m/a.test/pixel"), ResourceKind::Generic)
            .with_default_extension(Some(".jpg"));
        assert_eq!(res.default_extension, Some(".jpg"));
    }
}
