//! Run context: owns the shared state of one mirroring run and spawns one task
//! per resource.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;
use webmirror_fetch::{AllowAll, Fetcher, HttpClient, PermissionOracle};

use crate::config::MirrorConfig;
use crate::error::{Error, Result};
use crate::path_map;
use crate::pipeline;
use crate::resource::{Resource, ResourceKind, ResourceState};
use crate::task_group::TaskGroup;
use crate::wait_graph::WaitGraph;
use crate::writer::FileWriter;

#[derive(Debug, Default)]
pub(crate) struct Stats {
    pub written: AtomicUsize,
    pub skipped: AtomicUsize,
    pub failed: AtomicUsize,
    pub placeholders: AtomicUsize,
    pub deduplicated: AtomicUsize,
    pub child_references: AtomicUsize,
}

impl Stats {
    pub fn record(&self, state: ResourceState) {
        let counter = match state {
            ResourceState::Written => &self.written,
            ResourceState::Skipped => &self.skipped,
            ResourceState::Failed => &self.failed,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Terminal state of a claimed resource, `None` until it settles.
pub(crate) type Settled = watch::Receiver<Option<ResourceState>>;

#[derive(Debug, Clone)]
pub(crate) struct Claim {
    pub path: PathBuf,
    pub settled: Settled,
}

pub(crate) struct Shared<C: HttpClient, P: PermissionOracle> {
    pub fetcher: Fetcher<C, P>,
    pub writer: FileWriter,
    pub root: PathBuf,
    /// The first claimant of a URL is the only one that fetches and writes it.
    pub claims: DashMap<String, Claim>,
    pub waits: WaitGraph,
    pub tasks: TaskGroup,
    pub stats: Stats,
    /// Receives every link target met while resolving pages.
    pub links: Mutex<Option<mpsc::UnboundedSender<Url>>>,
}

/// What became of a discovered reference.
pub(crate) enum Child {
    /// This call won the claim; the handle resolves once the child is terminal.
    Spawned {
        path: PathBuf,
        task: JoinHandle<ResourceState>,
    },
    /// Another resource already owns the URL.
    Claimed { path: PathBuf, settled: Settled },
    /// A link to another document, kept as an absolute URL.
    Link { url: Url },
}

impl<C, P> Shared<C, P>
where
    C: HttpClient + 'static,
    P: PermissionOracle + 'static,
{
    /// Claim `url` and spawn its pipeline, or return the claim already bound to it.
    ///
    /// `parent` is the resource the reference was found in. It is recorded as
    /// waiting on a spawned child before the child starts, so the child can
    /// never wait back on it.
    pub fn schedule(
        self: &Arc<Self>,
        url: Url,
        base_url: Url,
        kind: ResourceKind,
        default_extension: Option<&'static str>,
        parent: Option<&Url>,
    ) -> Result<Child> {
        if kind == ResourceKind::Anchor {
            self.announce(&url);
            return Ok(Child::Link { url });
        }

        let path = path_map::map_url(&url, &self.root)?;
        match self.claims.entry(url.to_string()) {
            Entry::Occupied(existing) => {
                self.stats.deduplicated.fetch_add(1, Ordering::Relaxed);
                debug!(url = %url, "already claimed");
                let claim = existing.get().clone();
                Ok(Child::Claimed {
                    path: claim.path,
                    settled: claim.settled,
                })
            }
            Entry::Vacant(slot) => {
                let (done, settled) = watch::channel(None);
                slot.insert(Claim {
                    path: path.clone(),
                    settled,
                });
                if let Some(parent) = parent {
                    self.waits.try_wait(parent.as_str(), url.as_str());
                }
                let resource = Resource::new(url, base_url, path.clone(), kind)
                    .with_default_extension(default_extension);
                let task = self.tasks.spawn(pipeline::run(Arc::clone(self), resource, done));
                Ok(Child::Spawned { path, task })
            }
        }
    }

    fn announce(&self, url: &Url) {
        let links = self.links.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = links.as_ref() {
            let _ = tx.send(url.clone());
        }
    }
}

/// Counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Files written with placeholder content after a failed fetch.
    pub placeholders: usize,
    /// References that reused an already claimed URL.
    pub deduplicated: usize,
    pub child_references: usize,
    pub downloaded_bytes: u64,
}

impl fmt::Display for MirrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} written, {} skipped, {} failed, {} placeholders, {} references, {:.1} KB downloaded",
            self.written,
            self.skipped,
            self.failed,
            self.placeholders,
            self.child_references,
            self.downloaded_bytes as f64 / 1024.0
        )
    }
}

/// Drives a mirroring run.
///
/// Each call to [`mirror`](Self::mirror) spawns an independent task. Resources
/// discovered while resolving pages and stylesheets are spawned into the same
/// group, so one [`barrier`](Self::barrier) covers the whole run.
pub struct Coordinator<C: HttpClient, P: PermissionOracle = AllowAll> {
    shared: Arc<Shared<C, P>>,
}

impl<C, P> Coordinator<C, P>
where
    C: HttpClient + 'static,
    P: PermissionOracle + 'static,
{
    pub fn new(fetcher: Fetcher<C, P>, writer: FileWriter, root: impl Into<PathBuf>) -> Self {
        let root = webmirror_fs::normalize_path(&root.into());
        Self {
            shared: Arc::new(Shared {
                fetcher,
                writer,
                root,
                claims: DashMap::new(),
                waits: WaitGraph::new(),
                tasks: TaskGroup::new(),
                stats: Stats::default(),
                links: Mutex::new(None),
            }),
        }
    }

    /// Validate `config` and build a coordinator writing under its destination.
    ///
    /// The fetcher's own options are left as given; see
    /// [`MirrorConfig::fetch_options`].
    pub fn from_config(config: &MirrorConfig, fetcher: Fetcher<C, P>) -> Result<Self> {
        config.validate()?;
        let destination = std::path::absolute(&config.destination).map_err(|e| {
            Error::Config(format!("destination '{}': {e}", config.destination.display()))
        })?;
        let writer = FileWriter::new(Arc::new(config.extension_policy())).overwrite(config.overwrite);
        Ok(Self::new(fetcher, writer, destination))
    }

    pub fn root(&self) -> &Path {
        &self.shared.root
    }

    /// Start mirroring `url` as an HTML page. Returns the path it maps to.
    pub fn mirror_page(&self, url: &str) -> Result<PathBuf> {
        self.mirror(url, ResourceKind::Page)
    }

    /// Start mirroring `url` as a top-level resource of `kind`.
    ///
    /// Fails before any work is spawned if `url` is not an absolute http(s) URL.
    pub fn mirror(&self, url: &str, kind: ResourceKind) -> Result<PathBuf> {
        if kind == ResourceKind::Anchor {
            return Err(Error::Config("anchor resources are never mirrored".to_string()));
        }

        let mut parsed = Url::parse(url).map_err(|e| Error::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        parsed.set_fragment(None);

        info!(url = %parsed, root = %self.shared.root.display(), "mirroring");
        match self.shared.schedule(parsed.clone(), parsed, kind, None, None)? {
            Child::Spawned { path, .. } | Child::Claimed { path, .. } => Ok(path),
            Child::Link { url } => Err(Error::InvalidUrl {
                url: url.to_string(),
                reason: "not a mirrorable resource".to_string(),
            }),
        }
    }

    /// Stream of link targets (`<a href>` and friends) found in mirrored pages.
    ///
    /// Links are never fetched by the coordinator itself; a caller crawling a
    /// site feeds the ones it wants back through [`mirror_page`](Self::mirror_page).
    /// Only links found after this call are delivered, and a later call
    /// replaces the earlier receiver.
    pub fn subscribe_links(&self) -> mpsc::UnboundedReceiver<Url> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.shared.links.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
        rx
    }

    /// Wait until every resource spawned in this run has reached a terminal state.
    pub async fn barrier(&self) {
        self.shared.tasks.wait().await;
        debug!("all resources settled");
    }

    pub fn report(&self) -> MirrorReport {
        let stats = &self.shared.stats;
        MirrorReport {
            written: stats.written.load(Ordering::Relaxed),
            skipped: stats.skipped.load(Ordering::Relaxed),
            failed: stats.failed.load(Ordering::Relaxed),
            placeholders: stats.placeholders.load(Ordering::Relaxed),
            deduplicated: stats.deduplicated.load(Ordering::Relaxed),
            child_references: stats.child_references.load(Ordering::Relaxed),
            downloaded_bytes: self.shared.fetcher.counter().get(),
        }
    }

    pub fn fetcher(&self) -> &Fetcher<C, P> {
        &self.shared.fetcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::ExtensionPolicy;
    use tempfile::tempdir;
    use webmirror_fetch::testing::MockClient;

    fn setup(root: &Path, client: MockClient) -> Coordinator<MockClient> {
        let writer = FileWriter::new(Arc::new(ExtensionPolicy::default()));
        Coordinator::new(Fetcher::new(client), writer, root)
    }

    #[tokio::test]
    async fn rejects_invalid_urls_up_front() {
        let dir = tempdir().unwrap();
        let coordinator = setup(dir.path(), MockClient::new());

        assert!(matches!(coordinator.mirror_page("not a url"), Err(Error::InvalidUrl { .. })));
        assert!(matches!(
            coordinator.mirror_page("ftp://a.test/"),
            Err(Error::InvalidUrl { .. })
        ));
        coordinator.barrier().await;
        assert_eq!(coordinator.report(), MirrorReport::default());
    }

    #[tokio::test]
    async fn same_top_level_url_is_claimed_once() {
        let dir = tempdir().unwrap();
        let client = MockClient::new().route("https://a.test/x.png", "image/png", "png");
        let coordinator = setup(dir.path(), client);

        let first = coordinator.mirror("https://a.test/x.png", ResourceKind::Generic).unwrap();
        let second = coordinator.mirror("https://a.test/x.png#top", ResourceKind::Generic).unwrap();
        coordinator.barrier().await;

        assert_eq!(first, second);
        assert_eq!(coordinator.fetcher().client().hits("https://a.test/x.png"), 1);
        let report = coordinator.report();
        assert_eq!(report.written, 1);
        assert_eq!(report.deduplicated, 1);
    }

    #[tokio::test]
    async fn links_are_announced_but_not_fetched() {
        let dir = tempdir().unwrap();
        let client = MockClient::new().route(
            "https://a.test/",
            "text/html",
            r#"<a href="/about.html">about</a><a href="https://b.test/">elsewhere</a>"#,
        );
        let coordinator = setup(dir.path(), client);
        let mut links = coordinator.subscribe_links();

        coordinator.mirror_page("https://a.test/").unwrap();
        coordinator.barrier().await;

        let mut found = Vec::new();
        while let Ok(url) = links.try_recv() {
            found.push(url.to_string());
        }
        assert_eq!(found, vec!["https://a.test/about.html", "https://b.test/"]);
        assert_eq!(coordinator.fetcher().client().total_hits(), 1);
    }

    #[tokio::test]
    async fn from_config_requires_destination() {
        let config = MirrorConfig::default();
        let result = Coordinator::from_config(&config, Fetcher::new(MockClient::new()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn report_formats_kilobytes() {
        let report = MirrorReport {
            written: 3,
            downloaded_bytes: 2048,
            ..Default::default()
        };
        assert!(report.to_string().contains("2.0 KB"));
    }
}
