use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::{debug, info, warn};
use url::Url;
use webmirror_core::{Coordinator, MirrorConfig, path_map};
use webmirror_fetch::{HttpClient, PermissionOracle};

use super::page::{self, PageArg};

/// Extensions of links that are followed as pages.
const PAGE_EXTENSIONS: &[&str] = &[
    ".html", ".htm", ".xhtml", ".shtml", ".php", ".asp", ".aspx", ".jsp",
];

#[derive(Clone, Debug, Args)]
pub struct SiteArg {
    #[command(flatten)]
    pub page: PageArg,

    /// Stop after this many pages, the start page included. Overrides the
    /// config file.
    #[arg(long)]
    pub max_pages: Option<usize>,
}

impl SiteArg {
    pub fn load_config(&self) -> Result<MirrorConfig> {
        let mut config = self.page.load_config()?;
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Decides which discovered links are mirrored as pages.
#[derive(Debug)]
struct Frontier {
    origin: Url,
    seen: HashSet<String>,
    budget: usize,
}

impl Frontier {
    fn new(start: &Url, max_pages: usize) -> Self {
        let mut seen = HashSet::new();
        seen.insert(start.as_str().to_string());
        Self {
            origin: start.clone(),
            seen,
            budget: max_pages.saturating_sub(1),
        }
    }

    /// Record `link` and report whether it should be mirrored next.
    fn admit(&mut self, link: &Url) -> bool {
        if self.budget == 0
            || link.host_str() != self.origin.host_str()
            || link.port_or_known_default() != self.origin.port_or_known_default()
            || !matches!(link.scheme(), "http" | "https")
        {
            return false;
        }
        let is_page =
            path_map::url_extension(link).is_none_or(|ext| PAGE_EXTENSIONS.contains(&ext.as_str()));
        if !is_page || !self.seen.insert(link.as_str().to_string()) {
            return false;
        }
        self.budget -= 1;
        true
    }
}

/// Mirror `start` and every same-site page reachable from it, up to
/// `max_pages`, then wait for the whole run. Returns the start page's path.
pub(crate) async fn crawl<C, P>(
    coordinator: &Coordinator<C, P>,
    start: &Url,
    max_pages: usize,
) -> Result<PathBuf>
where
    C: HttpClient + 'static,
    P: PermissionOracle + 'static,
{
    let mut links = coordinator.subscribe_links();
    let mut frontier = Frontier::new(start, max_pages);
    let index = coordinator.mirror_page(start.as_str())?;

    let mut follow = |link: Url| -> bool {
        if !frontier.admit(&link) {
            return false;
        }
        match coordinator.mirror_page(link.as_str()) {
            Ok(path) => {
                debug!(url = %link, path = %path.display(), "following link");
                true
            }
            Err(e) => {
                warn!(url = %link, error = %e, "cannot follow link");
                false
            }
        }
    };

    loop {
        tokio::select! {
            biased;
            Some(link) = links.recv() => {
                follow(link);
            }
            () = coordinator.barrier() => {
                // nothing is running, so every link found so far is queued
                let mut followed = false;
                while let Ok(link) = links.try_recv() {
                    followed |= follow(link);
                }
                if !followed {
                    break;
                }
            }
        }
    }

    info!(pages = max_pages - frontier.budget, "site crawl finished");
    Ok(index)
}

pub async fn run(arg: SiteArg) -> Result<()> {
    let config = arg.load_config()?;
    let start = page::parse_url(&arg.page.url)?;

    let coordinator = page::connect(&config, &start).await?;
    let index = crawl(&coordinator, &start, config.max_pages).await?;

    page::finish(&coordinator, &config, &index).await
}
