use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};
use url::Url;
use webmirror_archive::{PackOptions, zip_dir};
use webmirror_core::{Coordinator, MirrorConfig};
use webmirror_fetch::{AllowAll, Fetcher, HttpClient, PermissionOracle, ReqwestClient, RobotsRules};

#[derive(Clone, Debug, Args)]
pub struct PageArg {
    /// Absolute http(s) URL of the page.
    pub url: String,

    /// Output directory. Overrides the config file.
    #[arg(short = 'd', long = "dest")]
    pub destination: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Replace files left by an earlier run.
    #[arg(long)]
    pub overwrite: bool,

    /// Leave the mirror as a folder instead of zipping it.
    #[arg(long)]
    pub no_zip: bool,

    /// Remove the folder once the archive is written.
    #[arg(long)]
    pub delete_folder: bool,

    /// Fetch robots.txt and obey it.
    #[arg(long)]
    pub respect_robots: bool,
}

impl PageArg {
    /// File values first, then command line flags on top.
    pub fn load_config(&self) -> Result<MirrorConfig> {
        let mut config = match &self.config {
            Some(path) => MirrorConfig::from_path(path)?,
            None => MirrorConfig::default(),
        };

        if let Some(destination) = &self.destination {
            config.destination = destination.clone();
        }
        if self.overwrite {
            config.overwrite = true;
        }
        if self.no_zip {
            config.zip_project = false;
        }
        if self.delete_folder {
            config.delete_project_folder = true;
        }
        if self.respect_robots {
            config.bypass_robots = false;
        }

        config.validate()?;
        Ok(config)
    }
}

async fn robots_oracle(client: &ReqwestClient, page: &Url, bypass: bool, user_agent: &str) -> Arc<dyn PermissionOracle> {
    if bypass {
        return Arc::new(AllowAll);
    }

    let Ok(robots) = page.join("/robots.txt") else {
        return Arc::new(AllowAll);
    };
    match client.get(&robots).await {
        Ok(response) if response.is_success() => {
            let body = String::from_utf8_lossy(&response.body);
            info!(url = %robots, "loaded robots rules");
            Arc::new(RobotsRules::parse(page, &body, user_agent))
        }
        Ok(response) => {
            info!(url = %robots, status = response.status, "no robots rules, allowing all");
            Arc::new(AllowAll)
        }
        Err(e) => {
            warn!(url = %robots, error = %e, "could not load robots rules, allowing all");
            Arc::new(AllowAll)
        }
    }
}

pub(crate) type LiveCoordinator = Coordinator<ReqwestClient, Arc<dyn PermissionOracle>>;

pub(crate) fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("invalid page URL '{raw}'"))
}

/// Build a coordinator backed by the real HTTP client, honoring robots rules
/// for `page`'s host unless the config bypasses them.
pub(crate) async fn connect(config: &MirrorConfig, page: &Url) -> Result<LiveCoordinator> {
    let options = config.fetch_options();
    let client = ReqwestClient::new(&options).context("failed to build HTTP client")?;
    let oracle = robots_oracle(&client, page, config.bypass_robots, &config.user_agent).await;
    let fetcher = Fetcher::new(client).with_oracle(oracle).with_options(options);
    Ok(Coordinator::from_config(config, fetcher)?)
}

/// Print the report and archive the mirror. Call after the barrier.
pub(crate) async fn finish(coordinator: &LiveCoordinator, config: &MirrorConfig, index: &Path) -> Result<()> {
    let report = coordinator.report();
    info!(%report, "mirroring finished");
    println!("{}", index.display());
    println!("{report}");

    if config.zip_project {
        let root = coordinator.root().to_path_buf();
        let options = PackOptions::new().delete_source(config.delete_project_folder);
        let packed = tokio::task::spawn_blocking(move || zip_dir(&root, options))
            .await
            .context("archive task failed")?
            .context("failed to archive the mirror")?;
        println!("{} ({} files)", packed.archive.display(), packed.entry_count);
    }

    if report.failed > 0 {
        warn!(failed = report.failed, "some resources were not written");
    }
    Ok(())
}

pub async fn run(arg: PageArg) -> Result<()> {
    let config = arg.load_config()?;
    let page = parse_url(&arg.url)?;

    let coordinator = connect(&config, &page).await?;
    let index = coordinator.mirror_page(page.as_str())?;
    coordinator.barrier().await;

    finish(&coordinator, &config, &index).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg() -> PageArg {
        PageArg {
            url: "https://example.com/".to_string(),
            destination: None,
            config: None,
            overwrite: false,
            no_zip: false,
            delete_folder: false,
            respect_robots: false,
        }
    }

    #[test]
    fn destination_is_required() {
        assert!(arg().load_config().is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let arg = PageArg {
            destination: Some(PathBuf::from("/tmp/out")),
            overwrite: true,
            respect_robots: true,
            ..arg()
        };

        let config = arg.load_config().unwrap();

        assert_eq!(config.destination, PathBuf::from("/tmp/out"));
        assert!(config.overwrite);
        assert!(!config.bypass_robots);
        assert!(config.zip_project);
    }
}
