use clap::{Parser, Subcommand};

use super::page::PageArg;
use super::site::SiteArg;

#[derive(Clone, Debug, Parser)]
#[command(name = "webmirror", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Mirror one page and everything it references.
    #[command(alias = "p", name = "page")]
    Page(PageArg),

    /// Mirror a page and the same-site pages it links to.
    #[command(alias = "s", name = "site")]
    Site(SiteArg),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        App::command().debug_assert();
    }

    #[test]
    fn parses_page_with_overrides() {
        let app = App::try_parse_from([
            "webmirror",
            "-v",
            "page",
            "https://example.com/",
            "-d",
            "/tmp/out",
            "--overwrite",
            "--no-zip",
        ])
        .unwrap();

        assert!(app.verbose);
        let Commands::Page(arg) = app.cmd else {
            panic!("expected the page command");
        };
        assert_eq!(arg.url, "https://example.com/");
        assert!(arg.overwrite);
        assert!(arg.no_zip);
        assert!(!arg.respect_robots);
    }

    #[test]
    fn parses_site_with_page_budget() {
        let app = App::try_parse_from([
            "webmirror",
            "site",
            "https://example.com/",
            "-d",
            "/tmp/out",
            "--max-pages",
            "5",
        ])
        .unwrap();

        let Commands::Site(arg) = app.cmd else {
            panic!("expected the site command");
        };
        assert_eq!(arg.page.url, "https://example.com/");
        assert_eq!(arg.max_pages, Some(5));
        assert_eq!(arg.load_config().unwrap().max_pages, 5);
    }
}
