use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::app::{App, Commands};

mod cli;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = App::parse();
    init_tracing(app.verbose);

    match app.cmd {
        Commands::Page(arg) => cli::page::run(arg).await,
        Commands::Site(arg) => cli::site::run(arg).await,
    }
}
