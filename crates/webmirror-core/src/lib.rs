//! Mirroring engine: maps remote URLs to local files, fetches them fail-safe,
//! rewrites references inside pages and stylesheets, and writes the result.
//!
//! # Architecture
//!
//! - [`path_map`] - deterministic URL to path mapping and relative references
//! - [`extension`] - the file type allow-list and content type inference
//! - [`writer`] - skip/overwrite policy, watermarking, atomic writes
//! - [`coordinator`] - the run context: dedup claims, task group, report
//!
//! Resolution of stylesheets (`url(...)`, `@import`) and pages (tag attributes)
//! happens inside the per-resource pipeline; every discovered reference becomes
//! a child task of the same [`Coordinator`].
//!
//! # Example
//!
//! ```no_run
//! use webmirror_core::{Coordinator, MirrorConfig};
//! use webmirror_fetch::{Fetcher, ReqwestClient};
//!
//! # async fn run() -> webmirror_core::Result<()> {
//! let config = MirrorConfig::new("/tmp/mirror");
//! let client = ReqwestClient::new(&config.fetch_options())?;
//! let fetcher = Fetcher::new(client).with_options(config.fetch_options());
//! let coordinator = Coordinator::from_config(&config, fetcher)?;
//!
//! coordinator.mirror_page("https://example.com/")?;
//! coordinator.barrier().await;
//! println!("{}", coordinator.report());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
mod css;
mod error;
pub mod extension;
mod page;
pub mod path_map;
mod pipeline;
pub mod resource;
mod task_group;
mod wait_graph;
pub mod watermark;
pub mod writer;

pub use config::MirrorConfig;
pub use coordinator::{Coordinator, MirrorReport};
pub use error::{Error, Result};
pub use extension::ExtensionPolicy;
pub use resource::{Resource, ResourceKind, ResourceState};
pub use task_group::TaskGroup;
pub use writer::{FileWriter, WriteOutcome};
