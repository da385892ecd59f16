//! Zip archival of a mirrored site tree.
//!
//! Runs after the mirroring barrier: walks the destination root, writes a sibling
//! `<root>.zip`, and optionally removes the tree.

mod error;
mod pack;

pub use error::{Error, Result};
pub use pack::{PackOptions, PackReport, archive_path, zip_dir};
