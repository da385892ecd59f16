//! Filesystem primitives for writing a mirrored site to disk.
//!
//! - [`primitives`] - atomic writes, idempotent directory creation, tree walking
//! - [`contain`] - lexical normalization and root containment checks

pub mod contain;
mod error;
pub mod primitives;

pub use contain::{join_within, normalize_path};
pub use error::{Error, Result};
pub use primitives::{
    AtomicWriteOptions, atomic_read, atomic_write, ensure_dir, ensure_parent, remove_dir_all,
    remove_file_if_exists, walk_files,
};
