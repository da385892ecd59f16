pub mod atomic_write;
pub mod dir;

pub use atomic_write::{AtomicWriteOptions, atomic_read, atomic_write};
pub use dir::{ensure_dir, ensure_parent, remove_dir_all, remove_file_if_exists, walk_files};
