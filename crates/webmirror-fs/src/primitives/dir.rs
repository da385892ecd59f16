use crate::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Create `dir` and its ancestors. An existing directory is not an error.
pub fn ensure_dir(dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(Error::CreateDir {
            path: dir.to_path_buf(),
            source: e,
        }),
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent(path: impl AsRef<Path>) -> Result<()> {
    match path.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Remove a file, returning `false` if it did not exist.
pub fn remove_file_if_exists(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::Remove {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

pub fn remove_dir_all(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Remove {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Collect every regular file below `root`, sorted for stable output.
pub fn walk_files(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_into(root.as_ref(), &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_into(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| Error::Read {
        path: dir.to_path_buf(),
        source: e,
    })? {
        let entry = entry.map_err(|e| Error::Read {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let file_type = entry.file_type().map_err(|e| Error::Read {
            path: entry.path(),
            source: e,
        })?;

        if file_type.is_dir() {
            walk_into(&entry.path(), files)?;
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    Ok(())
}
