use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicWriteOptions {
    pub sync: bool,
}

impl AtomicWriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

/// Write `parts` back to back into a sibling temp file, then rename it over `path`.
///
/// Readers never observe a half-written file; on failure the temp file is removed.
pub fn atomic_write(path: impl AsRef<Path>, parts: &[&[u8]], options: AtomicWriteOptions) -> Result<()> {
    let path = path.as_ref();
    let parent = path.parent().ok_or_else(|| Error::Write {
        path: path.to_path_buf(),
        source: std::io::Error::other("no parent directory"),
    })?;

    let tmp_path = parent.join(format!(".tmp.{}.webmirror", uuid::Uuid::new_v4()));

    let write_tmp = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        for part in parts {
            file.write_all(part)?;
        }
        if options.sync {
            file.sync_all()?;
        }
        Ok(())
    };

    if let Err(e) = write_tmp() {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Write {
            path: tmp_path,
            source: e,
        });
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        Error::Write {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    Ok(())
}

pub fn atomic_read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_concatenates_parts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("style.css");
        atomic_write(&path, &[b"body{}", b"/*! mark */"], AtomicWriteOptions::new()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"body{}/*! mark */");
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        atomic_write(&path, &[b"data"], AtomicWriteOptions::new().sync(true)).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a.txt")]);
    }

    #[test]
    fn test_atomic_write_missing_parent_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("a.txt");
        let result = atomic_write(&path, &[b"data"], AtomicWriteOptions::new());
        assert!(matches!(result, Err(Error::Write { .. })));
    }
}
