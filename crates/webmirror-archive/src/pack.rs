use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::{Error, Result};

/// What to do once the archive is written.
#[derive(Clone, Copy, Debug, Default)]
pub struct PackOptions {
    /// Remove the source tree after a successful archive.
    pub delete_source: bool,
}

impl PackOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete_source(mut self, delete: bool) -> Self {
        self.delete_source = delete;
        self
    }
}

#[derive(Clone, Debug)]
pub struct PackReport {
    pub archive: PathBuf,
    pub entry_count: usize,
    pub total_bytes: u64,
    pub source_deleted: bool,
}

/// Path of the archive produced for `root`: a sibling `<root>.zip`.
pub fn archive_path(root: &Path) -> PathBuf {
    let mut name = root.as_os_str().to_os_string();
    name.push(".zip");
    PathBuf::from(name)
}

/// Deflate every regular file under `root` into `<root>.zip`.
///
/// Entry names are relative to `root` with `/` separators. Empty directories are
/// not recorded.
pub fn zip_dir(root: &Path, options: PackOptions) -> Result<PackReport> {
    if !root.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }

    let archive = archive_path(root);
    let files = webmirror_fs::walk_files(root)?;

    let out = File::create(&archive)?;
    let mut writer = ZipWriter::new(BufWriter::new(out));
    let file_options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entry_count = 0;
    let mut total_bytes = 0u64;

    for file in &files {
        let Ok(relative) = file.strip_prefix(root) else {
            continue;
        };
        let name = entry_name(relative);

        let mut source = match File::open(file) {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %file.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };

        writer
            .start_file(name, file_options)
            .map_err(|source| Error::Zip {
                path: file.clone(),
                source,
            })?;
        total_bytes += io::copy(&mut source, &mut writer)?;
        entry_count += 1;
    }

    writer.finish().map_err(|source| Error::Zip {
        path: archive.clone(),
        source,
    })?;

    info!(archive = %archive.display(), entries = entry_count, "saved project as zip archive");

    let mut source_deleted = false;
    if options.delete_source {
        webmirror_fs::remove_dir_all(root)?;
        source_deleted = true;
        info!(root = %root.display(), "deleted project folder");
    }

    Ok(PackReport {
        archive,
        entry_count,
        total_bytes,
        source_deleted,
    })
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_is_a_sibling() {
        let path = archive_path(Path::new("/tmp/out/example.com"));
        assert_eq!(path, Path::new("/tmp/out/example.com.zip"));
    }

    #[test]
    fn entry_names_use_forward_slashes() {
        let name = entry_name(&Path::new("a").join("b").join("c.css"));
        assert_eq!(name, "a/b/c.css");
    }

    #[test]
    fn missing_root_is_rejected() {
        let result = zip_dir(Path::new("/definitely/not/here"), PackOptions::new());
        assert!(matches!(result, Err(Error::NotADirectory(_))));
    }
}
