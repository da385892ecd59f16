use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Resolve `.` and `..` lexically. `..` never climbs above the first component.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(part) => result.push(part),
            Component::RootDir => result.push(Component::RootDir.as_os_str()),
            Component::Prefix(prefix) => result.push(prefix.as_os_str()),
            Component::CurDir => {}
        }
    }

    result
}

/// Join `relative` onto `root`, rejecting anything that would land outside it.
pub fn join_within(root: &Path, relative: &Path) -> Result<PathBuf> {
    if relative.is_absolute() {
        return Err(Error::PathEscape {
            path: relative.to_path_buf(),
            root: root.to_path_buf(),
        });
    }

    let root = normalize_path(root);
    let resolved = normalize_path(&root.join(relative));
    if !resolved.starts_with(&root) || resolved == root {
        return Err(Error::PathEscape {
            path: resolved,
            root,
        });
    }
    Ok(resolved)
}
