//! Directory validation and destination path construction.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DirRole, FileUtilError};

/// `true` when `path` exists and is a directory (symlinks to directories
/// count, the same way `stat` sees them).
pub fn is_directory(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// Fail with [`FileUtilError::InvalidDirectory`] unless `path` is a directory.
pub fn ensure_directory(path: &Path, role: DirRole) -> Result<(), FileUtilError> {
    if is_directory(path) {
        Ok(())
    } else {
        Err(FileUtilError::InvalidDirectory {
            role,
            path: path.to_path_buf(),
        })
    }
}

/// `storage/name`, the destination of a copy or move.
pub fn destination_path(storage: &Path, name: &OsStr) -> PathBuf {
    storage.join(name)
}

/// Name recorded for an archived file: its path relative to the walk root,
/// or the full path when it does not live under the root.
pub fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Whether `name` is a single plain path component.
pub(crate) fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && Path::new(name).file_name() == Some(OsStr::new(name))
}
