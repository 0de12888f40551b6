use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Which directory argument a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirRole {
    Root,
    Storage,
}

impl fmt::Display for DirRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root    => f.write_str("rootDir"),
            Self::Storage => f.write_str("storageDir"),
        }
    }
}

/// Which side of a transfer or archive step failed to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenRole {
    Source,
    Destination,
    Container,
}

impl fmt::Display for OpenRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source      => f.write_str("source file"),
            Self::Destination => f.write_str("destination file"),
            Self::Container   => f.write_str("archive container"),
        }
    }
}

#[derive(Error, Debug)]
pub enum FileUtilError {
    // Validation
    #[error("Invalid {role}: {}", .path.display())]
    InvalidDirectory { role: DirRole, path: PathBuf },

    #[error("Invalid operation `{0}`, expected -cp or -mv")]
    InvalidOperation(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("configuration error")]
    Config(#[from] config::ConfigError),

    // Traversal
    #[error("traversal failed at {}", .path.display())]
    TraversalFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Per-entry
    #[error("failed to open {role} {}", .path.display())]
    OpenFailure {
        role: OpenRole,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("short write to {} after {written} bytes", .path.display())]
    ShortWrite { path: PathBuf, written: u64 },

    #[error("IO error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to move {} to {}", .from.display(), .to.display())]
    RenameFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} changed size while archiving: expected {expected} bytes, read {copied}", .path.display())]
    TruncatedEntry {
        path: PathBuf,
        expected: u64,
        copied: u64,
    },

    #[error("archive {} was closed after an earlier failure", .0.display())]
    ArchiveClosed(PathBuf),
}

impl FileUtilError {
    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::InvalidDirectory { path, .. }
            | Self::TraversalFailure { path, .. }
            | Self::OpenFailure { path, .. }
            | Self::ShortWrite { path, .. }
            | Self::Io { path, .. }
            | Self::TruncatedEntry { path, .. }
            | Self::ArchiveClosed(path) => Some(path.as_path()),
            Self::RenameFailure { from, .. } => Some(from.as_path()),
            _ => None,
        }
    }

    /// Whether this error ends the whole run.
    ///
    /// Validation and traversal errors are fatal. Everything raised while
    /// acting on a single match is contained to that match and the walk
    /// keeps going.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidDirectory { .. }
                | Self::InvalidOperation(_)
                | Self::InvalidSetting(_)
                | Self::Config(_)
                | Self::TraversalFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directory_message_names_the_argument() {
        let err = FileUtilError::InvalidDirectory {
            role: DirRole::Root,
            path: PathBuf::from("/nope"),
        };
        assert_eq!(err.to_string(), "Invalid rootDir: /nope");
        assert!(err.is_fatal());
    }

    #[test]
    fn per_entry_errors_are_not_fatal() {
        let err = FileUtilError::ShortWrite {
            path: PathBuf::from("/tmp/out"),
            written: 1024,
        };
        assert!(!err.is_fatal());
        assert_eq!(err.path(), Some(Path::new("/tmp/out")));

        let err = FileUtilError::RenameFailure {
            from: PathBuf::from("/a"),
            to: PathBuf::from("/b"),
            source: std::io::Error::other("cross-device link"),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.path(), Some(Path::new("/a")));
    }
}
