use std::io;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::entry::{EntryKind, FileCandidate};
use crate::error::FileUtilError;
use crate::results::ScanStats;
use crate::traits::{Flow, Visitor};

/// Default cap on concurrently open directory handles.
pub const DEFAULT_MAX_OPEN: usize = 20;

// ---------------------------------------------------------------------------
// WalkConfig
// ---------------------------------------------------------------------------

/// Traversal parameters.
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Maximum number of directory handles held open at once. This bounds
    /// file descriptor use, not depth: deeper directories are still visited,
    /// their parents' listings are buffered in memory instead.
    pub max_open: usize,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self { max_open: DEFAULT_MAX_OPEN }
    }
}

// ---------------------------------------------------------------------------
// walk()
// ---------------------------------------------------------------------------

/// Physical depth-first walk of `root`, calling `visitor` for every entry.
///
/// The root itself is visited first (depth 0). Symlinks are reported as
/// [`EntryKind::Symlink`] and never followed, the root included. Sibling
/// order is whatever the filesystem returns.
///
/// The walk ends when every entry has been visited or the visitor returns
/// [`Flow::Stop`]. Any failure to read a directory or an entry aborts the
/// whole walk with [`FileUtilError::TraversalFailure`].
pub fn walk(
    root: &Path,
    config: &WalkConfig,
    visitor: &mut dyn Visitor,
) -> Result<ScanStats, FileUtilError> {
    if config.max_open == 0 {
        return Err(FileUtilError::InvalidSetting(
            "max_open must be at least 1".into(),
        ));
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .follow_root_links(false)
        .max_open(config.max_open);

    let mut stats = ScanStats::default();
    let start = Instant::now();

    for res in walker {
        let entry = res.map_err(|e| map_walk_error(root, e))?;

        let kind = EntryKind::from(entry.file_type());
        match kind {
            EntryKind::File => stats.files += 1,
            EntryKind::Dir  => stats.dirs += 1,
            _               => stats.others += 1,
        }

        let depth = entry.depth();
        let candidate = FileCandidate::new(entry.into_path(), kind, depth);
        trace!(path = %candidate.path.display(), ?kind, "visit");

        if visitor.visit(&candidate) == Flow::Stop {
            debug!(path = %candidate.path.display(), "walk stopped by visitor");
            stats.stopped_early = true;
            break;
        }
    }

    Ok(stats.finish(start.elapsed()))
}

// ---------------------------------------------------------------------------
// Map walkdir::Error to FileUtilError
// ---------------------------------------------------------------------------

fn map_walk_error(root: &Path, e: walkdir::Error) -> FileUtilError {
    let path = e
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    let source = e
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop"));
    FileUtilError::TraversalFailure { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn collect(root: &Path) -> Vec<(PathBuf, EntryKind, usize)> {
        let mut seen = Vec::new();
        let mut record = |c: &FileCandidate| {
            seen.push((c.path.clone(), c.kind, c.depth));
            Flow::Continue
        };
        walk(root, &WalkConfig::default(), &mut record).unwrap();
        seen
    }

    #[test]
    fn visits_root_and_every_entry_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::write(root.join("sub/b.txt"), "b").unwrap();
        fs::write(root.join("sub/deeper/c.txt"), "c").unwrap();

        let seen = collect(root);
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], (root.to_path_buf(), EntryKind::Dir, 0));
        let c = seen
            .iter()
            .find(|(p, _, _)| p.ends_with("sub/deeper/c.txt"))
            .unwrap();
        assert_eq!((c.1, c.2), (EntryKind::File, 3));
    }

    #[test]
    fn depth_first_children_follow_their_parent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for d in ["x", "y"] {
            fs::create_dir(root.join(d)).unwrap();
            fs::write(root.join(d).join("f"), d).unwrap();
        }

        let seen = collect(root);
        for d in ["x", "y"] {
            let parent = seen.iter().position(|(p, _, _)| p == &root.join(d)).unwrap();
            assert_eq!(seen[parent + 1].0, root.join(d).join("f"));
        }
    }

    #[test]
    fn stats_count_each_kind() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one"), "1").unwrap();
        fs::create_dir(dir.path().join("two")).unwrap();

        let mut ignore = |_: &FileCandidate| Flow::Continue;
        let stats = walk(dir.path(), &WalkConfig::default(), &mut ignore).unwrap();
        assert_eq!((stats.files, stats.dirs, stats.others), (1, 2, 0));
        assert!(!stats.stopped_early);
    }

    #[test]
    fn stop_ends_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("f{i}")), "x").unwrap();
        }

        let mut visits = 0;
        let mut stop_at_first_file = |c: &FileCandidate| {
            visits += 1;
            if c.is_file() { Flow::Stop } else { Flow::Continue }
        };
        let stats = walk(dir.path(), &WalkConfig::default(), &mut stop_at_first_file).unwrap();
        assert_eq!(visits, 2);
        assert!(stats.stopped_early);
    }

    #[test]
    fn deep_tree_with_one_open_handle() {
        let dir = tempfile::tempdir().unwrap();
        let mut deep = dir.path().to_path_buf();
        for i in 0..30 {
            deep.push(format!("d{i}"));
        }
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("bottom.txt"), "x").unwrap();
        fs::write(dir.path().join("d0").join("side.txt"), "x").unwrap();

        let mut files = 0;
        let mut count = |c: &FileCandidate| {
            if c.is_file() {
                files += 1;
            }
            Flow::Continue
        };
        walk(dir.path(), &WalkConfig { max_open: 1 }, &mut count).unwrap();
        assert_eq!(files, 2);
    }

    #[test]
    fn zero_max_open_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ignore = |_: &FileCandidate| Flow::Continue;
        let err = walk(dir.path(), &WalkConfig { max_open: 0 }, &mut ignore).unwrap_err();
        assert!(matches!(err, FileUtilError::InvalidSetting(_)));
    }

    #[test]
    fn missing_root_is_a_traversal_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let mut ignore = |_: &FileCandidate| Flow::Continue;
        let err = walk(&missing, &WalkConfig::default(), &mut ignore).unwrap_err();
        assert!(matches!(err, FileUtilError::TraversalFailure { ref path, .. } if path == &missing));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_reported_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        fs::write(target.path().join("hidden.txt"), "x").unwrap();
        std::os::unix::fs::symlink(target.path(), dir.path().join("link")).unwrap();

        let seen = collect(dir.path());
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].1, EntryKind::Symlink);
        assert!(!seen.iter().any(|(p, _, _)| p.ends_with("hidden.txt")));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_fails_the_walk() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read it anyway.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut ignore = |_: &FileCandidate| Flow::Continue;
        let res = walk(dir.path(), &WalkConfig::default(), &mut ignore);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(res, Err(FileUtilError::TraversalFailure { .. })));
    }
}
