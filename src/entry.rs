use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// A single filesystem entry handed to a [`Visitor`](crate::traits::Visitor)
/// during a walk.
///
/// Candidates are transient: the walker builds one per entry and the visitor
/// only borrows it for the duration of one callback. Anything a visitor wants
/// to keep (the found path, for instance) has to be cloned out.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    /// Full path to the entry, rooted at the walk root as given.
    pub path: PathBuf,

    /// What kind of entry this is. Symlinks are reported as themselves,
    /// never as their target.
    pub kind: EntryKind,

    /// Byte offset into the path's encoded bytes where the base name starts.
    pub base: usize,

    /// How deep in the traversal this entry was found. Root = 0.
    pub depth: usize,
}

impl FileCandidate {
    pub fn new(path: PathBuf, kind: EntryKind, depth: usize) -> Self {
        let base = base_offset(&path);
        Self { path, kind, base, depth }
    }

    /// The base name as raw bytes, starting at [`base`](Self::base).
    ///
    /// Trailing separators (only possible on a root given as `dir/`) are
    /// not part of the name.
    pub fn name_bytes(&self) -> &[u8] {
        let bytes = self.path.as_os_str().as_encoded_bytes();
        let mut end = bytes.len();
        while end > self.base && is_separator(bytes[end - 1]) {
            end -= 1;
        }
        &bytes[self.base..end]
    }

    /// The base name for display.
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// The kind of a traversed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,

    /// A directory.
    Dir,

    /// A symbolic link, not followed.
    Symlink,

    /// Anything else (device files, pipes, sockets, etc.).
    Other,
}

impl From<std::fs::FileType> for EntryKind {
    fn from(ft: std::fs::FileType) -> Self {
        if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_dir() {
            EntryKind::Dir
        } else if ft.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

fn is_separator(b: u8) -> bool {
    b.is_ascii() && std::path::is_separator(b as char)
}

fn base_offset(path: &Path) -> usize {
    let bytes = path.as_os_str().as_encoded_bytes();
    let mut end = bytes.len();
    while end > 1 && is_separator(bytes[end - 1]) {
        end -= 1;
    }
    bytes[..end]
        .iter()
        .rposition(|b| is_separator(*b))
        .map_or(0, |i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_points_at_the_final_component() {
        let c = FileCandidate::new(PathBuf::from("/data/sub/report.txt"), EntryKind::File, 2);
        assert_eq!(c.base, "/data/sub/".len());
        assert_eq!(c.name_bytes(), b"report.txt");
        assert_eq!(c.name(), "report.txt");
    }

    #[test]
    fn relative_single_component_has_zero_base() {
        let c = FileCandidate::new(PathBuf::from("notes.md"), EntryKind::File, 0);
        assert_eq!(c.base, 0);
        assert_eq!(c.name_bytes(), b"notes.md");
    }

    #[test]
    fn trailing_separator_is_not_part_of_the_name() {
        let c = FileCandidate::new(PathBuf::from("/data/root/"), EntryKind::Dir, 0);
        assert_eq!(c.base, "/data/".len());
        assert_eq!(c.name_bytes(), b"root");
    }

    #[test]
    fn only_regular_files_count_as_files() {
        let dir = FileCandidate::new(PathBuf::from("/a/b.txt"), EntryKind::Dir, 1);
        let link = FileCandidate::new(PathBuf::from("/a/c.txt"), EntryKind::Symlink, 1);
        assert!(!dir.is_file());
        assert!(!link.is_file());
    }
}
