use std::path::PathBuf;
use std::time::Duration;

use crate::error::FileUtilError;

/// The output of a completed run.
///
/// Per-entry failures never abort a run; they land in `errors` after being
/// reported. Fatal failures come back as `Err` from
/// [`TaskBuilder::run`](crate::TaskBuilder::run) instead.
#[derive(Debug, Default)]
pub struct Outcome {
    /// First regular file whose base name equals the target (search and
    /// transfer modes). Set once and never replaced.
    pub found: Option<PathBuf>,

    /// Number of regular files that matched, including ones after the first.
    pub matches: usize,

    /// Where the found file ended up, when a transfer succeeded.
    pub transferred: Option<PathBuf>,

    /// Matches whose bytes were written into a container (archive mode).
    pub archived: usize,

    /// Matches skipped because their source could not be read (archive mode).
    pub skipped: usize,

    /// Container path, when at least one match was written.
    pub container: Option<PathBuf>,

    /// Non-fatal errors, in the order they happened.
    pub errors: Vec<FileUtilError>,

    /// Walk statistics.
    pub stats: ScanStats,
}

/// Statistics for one walk.
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    /// Regular files encountered (matched or not).
    pub files: usize,

    /// Directories encountered, the root included.
    pub dirs: usize,

    /// Symlinks and special files.
    pub others: usize,

    /// `true` when a visitor ended the walk with [`Flow::Stop`](crate::Flow::Stop).
    pub stopped_early: bool,

    /// Wall-clock time of the walk, visitor work included.
    pub duration: Duration,

    /// Total entries scanned per second. Equals
    /// `(files + dirs + others) / duration.as_secs_f64()`, clamped to 0 on
    /// zero-duration runs.
    pub entries_per_sec: usize,
}

impl ScanStats {
    /// Fill in `duration` and `entries_per_sec`.
    pub(crate) fn finish(mut self, duration: Duration) -> Self {
        let total = self.files + self.dirs + self.others;
        self.entries_per_sec = if duration.as_secs_f64() > 0.0 {
            (total as f64 / duration.as_secs_f64()) as usize
        } else {
            0
        };
        self.duration = duration;
        self
    }
}
