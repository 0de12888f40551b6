use std::path::Path;

use crate::copier::Operation;
use crate::entry::FileCandidate;
use crate::error::FileUtilError;

/// What the walker should do after a visitor returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep walking.
    Continue,

    /// End the walk now. The walk still counts as successful.
    Stop,
}

/// Receives every entry the walker produces.
///
/// Visitors run on the walking thread, one call at a time, and whatever a
/// visitor does (copying, compressing) finishes before the walk resumes.
/// Per-entry failures belong inside the visitor: the walker itself only
/// fails when the filesystem cannot be read.
///
/// Closures implement `Visitor` too:
///
/// ```rust
/// use fileutil::{walk, Flow, FileCandidate};
/// use fileutil::engine::WalkConfig;
///
/// let dir = std::env::temp_dir();
/// let mut seen = 0usize;
/// let mut count = |_c: &FileCandidate| { seen += 1; Flow::Stop };
/// walk(&dir, &WalkConfig::default(), &mut count).unwrap();
/// assert_eq!(seen, 1);
/// ```
pub trait Visitor {
    fn visit(&mut self, candidate: &FileCandidate) -> Flow;
}

impl<F> Visitor for F
where
    F: FnMut(&FileCandidate) -> Flow,
{
    fn visit(&mut self, candidate: &FileCandidate) -> Flow {
        self(candidate)
    }
}

/// Side effects of a run, delivered at the moment they happen.
///
/// The CLI prints from these; library callers can record them or ignore
/// them. All methods have default no-op implementations.
pub trait Reporter {
    /// A match was found and should be shown: the first exact match in
    /// search mode, every match in archive mode.
    fn on_found(&mut self, _path: &Path) {}

    /// The found file was copied or moved to `destination`.
    fn on_transferred(&mut self, _operation: Operation, _destination: &Path) {}

    /// A match was written into `container`.
    fn on_archived(&mut self, _source: &Path, _container: &Path) {}

    /// A match was found but the storage directory is unusable.
    fn on_storage_invalid(&mut self, _storage: &Path) {}

    /// Acting on one match failed. The walk continues.
    fn on_entry_error(&mut self, _error: &FileUtilError) {}
}

/// No-op reporter for silent operation.
pub struct SilentReporter;

impl Reporter for SilentReporter {}
