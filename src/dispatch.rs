//! Visitors bound to a walk: decide whether an entry matches and act on it.

use std::ffi::OsStr;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::archive::{Appended, ArchiveWriter};
use crate::copier::{transfer, Operation};
use crate::entry::FileCandidate;
use crate::error::{DirRole, FileUtilError};
use crate::paths::{destination_path, is_directory, relative_name};
use crate::results::{Outcome, ScanStats};
use crate::traits::{Flow, Reporter, Visitor};

/// Where a found file goes in transfer mode.
#[derive(Debug, Clone, Copy)]
pub struct TransferTarget<'a> {
    pub storage: &'a Path,
    pub operation: Operation,
}

// ---------------------------------------------------------------------------
// Search / transfer
// ---------------------------------------------------------------------------

/// Matches regular files whose base name equals `target` byte for byte.
///
/// The first match is recorded and acted on: reported in search mode,
/// copied or moved in transfer mode. Later matches are only counted. The
/// storage directory is checked at the first match, not before the walk;
/// when it is gone the match is reported as such and the run fails after
/// the walk completes.
pub struct SearchVisitor<'a> {
    target: &'a OsStr,
    transfer: Option<TransferTarget<'a>>,
    stop_on_first_match: bool,
    reporter: &'a mut dyn Reporter,
    outcome: Outcome,
    deferred: Option<FileUtilError>,
}

impl<'a> SearchVisitor<'a> {
    pub fn new(
        target: &'a OsStr,
        transfer: Option<TransferTarget<'a>>,
        stop_on_first_match: bool,
        reporter: &'a mut dyn Reporter,
    ) -> Self {
        Self {
            target,
            transfer,
            stop_on_first_match,
            reporter,
            outcome: Outcome::default(),
            deferred: None,
        }
    }

    /// Attach walk statistics and hand back the outcome, or the storage
    /// error seen during the walk.
    pub fn finish(self, stats: ScanStats) -> Result<Outcome, FileUtilError> {
        if let Some(err) = self.deferred {
            return Err(err);
        }
        Ok(Outcome { stats, ..self.outcome })
    }

    fn act_on_first(&mut self, path: &Path) {
        let Some(TransferTarget { storage, operation }) = self.transfer else {
            self.reporter.on_found(path);
            return;
        };

        if !is_directory(storage) {
            warn!(storage = %storage.display(), "storage directory missing at match time");
            self.reporter.on_storage_invalid(storage);
            self.deferred = Some(FileUtilError::InvalidDirectory {
                role: DirRole::Storage,
                path: storage.to_path_buf(),
            });
            return;
        }

        let dest = destination_path(storage, self.target);
        match transfer(operation, path, &dest) {
            Ok(()) => {
                info!(from = %path.display(), to = %dest.display(), %operation, "transferred");
                self.reporter.on_transferred(operation, &dest);
                self.outcome.transferred = Some(dest);
            }
            Err(e) => {
                warn!(error = %e, "transfer failed");
                self.reporter.on_entry_error(&e);
                self.outcome.errors.push(e);
            }
        }
    }
}

impl Visitor for SearchVisitor<'_> {
    fn visit(&mut self, candidate: &FileCandidate) -> Flow {
        if !candidate.is_file() || candidate.name_bytes() != self.target.as_encoded_bytes() {
            return Flow::Continue;
        }

        self.outcome.matches += 1;
        if self.outcome.found.is_some() {
            debug!(path = %candidate.path.display(), "additional match ignored");
            return Flow::Continue;
        }

        self.outcome.found = Some(candidate.path.clone());
        self.act_on_first(&candidate.path);

        if self.stop_on_first_match {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

/// Matches regular files whose base name contains `pattern` anywhere, and
/// writes each one into the container.
///
/// Container failures are reported and the walk moves on; unreadable
/// sources are skipped quietly.
pub struct ArchiveVisitor<'a> {
    root: &'a Path,
    pattern: &'a [u8],
    writer: ArchiveWriter,
    stop_on_first_match: bool,
    reporter: &'a mut dyn Reporter,
    outcome: Outcome,
}

impl<'a> ArchiveVisitor<'a> {
    pub fn new(
        root: &'a Path,
        pattern: &'a OsStr,
        writer: ArchiveWriter,
        stop_on_first_match: bool,
        reporter: &'a mut dyn Reporter,
    ) -> Self {
        Self {
            root,
            pattern: pattern.as_encoded_bytes(),
            writer,
            stop_on_first_match,
            reporter,
            outcome: Outcome::default(),
        }
    }

    /// Close the container and hand back the outcome.
    pub fn finish(mut self, stats: ScanStats) -> Outcome {
        match self.writer.finish() {
            Ok(Some(container)) => self.outcome.container = Some(container),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "failed to close archive");
                self.reporter.on_entry_error(&e);
                self.outcome.errors.push(e);
            }
        }
        Outcome { stats, ..self.outcome }
    }

    fn is_match(&self, name: &[u8]) -> bool {
        contains(name, self.pattern)
    }
}

impl Visitor for ArchiveVisitor<'_> {
    fn visit(&mut self, candidate: &FileCandidate) -> Flow {
        if !candidate.is_file() || !self.is_match(candidate.name_bytes()) {
            return Flow::Continue;
        }

        self.outcome.matches += 1;
        self.reporter.on_found(&candidate.path);

        let name = relative_name(self.root, &candidate.path);
        match self.writer.append(&candidate.path, &name) {
            Ok(Appended::Written(bytes)) => {
                debug!(path = %candidate.path.display(), bytes, "archived");
                self.outcome.archived += 1;
                self.outcome.container = Some(self.writer.container().to_path_buf());
                self.reporter.on_archived(&candidate.path, self.writer.container());
            }
            Ok(Appended::Skipped) => self.outcome.skipped += 1,
            Err(e) => {
                warn!(error = %e, "archive write failed");
                self.reporter.on_entry_error(&e);
                self.outcome.errors.push(e);
            }
        }

        if self.stop_on_first_match {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

/// Byte substring test. An empty needle is contained in everything.
fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}
