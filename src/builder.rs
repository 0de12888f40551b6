use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::archive::ArchiveWriter;
use crate::config::Settings;
use crate::copier::Operation;
use crate::dispatch::{ArchiveVisitor, SearchVisitor, TransferTarget};
use crate::engine::walk;
use crate::error::{DirRole, FileUtilError};
use crate::paths::ensure_directory;
use crate::results::Outcome;
use crate::traits::{Reporter, SilentReporter};

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// What a run does with its matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Report the first regular file named `name`.
    Search { name: OsString },

    /// Copy or move the first regular file named `name` to `storage/name`.
    Transfer {
        name: OsString,
        storage: PathBuf,
        operation: Operation,
    },

    /// Write every regular file whose name contains `pattern` into a
    /// container in `storage`.
    Archive { pattern: OsString, storage: PathBuf },
}

// ---------------------------------------------------------------------------
// TaskBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring and executing one walk.
///
/// Created via [`fileutil::task()`](crate::task). Pick a mode with
/// [`search`](Self::search), [`transfer`](Self::transfer) or
/// [`archive`](Self::archive), then call [`run()`](Self::run).
///
/// # Example
///
/// ```rust,no_run
/// use fileutil::Operation;
///
/// let outcome = fileutil::task("/srv/data")
///     .transfer("/srv/backup", Operation::Copy, "report.csv")
///     .run()?;
/// assert!(outcome.found.is_some());
/// # Ok::<(), fileutil::FileUtilError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    root:     PathBuf,
    mode:     Option<Mode>,
    settings: Settings,
}

impl TaskBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root:     root.into(),
            mode:     None,
            settings: Settings::default(),
        }
    }

    // ── Modes ─────────────────────────────────────────────────────────────

    /// Look for a regular file named exactly `name`.
    pub fn search(mut self, name: impl Into<OsString>) -> Self {
        self.mode = Some(Mode::Search { name: name.into() });
        self
    }

    /// Look for `name` and copy or move it into `storage`.
    ///
    /// `storage` is checked when the file is found, not up front.
    pub fn transfer(
        mut self,
        storage: impl Into<PathBuf>,
        operation: Operation,
        name: impl Into<OsString>,
    ) -> Self {
        self.mode = Some(Mode::Transfer {
            name: name.into(),
            storage: storage.into(),
            operation,
        });
        self
    }

    /// Archive every regular file whose base name contains `pattern`.
    pub fn archive(mut self, storage: impl Into<PathBuf>, pattern: impl Into<OsString>) -> Self {
        self.mode = Some(Mode::Archive {
            pattern: pattern.into(),
            storage: storage.into(),
        });
        self
    }

    // ── Options ───────────────────────────────────────────────────────────

    /// Replace the default [`Settings`].
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// Validate everything that must hold before the walk starts.
    ///
    /// # Errors
    ///
    /// `InvalidSetting` for bad settings or a missing mode, and
    /// `InvalidDirectory` when the root (or, in archive mode, the storage
    /// directory) is not a directory.
    pub fn build(self) -> Result<TraversalContext, FileUtilError> {
        self.settings.validate()?;
        let mode = self.mode.ok_or_else(|| {
            FileUtilError::InvalidSetting("no search, transfer or archive mode selected".into())
        })?;

        ensure_directory(&self.root, DirRole::Root)?;
        if let Mode::Archive { storage, .. } = &mode {
            ensure_directory(storage, DirRole::Storage)?;
        }

        Ok(TraversalContext {
            root: self.root,
            mode,
            settings: self.settings,
        })
    }

    /// Execute the walk without reporting side effects.
    pub fn run(self) -> Result<Outcome, FileUtilError> {
        self.run_with(&mut SilentReporter)
    }

    /// Execute the walk, delivering side effects to `reporter` as they
    /// happen.
    ///
    /// # Errors
    ///
    /// Everything [`build`](Self::build) rejects, `TraversalFailure` when
    /// the tree cannot be read, and `InvalidDirectory` for a storage
    /// directory found missing at the first match in transfer mode.
    /// Failures acting on single matches are collected in
    /// [`Outcome::errors`] instead.
    pub fn run_with(self, reporter: &mut dyn Reporter) -> Result<Outcome, FileUtilError> {
        self.build()?.run(reporter)
    }
}

// ---------------------------------------------------------------------------
// TraversalContext
// ---------------------------------------------------------------------------

/// Validated, immutable parameters of one walk.
#[derive(Debug, Clone)]
pub struct TraversalContext {
    root:     PathBuf,
    mode:     Mode,
    settings: Settings,
}

impl TraversalContext {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Walk the tree once with the visitor for this mode.
    pub fn run(&self, reporter: &mut dyn Reporter) -> Result<Outcome, FileUtilError> {
        let walk_config = self.settings.walk_config();
        let stop = self.settings.stop_on_first_match;
        debug!(root = %self.root.display(), mode = ?self.mode, "starting walk");

        match &self.mode {
            Mode::Search { name } => {
                let mut visitor = SearchVisitor::new(name, None, stop, reporter);
                let stats = walk(&self.root, &walk_config, &mut visitor)?;
                visitor.finish(stats)
            }
            Mode::Transfer { name, storage, operation } => {
                let target = TransferTarget { storage, operation: *operation };
                let mut visitor = SearchVisitor::new(name, Some(target), stop, reporter);
                let stats = walk(&self.root, &walk_config, &mut visitor)?;
                visitor.finish(stats)
            }
            Mode::Archive { pattern, storage } => {
                let writer = ArchiveWriter::new(
                    storage.join(&self.settings.archive_name),
                    self.settings.archive_layout,
                    self.settings.compression(),
                );
                let mut visitor = ArchiveVisitor::new(&self.root, pattern, writer, stop, reporter);
                let stats = walk(&self.root, &walk_config, &mut visitor)?;
                Ok(visitor.finish(stats))
            }
        }
    }
}
