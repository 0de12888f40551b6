//! # fileutil
//!
//! Find a file in a directory tree and report it, copy or move it into a
//! storage directory, or gzip every file whose name contains a pattern.
//!
//! One invocation is one single-threaded, physical (symlink-preserving)
//! depth-first walk. The walker ([`walk`]) hands every entry to a
//! [`Visitor`]; the built-in visitors decide whether an entry matches and
//! act on it immediately, before the walk moves on. Failing to act on one
//! match never stops the walk; failing to read the tree does.
//!
//! # Quick Start
//!
//! ```rust
//! use std::fs;
//!
//! let root = tempfile::tempdir().unwrap();
//! fs::create_dir(root.path().join("sub")).unwrap();
//! fs::write(root.path().join("sub/report.csv"), "q1,q2").unwrap();
//!
//! let outcome = fileutil::task(root.path())
//!     .search("report.csv")
//!     .run()
//!     .unwrap();
//!
//! assert_eq!(outcome.found, Some(root.path().join("sub/report.csv")));
//! ```
//!
//! # Archiving
//!
//! ```rust
//! use std::fs;
//!
//! let root = tempfile::tempdir().unwrap();
//! let store = tempfile::tempdir().unwrap();
//! fs::write(root.path().join("notes.txt"), "hello").unwrap();
//!
//! let outcome = fileutil::task(root.path())
//!     .archive(store.path(), ".txt")
//!     .run()
//!     .unwrap();
//!
//! let container = outcome.container.unwrap();
//! assert_eq!(fileutil::archive::read_single(&container).unwrap(), b"hello");
//! ```
//!
//! # Custom Visitors
//!
//! [`walk`] accepts any [`Visitor`], closures included:
//!
//! ```rust
//! use fileutil::{walk, Flow, FileCandidate};
//! use fileutil::engine::WalkConfig;
//!
//! let root = tempfile::tempdir().unwrap();
//! std::fs::write(root.path().join("a.rs"), "").unwrap();
//!
//! let mut rust_files = Vec::new();
//! let mut collect = |c: &FileCandidate| {
//!     if c.is_file() && c.name().ends_with(".rs") {
//!         rust_files.push(c.path.clone());
//!     }
//!     Flow::Continue
//! };
//! walk(root.path(), &WalkConfig::default(), &mut collect).unwrap();
//! assert_eq!(rust_files.len(), 1);
//! ```

#![forbid(unsafe_code)]

pub mod archive;
pub mod config;
pub mod copier;
pub mod dispatch;
pub mod engine;
pub mod paths;

mod builder;
mod entry;
mod error;
mod results;
mod traits;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use archive::ArchiveLayout;
pub use builder::{Mode, TaskBuilder, TraversalContext};
pub use crate::config::Settings;
pub use copier::Operation;
pub use engine::walk;
pub use entry::{EntryKind, FileCandidate};
pub use error::{DirRole, FileUtilError, OpenRole};
pub use results::{Outcome, ScanStats};
pub use traits::{Flow, Reporter, SilentReporter, Visitor};

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`TaskBuilder`] rooted at `root`.
///
/// # Example
///
/// ```rust
/// let root = tempfile::tempdir().unwrap();
///
/// let outcome = fileutil::task(root.path())
///     .search("missing.txt")
///     .run()
///     .unwrap();
///
/// assert!(outcome.found.is_none());
/// ```
pub fn task(root: impl Into<std::path::PathBuf>) -> TaskBuilder {
    TaskBuilder::new(root)
}
