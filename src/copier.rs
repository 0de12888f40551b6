//! Chunked byte streaming and the copy / move transfer actions.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;
use std::str::FromStr;

use same_file::is_same_file;
use tracing::debug;

use crate::error::{FileUtilError, OpenRole};

/// Bytes moved per read/write round.
pub const CHUNK_SIZE: usize = 1024;

/// Transfer applied to a found file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Duplicate into the storage directory, keep the source.
    Copy,

    /// Rename into the storage directory. Never falls back to copy + delete.
    Move,
}

impl Operation {
    pub fn flag(self) -> &'static str {
        match self {
            Self::Copy => "-cp",
            Self::Move => "-mv",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Copy => "copied",
            Self::Move => "moved",
        }
    }
}

impl FromStr for Operation {
    type Err = FileUtilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-cp" => Ok(Self::Copy),
            "-mv" => Ok(Self::Move),
            other => Err(FileUtilError::InvalidOperation(other.to_string())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

/// Failure inside [`copy_stream`], before paths are attached.
#[derive(Debug)]
pub enum StreamError {
    Read { copied: u64, source: io::Error },
    Write { copied: u64, source: io::Error },
}

impl StreamError {
    /// The destination stopped accepting bytes.
    pub fn is_short_write(&self) -> bool {
        matches!(self, Self::Write { source, .. } if source.kind() == ErrorKind::WriteZero)
    }

    pub fn copied(&self) -> u64 {
        match self {
            Self::Read { copied, .. } | Self::Write { copied, .. } => *copied,
        }
    }

    /// Attach the source and destination paths.
    pub fn into_file_error(self, source_path: &Path, dest_path: &Path) -> FileUtilError {
        if self.is_short_write() {
            return FileUtilError::ShortWrite {
                path: dest_path.to_path_buf(),
                written: self.copied(),
            };
        }
        match self {
            Self::Read { source, .. } => FileUtilError::Io {
                path: source_path.to_path_buf(),
                source,
            },
            Self::Write { source, .. } => FileUtilError::Io {
                path: dest_path.to_path_buf(),
                source,
            },
        }
    }
}

/// Copy `src` into `dst` in [`CHUNK_SIZE`] chunks until `src` is exhausted.
///
/// Every chunk must be accepted in full. A destination that stops taking
/// bytes surfaces as a [`StreamError::Write`] with `WriteZero` and ends the
/// copy at once; interrupted reads are the only thing retried. Returns the
/// number of bytes copied.
pub fn copy_stream<R, W>(src: &mut R, dst: &mut W) -> Result<u64, StreamError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = [0u8; CHUNK_SIZE];
    let mut copied = 0u64;
    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => return Err(StreamError::Read { copied, source }),
        };
        dst.write_all(&buf[..n])
            .map_err(|source| StreamError::Write { copied, source })?;
        copied += n as u64;
    }
}

/// Copy the file at `src` to `dst`, truncating `dst`.
///
/// When `dst` already names the same file as `src` (same device and inode,
/// through any path), nothing is opened for writing and the file is left as
/// is: it already is its own byte-for-byte copy.
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64, FileUtilError> {
    let mut input = File::open(src).map_err(|source| FileUtilError::OpenFailure {
        role: OpenRole::Source,
        path: src.to_path_buf(),
        source,
    })?;
    if is_same_file(src, dst).unwrap_or(false) {
        let len = input
            .metadata()
            .map_err(|source| FileUtilError::Io { path: src.to_path_buf(), source })?
            .len();
        debug!(path = %src.display(), "destination is the source, nothing to copy");
        return Ok(len);
    }
    let mut output = File::create(dst).map_err(|source| FileUtilError::OpenFailure {
        role: OpenRole::Destination,
        path: dst.to_path_buf(),
        source,
    })?;

    let copied = copy_stream(&mut input, &mut output).map_err(|e| e.into_file_error(src, dst))?;
    output.flush().map_err(|source| FileUtilError::Io {
        path: dst.to_path_buf(),
        source,
    })?;

    debug!(from = %src.display(), to = %dst.display(), bytes = copied, "copied");
    Ok(copied)
}

/// Rename `src` to `dst`. Fails across filesystems.
pub fn move_file(src: &Path, dst: &Path) -> Result<(), FileUtilError> {
    fs::rename(src, dst).map_err(|source| FileUtilError::RenameFailure {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source,
    })?;
    debug!(from = %src.display(), to = %dst.display(), "moved");
    Ok(())
}

/// Apply `operation` to move `src` to `dst`.
pub fn transfer(operation: Operation, src: &Path, dst: &Path) -> Result<(), FileUtilError> {
    match operation {
        Operation::Copy => copy_file(src, dst).map(|_| ()),
        Operation::Move => move_file(src, dst),
    }
}
