//! Gzip containers for archive mode.
//!
//! Two layouts are supported:
//!
//! - [`ArchiveLayout::PerMatch`]: every match truncates and rewrites the same
//!   container with a single raw gzip stream of that file's bytes, so after a
//!   walk the container holds the last match only. This is what the CLI does.
//! - [`ArchiveLayout::Bundle`]: one container, opened at the first match and
//!   closed after the walk, holding every match as a framed entry:
//!
//! ```text
//! gzip( "FUB1"
//!       ( u32 BE name length | name (UTF-8) | u64 BE size | size bytes )* )
//! ```
//!
//! [`read_bundle`] decodes the second layout.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::copier::{copy_stream, StreamError};
use crate::error::{FileUtilError, OpenRole};

/// Container file name used when none is configured.
pub const DEFAULT_ARCHIVE_NAME: &str = "a1.tar";

/// Leading bytes of a bundle, inside the gzip stream.
pub const BUNDLE_MAGIC: &[u8; 4] = b"FUB1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveLayout {
    /// One container per match, each overwriting the last.
    #[default]
    PerMatch,

    /// One container holding every match.
    Bundle,
}

/// What happened to one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    /// The source was written, this many bytes.
    Written(u64),

    /// The source could not be opened or read and was left out.
    Skipped,
}

enum BundleState {
    Unopened,
    Open(GzEncoder<File>),
    Closed,
}

/// Streams matched files into gzip containers.
pub struct ArchiveWriter {
    container: PathBuf,
    layout: ArchiveLayout,
    level: Compression,
    bundle: BundleState,
}

impl ArchiveWriter {
    pub fn new(container: PathBuf, layout: ArchiveLayout, level: Compression) -> Self {
        Self {
            container,
            layout,
            level,
            bundle: BundleState::Unopened,
        }
    }

    pub fn container(&self) -> &Path {
        &self.container
    }

    /// Write `source` into the container under `name`.
    ///
    /// `Err` means the container side failed (open, write or finish). A
    /// source that cannot be opened or read is not an error: it comes back as
    /// [`Appended::Skipped`].
    pub fn append(&mut self, source: &Path, name: &str) -> Result<Appended, FileUtilError> {
        match self.layout {
            ArchiveLayout::PerMatch => self.write_single(source),
            ArchiveLayout::Bundle   => self.append_to_bundle(source, name),
        }
    }

    /// Close the bundle, if one was opened. Returns the container path when
    /// anything was ever written to it.
    pub fn finish(self) -> Result<Option<PathBuf>, FileUtilError> {
        match self.bundle {
            BundleState::Open(encoder) => {
                encoder.finish().map_err(|source| FileUtilError::Io {
                    path: self.container.clone(),
                    source,
                })?;
                Ok(Some(self.container))
            }
            BundleState::Closed => Ok(Some(self.container)),
            BundleState::Unopened => Ok(None),
        }
    }

    fn write_single(&mut self, source: &Path) -> Result<Appended, FileUtilError> {
        let file = File::create(&self.container).map_err(|e| self.open_failure(e))?;
        let mut encoder = GzEncoder::new(file, self.level);

        let appended = match File::open(source) {
            Ok(mut input) => match copy_stream(&mut input, &mut encoder) {
                Ok(n) => Appended::Written(n),
                Err(e @ StreamError::Read { .. }) => {
                    debug!(path = %source.display(), error = ?e, "source read failed, skipping");
                    Appended::Skipped
                }
                Err(e) => return Err(e.into_file_error(source, &self.container)),
            },
            Err(e) => {
                debug!(path = %source.display(), error = %e, "source not readable, skipping");
                Appended::Skipped
            }
        };

        encoder.finish().map_err(|source| FileUtilError::Io {
            path: self.container.clone(),
            source,
        })?;
        Ok(appended)
    }

    fn append_to_bundle(&mut self, source: &Path, name: &str) -> Result<Appended, FileUtilError> {
        let (mut input, size) = match open_sized(source) {
            Ok(pair) => pair,
            Err(e) => {
                debug!(path = %source.display(), error = %e, "source not readable, skipping");
                return Ok(Appended::Skipped);
            }
        };
        let name_len = u32::try_from(name.len()).map_err(|_| FileUtilError::Io {
            path: source.to_path_buf(),
            source: io::Error::new(ErrorKind::InvalidInput, "entry name too long"),
        })?;

        let container = self.container.clone();
        let encoder = self.bundle_encoder()?;

        let written = write_header(encoder, name_len, name, size)
            .map_err(|source| FileUtilError::Io { path: container.clone(), source })
            .and_then(|_| {
                copy_stream(&mut (&mut input).take(size), encoder)
                    .map_err(|e| e.into_file_error(source, &container))
            })
            .and_then(|copied| {
                if copied == size {
                    Ok(copied)
                } else {
                    Err(FileUtilError::TruncatedEntry {
                        path: source.to_path_buf(),
                        expected: size,
                        copied,
                    })
                }
            });

        match written {
            Ok(n) => Ok(Appended::Written(n)),
            Err(e) => {
                // The frame is half written; nothing after it would decode.
                self.close_bundle();
                Err(e)
            }
        }
    }

    fn bundle_encoder(&mut self) -> Result<&mut GzEncoder<File>, FileUtilError> {
        if let BundleState::Unopened = self.bundle {
            let file = File::create(&self.container).map_err(|e| self.open_failure(e))?;
            let mut encoder = GzEncoder::new(file, self.level);
            encoder
                .write_all(BUNDLE_MAGIC)
                .map_err(|source| FileUtilError::Io {
                    path: self.container.clone(),
                    source,
                })?;
            self.bundle = BundleState::Open(encoder);
        }
        match &mut self.bundle {
            BundleState::Open(encoder) => Ok(encoder),
            _ => Err(FileUtilError::ArchiveClosed(self.container.clone())),
        }
    }

    fn close_bundle(&mut self) {
        if let BundleState::Open(encoder) = std::mem::replace(&mut self.bundle, BundleState::Closed) {
            if let Err(e) = encoder.finish() {
                warn!(path = %self.container.display(), error = %e, "failed to close bundle");
            }
        }
    }

    fn open_failure(&self, source: io::Error) -> FileUtilError {
        FileUtilError::OpenFailure {
            role: OpenRole::Container,
            path: self.container.clone(),
            source,
        }
    }
}

fn open_sized(path: &Path) -> io::Result<(File, u64)> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    Ok((file, size))
}

fn write_header<W: Write>(out: &mut W, name_len: u32, name: &str, size: u64) -> io::Result<()> {
    out.write_all(&name_len.to_be_bytes())?;
    out.write_all(name.as_bytes())?;
    out.write_all(&size.to_be_bytes())
}

// ---------------------------------------------------------------------------
// Reading bundles back
// ---------------------------------------------------------------------------

/// One file recovered from a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Path relative to the walk root.
    pub name: String,
    pub data: Vec<u8>,
}

/// Decode every entry of a bundle written with [`ArchiveLayout::Bundle`].
pub fn read_bundle(path: &Path) -> Result<Vec<BundleEntry>, FileUtilError> {
    let io_err = |source| FileUtilError::Io { path: path.to_path_buf(), source };

    let file = File::open(path).map_err(|source| FileUtilError::OpenFailure {
        role: OpenRole::Container,
        path: path.to_path_buf(),
        source,
    })?;
    let mut decoder = GzDecoder::new(BufReader::new(file));

    let mut magic = [0u8; 4];
    decoder.read_exact(&mut magic).map_err(io_err)?;
    if &magic != BUNDLE_MAGIC {
        return Err(io_err(io::Error::new(ErrorKind::InvalidData, "not a bundle")));
    }

    let mut entries = Vec::new();
    loop {
        let mut len = [0u8; 4];
        if !fill_or_eof(&mut decoder, &mut len).map_err(io_err)? {
            break;
        }
        let len = u64::from(u32::from_be_bytes(len));
        let mut name = Vec::new();
        (&mut decoder).take(len).read_to_end(&mut name).map_err(io_err)?;
        if name.len() as u64 != len {
            return Err(io_err(io::Error::from(ErrorKind::UnexpectedEof)));
        }
        let name = String::from_utf8(name)
            .map_err(|e| io_err(io::Error::new(ErrorKind::InvalidData, e)))?;

        let mut size = [0u8; 8];
        decoder.read_exact(&mut size).map_err(io_err)?;
        let size = u64::from_be_bytes(size);

        let mut data = Vec::new();
        (&mut decoder).take(size).read_to_end(&mut data).map_err(io_err)?;
        if data.len() as u64 != size {
            return Err(io_err(io::Error::from(ErrorKind::UnexpectedEof)));
        }
        entries.push(BundleEntry { name, data });
    }
    Ok(entries)
}

/// Fill `buf` completely, or return `false` on a clean end of stream before
/// the first byte.
fn fill_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(io::Error::from(ErrorKind::UnexpectedEof)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Decompress a single-stream container (per-match layout) into memory.
pub fn read_single(path: &Path) -> Result<Vec<u8>, FileUtilError> {
    let file = File::open(path).map_err(|source| FileUtilError::OpenFailure {
        role: OpenRole::Container,
        path: path.to_path_buf(),
        source,
    })?;
    let mut data = Vec::new();
    GzDecoder::new(BufReader::new(file))
        .read_to_end(&mut data)
        .map_err(|source| FileUtilError::Io { path: path.to_path_buf(), source })?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn writer(dir: &Path, layout: ArchiveLayout) -> ArchiveWriter {
        ArchiveWriter::new(dir.join(DEFAULT_ARCHIVE_NAME), layout, Compression::default())
    }

    #[test]
    fn per_match_keeps_only_the_latest_source() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let first = src.path().join("one.txt");
        let second = src.path().join("two.txt");
        fs::write(&first, "first file, longer than the second").unwrap();
        fs::write(&second, vec![b'z'; 3000]).unwrap();

        let mut w = writer(out.path(), ArchiveLayout::PerMatch);
        assert_eq!(w.append(&first, "one.txt").unwrap(), Appended::Written(34));
        assert_eq!(w.append(&second, "two.txt").unwrap(), Appended::Written(3000));
        assert_eq!(w.finish().unwrap(), None);

        let data = read_single(&out.path().join(DEFAULT_ARCHIVE_NAME)).unwrap();
        assert_eq!(data, vec![b'z'; 3000]);
    }

    #[test]
    fn unreadable_source_is_skipped() {
        let out = tempfile::tempdir().unwrap();
        let mut w = writer(out.path(), ArchiveLayout::PerMatch);
        let missing = out.path().join("vanished.txt");
        assert_eq!(w.append(&missing, "vanished.txt").unwrap(), Appended::Skipped);

        // The container was still replaced by a valid, empty stream.
        let data = read_single(&out.path().join(DEFAULT_ARCHIVE_NAME)).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn container_open_failure_is_reported() {
        let out = tempfile::tempdir().unwrap();
        let src = out.path().join("a.txt");
        fs::write(&src, "a").unwrap();

        let mut w = ArchiveWriter::new(
            out.path().join("missing").join(DEFAULT_ARCHIVE_NAME),
            ArchiveLayout::PerMatch,
            Compression::default(),
        );
        let err = w.append(&src, "a.txt").unwrap_err();
        assert!(matches!(err, FileUtilError::OpenFailure { role: OpenRole::Container, .. }));
    }

    #[test]
    fn bundle_holds_every_entry() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let a = src.path().join("a.log");
        let b = src.path().join("b.log");
        let empty = src.path().join("empty.log");
        fs::write(&a, "alpha").unwrap();
        fs::write(&b, vec![1u8; 2048]).unwrap();
        fs::write(&empty, "").unwrap();

        let mut w = writer(out.path(), ArchiveLayout::Bundle);
        w.append(&a, "a.log").unwrap();
        w.append(&b, "nested/b.log").unwrap();
        w.append(&empty, "empty.log").unwrap();
        assert_eq!(w.append(&src.path().join("gone"), "gone").unwrap(), Appended::Skipped);
        let container = w.finish().unwrap().unwrap();

        let entries = read_bundle(&container).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], BundleEntry { name: "a.log".into(), data: b"alpha".to_vec() });
        assert_eq!(entries[1].name, "nested/b.log");
        assert_eq!(entries[1].data, vec![1u8; 2048]);
        assert!(entries[2].data.is_empty());
    }

    #[test]
    fn unused_bundle_creates_nothing() {
        let out = tempfile::tempdir().unwrap();
        let w = writer(out.path(), ArchiveLayout::Bundle);
        assert_eq!(w.finish().unwrap(), None);
        assert!(!out.path().join(DEFAULT_ARCHIVE_NAME).exists());
    }

    #[test]
    fn single_stream_is_not_a_bundle() {
        let out = tempfile::tempdir().unwrap();
        let src = out.path().join("plain.txt");
        fs::write(&src, "just some bytes").unwrap();
        let mut w = ArchiveWriter::new(out.path().join("single.gz"), ArchiveLayout::PerMatch, Compression::fast());
        w.append(&src, "plain.txt").unwrap();

        let err = read_bundle(&out.path().join("single.gz")).unwrap_err();
        assert!(matches!(err, FileUtilError::Io { .. }));
    }

    #[test]
    fn oversized_name_length_is_rejected() {
        let out = tempfile::tempdir().unwrap();
        let path = out.path().join("corrupt.gz");
        let mut encoder = GzEncoder::new(fs::File::create(&path).unwrap(), Compression::fast());
        encoder.write_all(BUNDLE_MAGIC).unwrap();
        encoder.write_all(&u32::MAX.to_be_bytes()).unwrap();
        encoder.write_all(b"short").unwrap();
        encoder.finish().unwrap();

        let err = read_bundle(&path).unwrap_err();
        assert!(matches!(
            err,
            FileUtilError::Io { ref source, .. } if source.kind() == ErrorKind::UnexpectedEof
        ));
    }
}
