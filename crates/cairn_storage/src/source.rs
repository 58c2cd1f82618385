//! Re-openable content sources.

use bytes::Bytes;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

/// A boxed reader over blob content
pub type ContentReader<'a> = Box<dyn Read + Send + 'a>;

/// Byte content that can be opened for reading any number of times
///
/// Verification reads the content once; consumers read it again later, so
/// every call to [`ContentSource::open`] must start from the first byte.
pub trait ContentSource: fmt::Debug + Send + Sync {
    /// Open a fresh reader positioned at the start of the content
    ///
    /// # Errors
    ///
    /// Returns error if the underlying storage cannot be opened
    fn open(&self) -> io::Result<ContentReader<'_>>;

    /// Content length in bytes
    ///
    /// # Errors
    ///
    /// Returns error if the underlying storage cannot be queried
    fn size(&self) -> io::Result<u64>;
}

impl ContentSource for Bytes {
    fn open(&self) -> io::Result<ContentReader<'_>> {
        Ok(Box::new(Cursor::new(self.clone())))
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }
}

/// Content stored in a file, re-opened on every read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a source for a file path
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContentSource for FileSource {
    fn open(&self) -> io::Result<ContentReader<'_>> {
        Ok(Box::new(io::BufReader::new(File::open(&self.path)?)))
    }

    fn size(&self) -> io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}

/// Read until `buf` is full or the reader is exhausted
pub(crate) fn fill(reader: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
