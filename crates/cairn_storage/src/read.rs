//! Read-only bucket capability.

use crate::source::ContentReader;
use bytes::Bytes;
use cairn_core::{BucketPath, PathError};
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};

/// Read error
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// No object at this path
    #[error("path not found: {0}")]
    NotFound(String),
    /// Object exists but could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path being read
        path: String,
        /// Read failure
        source: io::Error,
    },
}

impl ReadError {
    /// Check if this is an absence rather than a fault
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether retrying the operation could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Open-by-path and enumerate, nothing more
///
/// Implementations deliver bytes unmodified and report absence as
/// [`ReadError::NotFound`], distinct from I/O faults.
pub trait ReadBucket: Send + Sync {
    /// Open the object at `path` for reading
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if absent, `Io` if present but unreadable
    fn open(&self, path: &str) -> Result<ContentReader<'_>, ReadError>;

    /// Every readable path, each exactly once
    fn paths(&self) -> Vec<&str>;

    /// Read an object fully, mapping absence to `None`
    ///
    /// # Errors
    ///
    /// Returns error if the object exists but cannot be read
    fn read_optional(&self, path: &str) -> Result<Option<Vec<u8>>, ReadError> {
        let mut reader = match self.open(path) {
            Ok(reader) => reader,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut out = Vec::new();
        reader.read_to_end(&mut out).map_err(|source| ReadError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(Some(out))
    }

    /// Check if the bucket has no objects
    fn is_empty(&self) -> bool {
        self.paths().is_empty()
    }
}

/// A bucket held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBucket {
    objects: BTreeMap<BucketPath, Bytes>,
}

impl MemoryBucket {
    /// Create an empty bucket
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from path and content pairs
    ///
    /// # Errors
    ///
    /// Returns error if a path is not normalized
    pub fn from_files<I, P, C>(files: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<Bytes>,
    {
        let mut bucket = Self::new();
        for (path, content) in files {
            bucket.insert(path, content)?;
        }
        Ok(bucket)
    }

    /// Insert or replace an object
    ///
    /// # Errors
    ///
    /// Returns error if the path is not normalized
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Bytes>) -> Result<(), PathError> {
        self.objects.insert(BucketPath::new(path)?, content.into());
        Ok(())
    }
}

impl ReadBucket for MemoryBucket {
    fn open(&self, path: &str) -> Result<ContentReader<'_>, ReadError> {
        self.objects
            .get(path)
            .map(|content| Box::new(Cursor::new(content.clone())) as ContentReader<'_>)
            .ok_or_else(|| ReadError::NotFound(path.to_string()))
    }

    fn paths(&self) -> Vec<&str> {
        self.objects.keys().map(BucketPath::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_bucket_read() {
        let bucket = MemoryBucket::from_files([("a.txt", &b"alpha"[..]), ("d/b.txt", &b"beta"[..])]).unwrap();
        assert_eq!(bucket.paths(), ["a.txt", "d/b.txt"]);
        assert_eq!(bucket.read_optional("a.txt").unwrap().unwrap(), b"alpha");
        assert!(bucket.read_optional("missing").unwrap().is_none());
        assert!(matches!(bucket.open("missing"), Err(e) if e.is_not_found()));
    }

    #[test]
    fn test_memory_bucket_rejects_bad_path() {
        assert!(MemoryBucket::from_files([("../up", &b""[..])]).is_err());
    }

    #[test]
    fn test_empty_bucket() {
        assert!(MemoryBucket::new().is_empty());
    }
}
