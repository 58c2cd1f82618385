//! Verified blobs.

use crate::source::{ContentReader, ContentSource, fill};
use bytes::Bytes;
use cairn_core::{Digest, DigestError, DigestType, Digester};
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::sync::Arc;

/// Comparison chunk size for [`Blob::content_eq`]
const COMPARE_CHUNK: usize = 32 * 1024;

/// Blob error
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Content does not hash to the declared digest
    #[error("digest mismatch: declared {declared}, computed {computed}")]
    DigestMismatch {
        /// Digest the caller claimed
        declared: Digest,
        /// Digest of the actual content
        computed: Digest,
    },
    /// Declared digest text could not be parsed
    #[error("invalid digest: {0}")]
    InvalidDigest(#[source] DigestError),
    /// A required wire record field is absent
    #[error("blob record is missing its {0}")]
    MissingField(&'static str),
    /// Content could not be read
    #[error("failed to read blob content: {0}")]
    Io(#[from] io::Error),
}

impl BlobError {
    /// Whether retrying the operation could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<DigestError> for BlobError {
    fn from(err: DigestError) -> Self {
        match err {
            DigestError::Io(e) => Self::Io(e),
            other => Self::InvalidDigest(other),
        }
    }
}

/// A blob as delivered by a transport layer
///
/// Both fields are optional on the wire; a record lacking either one is
/// rejected rather than defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRecord {
    /// Digest text, `algorithm:hex`
    pub digest: Option<String>,
    /// Raw content
    pub content: Option<Bytes>,
}

impl BlobRecord {
    /// Create a complete record
    #[must_use]
    pub fn new(digest: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            digest: Some(digest.into()),
            content: Some(content.into()),
        }
    }
}

/// Immutable content paired with its verified digest
///
/// Clones share the underlying content source.
#[derive(Debug, Clone)]
pub struct Blob {
    digest: Digest,
    source: Arc<dyn ContentSource>,
}

impl Blob {
    /// Create a blob, verifying the content against a declared digest
    ///
    /// The content is read once here; later reads re-open the source.
    ///
    /// # Errors
    ///
    /// Returns error if the content cannot be read or does not match
    pub fn new(declared: Digest, source: impl ContentSource + 'static) -> Result<Self, BlobError> {
        let computed = Digester::new(declared.digest_type()).digest_reader(source.open()?)?;
        if computed != declared {
            return Err(BlobError::DigestMismatch { declared, computed });
        }
        Ok(Self {
            digest: declared,
            source: Arc::new(source),
        })
    }

    /// Create a blob from a wire record
    ///
    /// Only an absent field is missing. Present but empty content is a valid
    /// zero-length blob and must still match the declared digest.
    ///
    /// # Errors
    ///
    /// Returns error if a field is missing, the digest is malformed, or the
    /// content does not match
    pub fn from_record(record: BlobRecord) -> Result<Self, BlobError> {
        let digest_text = record.digest.ok_or(BlobError::MissingField("digest"))?;
        let content = record.content.ok_or(BlobError::MissingField("content"))?;
        let declared = Digest::parse(&digest_text).map_err(BlobError::InvalidDigest)?;
        Self::new(declared, content)
    }

    /// Create a blob from in-memory content, computing its digest
    #[must_use]
    pub fn from_bytes(digest_type: DigestType, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            digest: Digester::new(digest_type).digest_bytes(&content),
            source: Arc::new(content),
        }
    }

    /// Create a blob from any re-openable source, computing its digest by
    /// streaming the content once
    ///
    /// # Errors
    ///
    /// Returns error if the source cannot be read
    pub fn from_source(digest_type: DigestType, source: impl ContentSource + 'static) -> Result<Self, BlobError> {
        let digest = Digester::new(digest_type).digest_reader(source.open()?)?;
        Ok(Self {
            digest,
            source: Arc::new(source),
        })
    }

    /// Pair content with a digest without checking it, to stand in for a
    /// broken digest algorithm in tests
    #[cfg(test)]
    pub(crate) fn unverified(digest: Digest, source: impl ContentSource + 'static) -> Self {
        Self {
            digest,
            source: Arc::new(source),
        }
    }

    /// Get digest
    #[must_use]
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Open a fresh reader over the content
    ///
    /// # Errors
    ///
    /// Returns error if the source cannot be opened
    pub fn open(&self) -> io::Result<ContentReader<'_>> {
        self.source.open()
    }

    /// Read the whole content into memory
    ///
    /// # Errors
    ///
    /// Returns error if the source cannot be read
    pub fn read_to_vec(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.open()?.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Content size in bytes
    ///
    /// # Errors
    ///
    /// Returns error if the source cannot be queried
    pub fn size(&self) -> io::Result<u64> {
        self.source.size()
    }

    /// Compare content byte-for-byte with another blob, streaming both
    ///
    /// # Errors
    ///
    /// Returns error if either source cannot be read
    pub fn content_eq(&self, other: &Blob) -> io::Result<bool> {
        if Arc::ptr_eq(&self.source, &other.source) {
            return Ok(true);
        }
        let mut left = self.open()?;
        let mut right = other.open()?;
        let mut lbuf = vec![0u8; COMPARE_CHUNK];
        let mut rbuf = vec![0u8; COMPARE_CHUNK];
        loop {
            let ln = fill(&mut left, &mut lbuf)?;
            let rn = fill(&mut right, &mut rbuf)?;
            if ln != rn || lbuf[..ln] != rbuf[..rn] {
                return Ok(false);
            }
            if ln == 0 {
                return Ok(true);
            }
        }
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl Eq for Blob {}
