//! Verified buckets: a manifest and a blob set checked against each other.

use crate::blob::Blob;
use crate::blob_set::BlobSet;
use crate::manifest::Manifest;
use crate::read::{ReadBucket, ReadError};
use crate::source::ContentReader;
use cairn_core::Digest;
use serde::{Deserialize, Serialize};

/// Structural checks applied when a bucket is built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketPolicy {
    /// Every digest the manifest references must be in the blob set
    pub all_manifest_blobs_present: bool,
    /// Every blob in the set must be referenced by the manifest
    pub no_extra_blobs: bool,
}

impl BucketPolicy {
    /// Manifest and blob set must correspond exactly; used for building and export
    #[must_use]
    pub const fn complete() -> Self {
        Self {
            all_manifest_blobs_present: true,
            no_extra_blobs: true,
        }
    }
}

/// Bucket construction error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BucketError {
    /// Manifest references a digest with no blob
    #[error("manifest path {path:?} references missing blob {digest}")]
    MissingBlob {
        /// First manifest path bound to the digest
        path: String,
        /// Missing digest
        digest: Digest,
    },
    /// Blob set holds a digest the manifest never references
    #[error("blob {digest} is not referenced by the manifest")]
    UnreferencedBlob {
        /// Unreferenced digest
        digest: Digest,
    },
}

impl BucketError {
    /// Whether retrying the operation could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Metadata for one object in a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Path inside the bucket
    pub path: String,
    /// Digest of the content
    pub digest: Digest,
    /// Content size in bytes
    pub size: u64,
}

/// A read-only, path-addressable view over a verified manifest and blob set
#[derive(Debug, Clone)]
pub struct Bucket {
    manifest: Manifest,
    blobs: BlobSet,
}

impl Bucket {
    /// Compose a manifest and blob set, applying the policy's checks
    ///
    /// # Errors
    ///
    /// Returns the first structural violation found
    pub fn new(manifest: Manifest, blobs: BlobSet, policy: BucketPolicy) -> Result<Self, BucketError> {
        if policy.all_manifest_blobs_present {
            for entry in manifest.entries() {
                if !blobs.contains(&entry.digest) {
                    return Err(BucketError::MissingBlob {
                        path: entry.path.to_string(),
                        digest: entry.digest.clone(),
                    });
                }
            }
        }
        if policy.no_extra_blobs {
            if let Some(digest) = blobs.digests().find(|d| !manifest.references(d)) {
                return Err(BucketError::UnreferencedBlob {
                    digest: digest.clone(),
                });
            }
        }
        tracing::info!(
            paths = manifest.len(),
            blobs = blobs.len(),
            ?policy,
            "bucket verified"
        );
        Ok(Self { manifest, blobs })
    }

    /// Get manifest
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Get blob set
    #[must_use]
    pub fn blob_set(&self) -> &BlobSet {
        &self.blobs
    }

    /// Blob stored at a path
    #[must_use]
    pub fn blob(&self, path: &str) -> Option<&Blob> {
        self.manifest
            .digest_for(path)
            .and_then(|digest| self.blobs.get(digest))
    }

    /// Metadata for a path
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if absent, `Io` if the size cannot be read
    pub fn stat(&self, path: &str) -> Result<ObjectInfo, ReadError> {
        let blob = self.blob(path).ok_or_else(|| ReadError::NotFound(path.to_string()))?;
        let size = blob.size().map_err(|source| ReadError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(ObjectInfo {
            path: path.to_string(),
            digest: blob.digest().clone(),
            size,
        })
    }
}

impl ReadBucket for Bucket {
    fn open(&self, path: &str) -> Result<ContentReader<'_>, ReadError> {
        let blob = self.blob(path).ok_or_else(|| ReadError::NotFound(path.to_string()))?;
        blob.open().map_err(|source| ReadError::Io {
            path: path.to_string(),
            source,
        })
    }

    fn paths(&self) -> Vec<&str> {
        self.manifest
            .entries()
            .iter()
            .filter(|entry| self.blobs.contains(&entry.digest))
            .map(|entry| entry.path.as_str())
            .collect()
    }
}
