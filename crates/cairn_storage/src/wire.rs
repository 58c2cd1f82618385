//! Building a verified bucket from transmitted records.

use crate::blob::{Blob, BlobError, BlobRecord};
use crate::blob_set::{BlobSet, BlobSetError};
use crate::bucket::{Bucket, BucketError, BucketPolicy};
use crate::manifest::{Manifest, ManifestError};
use std::io::BufReader;
use tokio_util::sync::CancellationToken;

/// Wire error
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The manifest blob itself failed validation
    #[error("invalid manifest blob: {0}")]
    InvalidManifest(#[source] BlobError),
    /// The manifest blob is not a valid manifest
    #[error("failed to parse manifest: {0}")]
    ParseManifest(#[source] ManifestError),
    /// A content blob failed validation
    #[error(transparent)]
    InvalidBlobs(BlobSetError),
    /// Manifest and blobs do not correspond
    #[error(transparent)]
    Bucket(BucketError),
    /// The operation was cancelled
    #[error("bucket assembly cancelled")]
    Cancelled,
}

impl WireError {
    /// Whether retrying the operation could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidManifest(e) => e.is_retryable(),
            Self::ParseManifest(e) => e.is_retryable(),
            Self::InvalidBlobs(e) => e.is_retryable(),
            Self::Bucket(e) => e.is_retryable(),
            Self::Cancelled => true,
        }
    }
}

impl From<BlobSetError> for WireError {
    fn from(err: BlobSetError) -> Self {
        match err {
            BlobSetError::Cancelled => Self::Cancelled,
            other => Self::InvalidBlobs(other),
        }
    }
}

/// Build a complete bucket from a manifest record and its blob records
///
/// The manifest blob is verified against its own digest before it is
/// parsed. Blob errors name the offending position in `blob_records`.
///
/// # Errors
///
/// Returns the first failure of each stage, or `Cancelled`
pub async fn bucket_from_manifest_blobs(
    cancel: &CancellationToken,
    manifest_record: BlobRecord,
    blob_records: Vec<BlobRecord>,
    concurrency: usize,
) -> Result<Bucket, WireError> {
    if cancel.is_cancelled() {
        return Err(WireError::Cancelled);
    }
    let manifest_blob = Blob::from_record(manifest_record).map_err(WireError::InvalidManifest)?;
    let reader = manifest_blob
        .open()
        .map_err(|e| WireError::InvalidManifest(BlobError::Io(e)))?;
    let manifest = Manifest::from_reader(BufReader::new(reader)).map_err(WireError::ParseManifest)?;
    tracing::debug!(
        manifest = %manifest_blob.digest(),
        entries = manifest.len(),
        blobs = blob_records.len(),
        "manifest verified"
    );

    let blobs = BlobSet::from_records(cancel, blob_records, concurrency).await?;
    Bucket::new(manifest, blobs, BucketPolicy::complete()).map_err(WireError::Bucket)
}
