//! Digest-keyed blob collections.

use crate::blob::{Blob, BlobError, BlobRecord};
use cairn_core::Digest;
use futures::{StreamExt, TryStreamExt, stream};
use std::collections::BTreeMap;
use std::io;
use tokio_util::sync::CancellationToken;

/// Blob set error
#[derive(Debug, thiserror::Error)]
pub enum BlobSetError {
    /// Input blob at this position failed validation
    #[error("invalid blob at index {index}: {source}")]
    InvalidBlobAt {
        /// Position in the caller's input
        index: usize,
        /// Validation failure
        source: BlobError,
    },
    /// Two inputs share a digest but their content differs
    #[error("digest collision at index {index}: {digest} already present with different content")]
    DigestCollision {
        /// Position of the second blob in the caller's input
        index: usize,
        /// The shared digest
        digest: Digest,
    },
    /// Content could not be read while checking for a collision
    #[error("failed to compare blob at index {index}: {source}")]
    Io {
        /// Position in the caller's input
        index: usize,
        /// Read failure
        source: io::Error,
    },
    /// The operation was cancelled
    #[error("blob validation cancelled")]
    Cancelled,
}

impl BlobSetError {
    /// Whether retrying the operation could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidBlobAt { source, .. } => source.is_retryable(),
            Self::Io { .. } | Self::Cancelled => true,
            Self::DigestCollision { .. } => false,
        }
    }
}

/// Deduplicated blobs keyed by digest
#[derive(Debug, Clone, Default)]
pub struct BlobSet {
    blobs: BTreeMap<Digest, Blob>,
}

impl BlobSet {
    /// Build a set from already verified blobs
    ///
    /// A repeated digest is accepted once when its content is identical.
    ///
    /// # Errors
    ///
    /// Returns error if a repeated digest carries different content
    pub fn new(blobs: impl IntoIterator<Item = Blob>) -> Result<Self, BlobSetError> {
        let mut set: BTreeMap<Digest, Blob> = BTreeMap::new();
        for (index, blob) in blobs.into_iter().enumerate() {
            if let Some(existing) = set.get(blob.digest()) {
                let same = existing
                    .content_eq(&blob)
                    .map_err(|source| BlobSetError::Io { index, source })?;
                if !same {
                    return Err(BlobSetError::DigestCollision {
                        index,
                        digest: blob.digest().clone(),
                    });
                }
                tracing::debug!(index, digest = %blob.digest(), "duplicate blob skipped");
                continue;
            }
            set.insert(blob.digest().clone(), blob);
        }
        Ok(Self { blobs: set })
    }

    /// Validate wire records concurrently and build a set from them
    ///
    /// # Errors
    ///
    /// Returns error naming the lowest failing input index, or `Cancelled`
    pub async fn from_records(
        cancel: &CancellationToken,
        records: Vec<BlobRecord>,
        concurrency: usize,
    ) -> Result<Self, BlobSetError> {
        let blobs = validate_blobs(cancel, records, concurrency, Blob::from_record).await?;
        Self::new(blobs)
    }

    /// Look up a blob
    #[must_use]
    pub fn get(&self, digest: &Digest) -> Option<&Blob> {
        self.blobs.get(digest)
    }

    /// Check if a digest is present
    #[must_use]
    pub fn contains(&self, digest: &Digest) -> bool {
        self.blobs.contains_key(digest)
    }

    /// Digests in sorted order
    pub fn digests(&self) -> impl Iterator<Item = &Digest> {
        self.blobs.keys()
    }

    /// Blobs in digest order
    pub fn iter(&self) -> impl Iterator<Item = &Blob> {
        self.blobs.values()
    }

    /// Number of distinct blobs
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Check if set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

/// Build blobs from inputs on the blocking pool, at most `concurrency` at a time
///
/// Results come back in input order, so a failure is always attributed to
/// the lowest failing index. Cancelling the token stops new work and
/// abandons anything in flight.
///
/// # Errors
///
/// Returns `InvalidBlobAt` for the first failing input, or `Cancelled`
pub async fn validate_blobs<T, F>(
    cancel: &CancellationToken,
    inputs: Vec<T>,
    concurrency: usize,
    build: F,
) -> Result<Vec<Blob>, BlobSetError>
where
    T: Send + 'static,
    F: Fn(T) -> Result<Blob, BlobError> + Clone + Send + 'static,
{
    let total = inputs.len();
    let results = stream::iter(inputs.into_iter().enumerate())
        .map(|(index, input)| {
            let cancel = cancel.clone();
            let build = build.clone();
            async move {
                if cancel.is_cancelled() {
                    return Err(BlobSetError::Cancelled);
                }
                match tokio::task::spawn_blocking(move || build(input)).await {
                    Ok(result) => result.map_err(|source| BlobSetError::InvalidBlobAt { index, source }),
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(_) => Err(BlobSetError::Cancelled),
                }
            }
        })
        .buffered(concurrency.max(1))
        .try_collect::<Vec<Blob>>();

    let blobs = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(BlobSetError::Cancelled),
        result = results => result?,
    };
    tracing::debug!(total, concurrency, "validated blobs");
    Ok(blobs)
}
