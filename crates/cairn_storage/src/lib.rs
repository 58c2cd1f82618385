//! CAIRN Storage
//!
//! Verified blobs, manifests, blob sets and read-only buckets.
//! Every blob is checked against its declared digest before it is stored,
//! and every bucket is checked against its manifest before it is read.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blob;
pub mod blob_set;
pub mod bucket;
pub mod manifest;
pub mod read;
pub mod source;
pub mod wire;

pub use blob::{Blob, BlobError, BlobRecord};
pub use blob_set::{BlobSet, BlobSetError, validate_blobs};
pub use bucket::{Bucket, BucketError, BucketPolicy, ObjectInfo};
pub use manifest::{Manifest, ManifestEntry, ManifestError};
pub use read::{MemoryBucket, ReadBucket, ReadError};
pub use source::{ContentReader, ContentSource, FileSource};
pub use wire::{WireError, bucket_from_manifest_blobs};
