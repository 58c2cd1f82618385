//! CAIRN Core Types
//!
//! Digests, the closed set of digest algorithms, and normalized bucket paths.
//! This crate performs no I/O beyond reading the streams handed to it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod digest;
pub mod error;
pub mod path;

// Re-exports
pub use digest::{Digest, DigestType, Digester};
pub use error::{DigestError, PathError};
pub use path::BucketPath;
