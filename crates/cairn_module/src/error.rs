//! Error types for module resolution.

use cairn_core::DigestError;
use cairn_storage::ReadError;

/// Pin validation error
#[derive(Debug, thiserror::Error)]
pub enum PinError {
    /// A required field is absent or empty
    #[error("missing required field {0:?}")]
    MissingField(&'static str),
    /// Commit is not a 32 character hex identifier
    #[error("invalid commit {0:?}: expected 32 hex characters")]
    InvalidCommit(String),
    /// Digest text could not be parsed
    #[error("invalid digest: {0}")]
    InvalidDigest(#[from] DigestError),
    /// Record does not have the expected shape
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Module loading error
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// Lock file declares a version other than the supported one
    #[error("unsupported lock file version {version:?}")]
    UnsupportedLockVersion {
        /// Declared version, empty when absent
        version: String,
    },
    /// A dependency record in the lock file is invalid
    #[error("invalid dependency record at index {index}: {reason}")]
    InvalidPinRecord {
        /// 0-based position in the lock file's dependency list
        index: usize,
        /// What is wrong with it
        #[source]
        reason: PinError,
    },
    /// Lock file is not a YAML mapping
    #[error("malformed lock file: {0}")]
    MalformedLock(#[source] serde_yaml::Error),
    /// A text file is not valid UTF-8
    #[error("{path} is not valid UTF-8")]
    InvalidText {
        /// Path inside the bucket
        path: String,
    },
    /// The bucket could not be read
    #[error(transparent)]
    Read(#[from] ReadError),
    /// The operation was cancelled
    #[error("module loading cancelled")]
    Cancelled,
}

impl ModuleError {
    /// Whether retrying the operation could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Read(e) => e.is_retryable(),
            Self::Cancelled => true,
            _ => false,
        }
    }
}
