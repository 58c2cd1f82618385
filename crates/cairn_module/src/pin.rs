//! Pinned dependency references.

use crate::error::PinError;
use cairn_core::Digest;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Length of a commit identifier in hex characters
pub const COMMIT_LEN: usize = 32;

/// A dependency pinned to an exact commit and content digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ModulePin {
    remote: String,
    owner: String,
    repository: String,
    branch: String,
    commit: String,
    digest: Digest,
    create_time: DateTime<Utc>,
}

impl ModulePin {
    /// Create a pin, validating every field
    ///
    /// `branch` may be empty. `digest` is digest text, `algorithm:hex`.
    ///
    /// # Errors
    ///
    /// Returns error if a required field is empty, the commit is not 32 hex
    /// characters, or the digest does not parse
    pub fn new(
        remote: impl Into<String>,
        owner: impl Into<String>,
        repository: impl Into<String>,
        branch: impl Into<String>,
        commit: impl Into<String>,
        digest: &str,
        create_time: DateTime<Utc>,
    ) -> Result<Self, PinError> {
        let remote = required("remote", remote.into())?;
        let owner = required("owner", owner.into())?;
        let repository = required("repository", repository.into())?;
        let commit = required("commit", commit.into())?;
        if commit.len() != COMMIT_LEN || !commit.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PinError::InvalidCommit(commit));
        }
        if digest.is_empty() {
            return Err(PinError::MissingField("digest"));
        }
        let digest = Digest::parse(digest)?;
        Ok(Self {
            remote,
            owner,
            repository,
            branch: branch.into(),
            commit,
            digest,
            create_time,
        })
    }

    /// Get remote
    #[must_use]
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Get owner
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get repository
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Get branch, empty when unpinned to a branch
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Get commit
    #[must_use]
    pub fn commit(&self) -> &str {
        &self.commit
    }

    /// Get digest
    #[must_use]
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Get creation time, the Unix epoch when unknown
    #[must_use]
    pub fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }
}

impl fmt::Display for ModulePin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}:{}", self.remote, self.owner, self.repository, self.commit)
    }
}

fn required(field: &'static str, value: String) -> Result<String, PinError> {
    if value.is_empty() {
        return Err(PinError::MissingField(field));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::Digester;

    const COMMIT: &str = "62f35d8aed1149c291d606d958a7ce32";

    fn empty_digest() -> String {
        Digester::default().digest_bytes(b"").to_string()
    }

    #[test]
    fn test_pin_new() {
        let pin = ModulePin::new("foo", "bar", "baz", "", COMMIT, &empty_digest(), DateTime::<Utc>::UNIX_EPOCH).unwrap();
        assert_eq!(pin.remote(), "foo");
        assert_eq!(pin.owner(), "bar");
        assert_eq!(pin.repository(), "baz");
        assert_eq!(pin.branch(), "");
        assert_eq!(pin.commit(), COMMIT);
        assert_eq!(pin.digest().to_string(), empty_digest());
        assert_eq!(pin.create_time(), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(pin.to_string(), format!("foo/bar/baz:{COMMIT}"));
    }

    #[test]
    fn test_pin_missing_fields() {
        let digest = empty_digest();
        assert!(matches!(
            ModulePin::new("", "bar", "baz", "", COMMIT, &digest, DateTime::<Utc>::UNIX_EPOCH),
            Err(PinError::MissingField("remote"))
        ));
        assert!(matches!(
            ModulePin::new("foo", "bar", "", "", COMMIT, &digest, DateTime::<Utc>::UNIX_EPOCH),
            Err(PinError::MissingField("repository"))
        ));
        assert!(matches!(
            ModulePin::new("foo", "bar", "baz", "", COMMIT, "", DateTime::<Utc>::UNIX_EPOCH),
            Err(PinError::MissingField("digest"))
        ));
    }

    #[test]
    fn test_pin_invalid_commit() {
        let digest = empty_digest();
        for commit in ["abc", "zz f35d8aed1149c291d606d958a7ce32", "62f35d8aed1149c291d606d958a7ce3200"] {
            assert!(matches!(
                ModulePin::new("foo", "bar", "baz", "", commit, &digest, DateTime::<Utc>::UNIX_EPOCH),
                Err(PinError::InvalidCommit(_))
            ));
        }
        // Upper case is accepted.
        assert!(ModulePin::new("foo", "bar", "baz", "", COMMIT.to_uppercase(), &digest, DateTime::<Utc>::UNIX_EPOCH).is_ok());
    }

    #[test]
    fn test_pin_invalid_digest() {
        assert!(matches!(
            ModulePin::new("foo", "bar", "baz", "main", COMMIT, "shake256:xyz", DateTime::<Utc>::UNIX_EPOCH),
            Err(PinError::InvalidDigest(_))
        ));
    }
}
