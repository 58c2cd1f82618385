//! Normalized bucket paths.

use crate::error::PathError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A normalized, relative, slash separated path inside a bucket
///
/// Normalized means: not empty, no leading `/`, no `\`, no control
/// characters, and no empty, `.` or `..` segments (which also rules out
/// trailing slashes and `//`). Control characters are refused so every path
/// fits on one manifest line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BucketPath(String);

impl BucketPath {
    /// Validate and wrap a path
    ///
    /// # Errors
    ///
    /// Returns error if the path is not normalized
    pub fn new(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        validate(&path)?;
        Ok(Self(path))
    }

    /// Get as str
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path segment
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

fn validate(path: &str) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if path.starts_with('/') {
        return Err(PathError::Absolute(path.to_string()));
    }
    if path.contains('\\') {
        return Err(PathError::Backslash(path.to_string()));
    }
    if path.chars().any(char::is_control) {
        return Err(PathError::ControlCharacter(path.to_string()));
    }
    if path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(PathError::NotNormalized(path.to_string()));
    }
    Ok(())
}

impl fmt::Display for BucketPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BucketPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for BucketPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BucketPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for BucketPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BucketPath> for String {
    fn from(path: BucketPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        for p in ["a", "a/b.proto", "buf.lock", "dir/sub/file with spaces.txt", "..hidden"] {
            assert!(BucketPath::new(p).is_ok(), "{p}");
        }
    }

    #[test]
    fn test_invalid_paths() {
        assert_eq!(BucketPath::new(""), Err(PathError::Empty));
        assert!(matches!(BucketPath::new("/abs"), Err(PathError::Absolute(_))));
        assert!(matches!(BucketPath::new("a\\b"), Err(PathError::Backslash(_))));
        for p in ["a/../b", "..", ".", "./a", "a//b", "a/", "a/."] {
            assert!(
                matches!(BucketPath::new(p), Err(PathError::NotNormalized(_))),
                "{p}"
            );
        }
    }

    #[test]
    fn test_control_characters() {
        for p in ["a\nb", "a\r", "a\tb", "dir/\u{0}x", "\u{7f}", "a/b\u{85}"] {
            assert!(
                matches!(BucketPath::new(p), Err(PathError::ControlCharacter(_))),
                "{p:?}"
            );
        }
        assert!(BucketPath::new("caf\u{e9}/\u{1f980}.proto").is_ok());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(BucketPath::new("a/b/c.txt").unwrap().file_name(), "c.txt");
        assert_eq!(BucketPath::new("LICENSE").unwrap().file_name(), "LICENSE");
    }
}
