//! Core error types for CAIRN.

/// Errors produced while computing or parsing digests
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// Algorithm identifier is not one of the supported digest types
    #[error("unsupported digest algorithm: {algorithm:?}")]
    UnsupportedAlgorithm {
        /// The identifier that was given
        algorithm: String,
    },

    /// Digest text is not of the form `algorithm:hex`
    #[error("invalid digest syntax {text:?}: {reason}")]
    InvalidSyntax {
        /// The offending digest text
        text: String,
        /// Why it was rejected
        reason: String,
    },

    /// Digest bytes have the wrong length for their algorithm
    #[error("invalid {algorithm} digest length: {actual} bytes (expected {expected})")]
    InvalidLength {
        /// Algorithm identifier
        algorithm: &'static str,
        /// Required length in bytes
        expected: usize,
        /// Length that was given
        actual: usize,
    },

    /// The input stream could not be fully read
    #[error("failed to read digest input: {0}")]
    Io(#[from] std::io::Error),
}

impl DigestError {
    /// Whether retrying the operation could succeed.
    ///
    /// Only stream failures qualify; format errors never do.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Errors produced while validating bucket paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Path is empty
    #[error("path is empty")]
    Empty,

    /// Path starts with `/`
    #[error("path {0:?} is absolute")]
    Absolute(String),

    /// Path contains a `\`
    #[error("path {0:?} contains a backslash")]
    Backslash(String),

    /// Path has an empty, `.` or `..` segment, or a trailing slash
    #[error("path {0:?} is not normalized")]
    NotNormalized(String),

    /// Path contains a control character such as a newline
    #[error("path {0:?} contains a control character")]
    ControlCharacter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DigestError::UnsupportedAlgorithm {
            algorithm: "md5".to_string(),
        };
        assert_eq!(format!("{}", err), "unsupported digest algorithm: \"md5\"");

        let err = PathError::Absolute("/etc/passwd".to_string());
        assert_eq!(format!("{}", err), "path \"/etc/passwd\" is absolute");
    }

    #[test]
    fn test_length_error_names_algorithm() {
        let err = DigestError::InvalidLength {
            algorithm: "shake256",
            expected: 64,
            actual: 3,
        };
        let s = format!("{}", err);
        assert!(s.contains("shake256"));
        assert!(s.contains("64"));
        assert!(s.contains('3'));
    }

    #[test]
    fn test_only_io_is_retryable() {
        let io = DigestError::Io(std::io::Error::other("disk gone"));
        assert!(io.is_retryable());

        let syntax = DigestError::InvalidSyntax {
            text: "nope".to_string(),
            reason: "missing ':'".to_string(),
        };
        assert!(!syntax.is_retryable());
    }
}
