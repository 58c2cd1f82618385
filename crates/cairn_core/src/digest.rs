//! Digests for content addressing.
//!
//! A [`Digest`] is always tagged with the [`DigestType`] that produced it, and
//! its text form carries that tag (`shake256:<hex>`), so digests from
//! different algorithms can never be confused for one another.

use crate::error::DigestError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

/// Read buffer size used when streaming content through a digester
const READ_CHUNK: usize = 64 * 1024;

/// Digest algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestType {
    /// SHAKE256 with a 64 byte output (default)
    #[default]
    Shake256,
    /// SHA-256
    Sha256,
    /// SHA-512
    Sha512,
    /// BLAKE3
    Blake3,
}

impl DigestType {
    /// Every supported algorithm
    pub const ALL: [Self; 4] = [Self::Shake256, Self::Sha256, Self::Sha512, Self::Blake3];

    /// Parse algorithm from its identifier
    ///
    /// # Errors
    ///
    /// Returns error if the identifier is unknown
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        match s {
            "shake256" => Ok(Self::Shake256),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            _ => Err(DigestError::UnsupportedAlgorithm {
                algorithm: s.to_string(),
            }),
        }
    }

    /// Get string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Shake256 => "shake256",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }

    /// Output length in bytes
    #[must_use]
    pub const fn output_len(&self) -> usize {
        match self {
            Self::Shake256 | Self::Sha512 => 64,
            Self::Sha256 | Self::Blake3 => 32,
        }
    }
}

impl fmt::Display for DigestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestType {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A digest: algorithm plus its fixed-length output
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest {
    digest_type: DigestType,
    bytes: Box<[u8]>,
}

impl Digest {
    /// Create from raw bytes
    ///
    /// # Errors
    ///
    /// Returns error if the length does not match the algorithm
    pub fn new(digest_type: DigestType, bytes: impl Into<Box<[u8]>>) -> Result<Self, DigestError> {
        let bytes = bytes.into();
        if bytes.len() != digest_type.output_len() {
            return Err(DigestError::InvalidLength {
                algorithm: digest_type.as_str(),
                expected: digest_type.output_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self { digest_type, bytes })
    }

    /// Parse from `algorithm:hex`
    ///
    /// # Errors
    ///
    /// Returns error if the algorithm is unknown, the text is malformed, or
    /// the decoded length is wrong
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        let Some((algorithm, hex_text)) = s.split_once(':') else {
            return Err(DigestError::InvalidSyntax {
                text: s.to_string(),
                reason: "missing ':' separator".to_string(),
            });
        };
        let digest_type = DigestType::parse(algorithm)?;
        let bytes = hex::decode(hex_text).map_err(|e| DigestError::InvalidSyntax {
            text: s.to_string(),
            reason: e.to_string(),
        })?;
        Self::new(digest_type, bytes)
    }

    /// Get algorithm
    #[must_use]
    pub const fn digest_type(&self) -> DigestType {
        self.digest_type
    }

    /// Get digest bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Convert bytes to lowercase hex
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.digest_type, self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Computes digests for one algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Digester {
    digest_type: DigestType,
}

impl Digester {
    /// Create a digester for an algorithm
    #[must_use]
    pub const fn new(digest_type: DigestType) -> Self {
        Self { digest_type }
    }

    /// Create a digester from an algorithm identifier
    ///
    /// # Errors
    ///
    /// Returns error if the identifier is unknown
    pub fn parse(algorithm: &str) -> Result<Self, DigestError> {
        DigestType::parse(algorithm).map(Self::new)
    }

    /// Get algorithm
    #[must_use]
    pub const fn digest_type(&self) -> DigestType {
        self.digest_type
    }

    /// Digest an in-memory buffer
    #[must_use]
    pub fn digest_bytes(&self, data: &[u8]) -> Digest {
        let mut hasher = Hasher::new(self.digest_type);
        hasher.update(data);
        hasher.finish()
    }

    /// Digest a stream, consuming it to the end in a single pass
    ///
    /// # Errors
    ///
    /// Returns error if the stream fails before EOF
    pub fn digest_reader<R: Read>(&self, mut reader: R) -> Result<Digest, DigestError> {
        let mut hasher = Hasher::new(self.digest_type);
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DigestError::Io(e)),
            };
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finish())
    }
}

/// Incremental hasher state for each algorithm
enum Hasher {
    Shake256(sha3::Shake256),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn new(digest_type: DigestType) -> Self {
        match digest_type {
            DigestType::Shake256 => Self::Shake256(sha3::Shake256::default()),
            DigestType::Sha256 => Self::Sha256(sha2::Sha256::default()),
            DigestType::Sha512 => Self::Sha512(sha2::Sha512::default()),
            DigestType::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Shake256(h) => sha3::digest::Update::update(h, data),
            Self::Sha256(h) => sha2::Digest::update(h, data),
            Self::Sha512(h) => sha2::Digest::update(h, data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finish(self) -> Digest {
        let (digest_type, bytes): (DigestType, Box<[u8]>) = match self {
            Self::Shake256(h) => {
                let mut out = vec![0u8; DigestType::Shake256.output_len()];
                sha3::digest::ExtendableOutput::finalize_xof_into(h, &mut out);
                (DigestType::Shake256, out.into())
            }
            Self::Sha256(h) => (DigestType::Sha256, sha2::Digest::finalize(h).to_vec().into()),
            Self::Sha512(h) => (DigestType::Sha512, sha2::Digest::finalize(h).to_vec().into()),
            Self::Blake3(h) => (DigestType::Blake3, h.finalize().as_bytes().to_vec().into()),
        };
        // Lengths are fixed per algorithm.
        Digest { digest_type, bytes }
    }
}
