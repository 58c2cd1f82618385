//! Manifests: ordered path to digest bindings.
//!
//! The text form is one entry per line, `<digest>  <path>` with a two-space
//! separator. Parsing keeps entries in file order; serialization always
//! emits the canonical path-sorted form.

use crate::blob::Blob;
use cairn_core::{BucketPath, Digest, DigestError, DigestType, PathError};
use std::collections::{BTreeSet, HashMap};
use std::io::{self, BufRead};

/// Separator between the digest and the path on a manifest line
const SEPARATOR: &str = "  ";

/// Manifest error
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Line lacks the two-space separator or one of its fields
    #[error("line {line}: malformed manifest line {text:?}")]
    MalformedLine {
        /// 1-based line number
        line: usize,
        /// Line content
        text: String,
    },
    /// Digest field could not be parsed
    #[error("line {line}: invalid digest: {source}")]
    InvalidDigest {
        /// 1-based line number
        line: usize,
        /// Parse failure
        source: DigestError,
    },
    /// Path field is not a normalized relative path
    #[error("line {line}: invalid path: {source}")]
    InvalidPath {
        /// 1-based line number, 0 for entries added programmatically
        line: usize,
        /// Validation failure
        source: PathError,
    },
    /// Path already bound to a different digest
    #[error("line {line}: path {path:?} bound to {existing} and {conflicting}")]
    DuplicatePathConflict {
        /// 1-based line number, 0 for entries added programmatically
        line: usize,
        /// Conflicting path
        path: String,
        /// Digest from the earlier entry
        existing: Digest,
        /// Digest from this entry
        conflicting: Digest,
    },
    /// Manifest text is not valid UTF-8
    #[error("line {line}: manifest text is not valid UTF-8")]
    InvalidUtf8 {
        /// 1-based line number
        line: usize,
    },
    /// Manifest text could not be read
    #[error("failed to read manifest: {0}")]
    Io(#[from] io::Error),
}

impl ManifestError {
    /// Whether retrying the operation could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// A single manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestEntry {
    /// Path inside the bucket
    pub path: BucketPath,
    /// Digest of the content at that path
    pub digest: Digest,
}

/// Ordered path to digest bindings with O(1) lookup in both directions
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    path_to_digest: HashMap<BucketPath, Digest>,
    digest_to_paths: HashMap<Digest, Vec<BucketPath>>,
}

impl Manifest {
    /// Create an empty manifest
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse manifest text
    ///
    /// # Errors
    ///
    /// Returns error naming the first offending line
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ManifestError> {
        let mut manifest = Self::new();
        for (index, line) in reader.lines().enumerate() {
            let number = index + 1;
            let line = match line {
                Ok(line) => line,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    return Err(ManifestError::InvalidUtf8 { line: number });
                }
                Err(e) => return Err(e.into()),
            };
            if line.trim().is_empty() {
                continue;
            }
            let Some((digest_text, path_text)) = line.split_once(SEPARATOR) else {
                return Err(ManifestError::MalformedLine { line: number, text: line.clone() });
            };
            if digest_text.is_empty() || path_text.is_empty() {
                return Err(ManifestError::MalformedLine { line: number, text: line.clone() });
            }
            let digest = Digest::parse(digest_text)
                .map_err(|source| ManifestError::InvalidDigest { line: number, source })?;
            let path = BucketPath::new(path_text)
                .map_err(|source| ManifestError::InvalidPath { line: number, source })?;
            manifest.insert(number, path, digest)?;
        }
        Ok(manifest)
    }

    /// Parse manifest text from a string
    ///
    /// # Errors
    ///
    /// Returns error naming the first offending line
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        Self::from_reader(text.as_bytes())
    }

    /// Bind a path to a digest
    ///
    /// Re-adding an identical binding is a no-op.
    ///
    /// # Errors
    ///
    /// Returns error if the path is invalid or already bound elsewhere
    pub fn add_entry(&mut self, path: &str, digest: Digest) -> Result<(), ManifestError> {
        let path = BucketPath::new(path).map_err(|source| ManifestError::InvalidPath { line: 0, source })?;
        self.insert(0, path, digest)
    }

    fn insert(&mut self, line: usize, path: BucketPath, digest: Digest) -> Result<(), ManifestError> {
        if let Some(existing) = self.path_to_digest.get(&path) {
            if *existing == digest {
                return Ok(());
            }
            return Err(ManifestError::DuplicatePathConflict {
                line,
                path: path.to_string(),
                existing: existing.clone(),
                conflicting: digest,
            });
        }
        self.path_to_digest.insert(path.clone(), digest.clone());
        self.digest_to_paths
            .entry(digest.clone())
            .or_default()
            .push(path.clone());
        self.entries.push(ManifestEntry { path, digest });
        Ok(())
    }

    /// Digest bound to a path
    #[must_use]
    pub fn digest_for(&self, path: &str) -> Option<&Digest> {
        self.path_to_digest.get(path)
    }

    /// Paths bound to a digest, in encounter order
    #[must_use]
    pub fn paths_for(&self, digest: &Digest) -> &[BucketPath] {
        self.digest_to_paths
            .get(digest)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether any entry references a digest
    #[must_use]
    pub fn references(&self, digest: &Digest) -> bool {
        self.digest_to_paths.contains_key(digest)
    }

    /// Entries in encounter order
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Distinct digests referenced by the manifest
    #[must_use]
    pub fn digests(&self) -> BTreeSet<&Digest> {
        self.digest_to_paths.keys().collect()
    }

    /// Path to digest index
    #[must_use]
    pub fn index(&self) -> &HashMap<BucketPath, Digest> {
        &self.path_to_digest
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if manifest is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical text: entries sorted by path, one per line
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut sorted: Vec<&ManifestEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        let mut out = String::new();
        for entry in sorted {
            out.push_str(&entry.digest.to_string());
            out.push_str(SEPARATOR);
            out.push_str(entry.path.as_str());
            out.push('\n');
        }
        out
    }

    /// The canonical text as a blob, for transmitting the manifest itself
    #[must_use]
    pub fn to_blob(&self, digest_type: DigestType) -> Blob {
        Blob::from_bytes(digest_type, self.to_text())
    }
}

/// Manifests are equal when their indexes are equal; encounter order is not compared.
impl PartialEq for Manifest {
    fn eq(&self, other: &Self) -> bool {
        self.path_to_digest == other.path_to_digest
    }
}

impl Eq for Manifest {}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::Digester;
    use proptest::prelude::*;

    fn digest_of(data: &[u8]) -> Digest {
        Digester::default().digest_bytes(data)
    }

    #[test]
    fn test_parse_preserves_order() {
        let text = format!(
            "{}  b.txt\n{}  a.txt\n",
            digest_of(b"b"),
            digest_of(b"a")
        );
        let manifest = Manifest::parse(&text).unwrap();
        let paths: Vec<&str> = manifest.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["b.txt", "a.txt"]);
        assert_eq!(manifest.digest_for("a.txt"), Some(&digest_of(b"a")));
        assert_eq!(manifest.digest_for("c.txt"), None);
    }

    #[test]
    fn test_serialize_is_path_sorted() {
        let mut manifest = Manifest::new();
        manifest.add_entry("z/last", digest_of(b"z")).unwrap();
        manifest.add_entry("a/first", digest_of(b"a")).unwrap();
        let text = manifest.to_text();
        let expected = format!("{}  a/first\n{}  z/last\n", digest_of(b"a"), digest_of(b"z"));
        assert_eq!(text, expected);
    }

    #[test]
    fn test_blank_lines_ignored() {
        let text = format!("\n{}  a\n\n   \n", digest_of(b"a"));
        let manifest = Manifest::parse(&text).unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn test_path_with_spaces() {
        let text = format!("{}  dir/two  spaces.txt\n", digest_of(b"a"));
        let manifest = Manifest::parse(&text).unwrap();
        assert!(manifest.digest_for("dir/two  spaces.txt").is_some());
    }

    #[test]
    fn test_malformed_line() {
        let text = format!("{}  a\n{} b\n", digest_of(b"a"), digest_of(b"b"));
        match Manifest::parse(&text).unwrap_err() {
            ManifestError::MalformedLine { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            Manifest::parse("  a.txt\n"),
            Err(ManifestError::MalformedLine { line: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_digest() {
        assert!(matches!(
            Manifest::parse("shake256:1234  a.txt\n"),
            Err(ManifestError::InvalidDigest { line: 1, .. })
        ));
        assert!(matches!(
            Manifest::parse("md5:1234  a.txt\n"),
            Err(ManifestError::InvalidDigest {
                source: DigestError::UnsupportedAlgorithm { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_path() {
        for path in ["/abs", "a/../b", "a//b"] {
            let text = format!("{}  {}\n", digest_of(b"a"), path);
            assert!(
                matches!(Manifest::parse(&text), Err(ManifestError::InvalidPath { line: 1, .. })),
                "{path}"
            );
        }
    }

    #[test]
    fn test_control_character_paths() {
        let text = format!("{}  a\rb\n", digest_of(b"a"));
        assert!(matches!(
            Manifest::parse(&text),
            Err(ManifestError::InvalidPath {
                line: 1,
                source: PathError::ControlCharacter(_)
            })
        ));

        let mut manifest = Manifest::new();
        for path in ["a\r", "x\ny", "tab\there"] {
            assert!(
                matches!(
                    manifest.add_entry(path, digest_of(b"a")),
                    Err(ManifestError::InvalidPath {
                        line: 0,
                        source: PathError::ControlCharacter(_)
                    })
                ),
                "{path:?}"
            );
        }
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_invalid_utf8() {
        let mut bytes = format!("{}  ok\n", digest_of(b"a")).into_bytes();
        bytes.extend_from_slice(b"\xff\xfe  a\n");
        let err = Manifest::from_reader(&bytes[..]).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidUtf8 { line: 2 }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_read_failure_is_retryable() {
        struct Broken;
        impl io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            }
        }
        let err = Manifest::from_reader(io::BufReader::new(Broken)).unwrap_err();
        assert!(matches!(err, ManifestError::Io(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_duplicate_path() {
        let same = format!("{d}  a\n{d}  a\n", d = digest_of(b"a"));
        let manifest = Manifest::parse(&same).unwrap();
        assert_eq!(manifest.len(), 1);

        let conflict = format!("{}  a\n{}  a\n", digest_of(b"a"), digest_of(b"b"));
        match Manifest::parse(&conflict).unwrap_err() {
            ManifestError::DuplicatePathConflict { line, path, .. } => {
                assert_eq!(line, 2);
                assert_eq!(path, "a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_shared_digest_paths() {
        let mut manifest = Manifest::new();
        let d = digest_of(b"shared");
        manifest.add_entry("one", d.clone()).unwrap();
        manifest.add_entry("two", d.clone()).unwrap();
        let paths: Vec<&str> = manifest.paths_for(&d).iter().map(BucketPath::as_str).collect();
        assert_eq!(paths, ["one", "two"]);
        assert_eq!(manifest.digests().len(), 1);
        assert!(manifest.references(&d));
        assert!(manifest.paths_for(&digest_of(b"other")).is_empty());
    }

    #[test]
    fn test_to_blob_digest_matches_text() {
        let mut manifest = Manifest::new();
        manifest.add_entry("a", digest_of(b"a")).unwrap();
        let blob = manifest.to_blob(DigestType::Shake256);
        assert_eq!(blob.digest(), &digest_of(manifest.to_text().as_bytes()));
    }

    fn arb_path() -> impl Strategy<Value = String> {
        prop::collection::vec("[^/\\\\\\p{Cc}]{1,8}", 1..4)
            .prop_map(|segments| segments.join("/"))
            .prop_filter("normalized", |p| BucketPath::new(p.as_str()).is_ok())
    }

    proptest! {
        #[test]
        fn prop_round_trip(entries in prop::collection::vec((arb_path(), any::<Vec<u8>>()), 0..16)) {
            let mut manifest = Manifest::new();
            for (path, content) in &entries {
                if manifest.digest_for(path).is_none() {
                    manifest.add_entry(path, digest_of(content)).unwrap();
                }
            }
            let reparsed = Manifest::parse(&manifest.to_text()).unwrap();
            prop_assert_eq!(reparsed.index(), manifest.index());
            prop_assert_eq!(reparsed.to_text(), manifest.to_text());
        }
    }
}
