//! Lock file parsing.
//!
//! ```yaml
//! version: v1
//! deps:
//!   - remote: buf.build
//!     owner: acme
//!     repository: weather
//!     branch: main
//!     commit: 62f35d8aed1149c291d606d958a7ce32
//!     digest: shake256:...
//!     create_time: 2022-01-01T00:00:00Z
//! ```

use crate::error::{ModuleError, PinError};
use crate::pin::ModulePin;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use std::fmt;

/// The only lock file version understood
pub const LOCK_VERSION_V1: &str = "v1";

const RECORD_FIELDS: &[&str] = &[
    "remote",
    "owner",
    "repository",
    "branch",
    "commit",
    "digest",
    "create_time",
    "creationTimestamp",
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LockHeader {
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LockLayout {
    deps: Option<Vec<RecordLayout>>,
}

/// Scalar fields read back as their source text, so `1234` stays `"1234"`
#[derive(Debug, Deserialize)]
struct LockRecord {
    remote: Option<String>,
    owner: Option<String>,
    repository: Option<String>,
    branch: Option<String>,
    commit: Option<String>,
    digest: Option<String>,
    #[serde(alias = "creationTimestamp")]
    create_time: Option<String>,
}

impl LockRecord {
    fn into_pin(self) -> Result<ModulePin, PinError> {
        let create_time = match self.create_time.as_deref().filter(|text| !text.is_empty()) {
            Some(text) => text
                .parse::<DateTime<Utc>>()
                .map_err(|e| PinError::Malformed(format!("create_time {text:?}: {e}")))?,
            None => DateTime::<Utc>::UNIX_EPOCH,
        };
        ModulePin::new(
            self.remote.unwrap_or_default(),
            self.owner.unwrap_or_default(),
            self.repository.unwrap_or_default(),
            self.branch.unwrap_or_default(),
            self.commit.unwrap_or_default(),
            self.digest.as_deref().unwrap_or_default(),
            create_time,
        )
    }
}

/// Parse lock file text into pins, in file order
///
/// Blank text, or a document with no content, yields no pins. The version
/// is checked before the dependency list is looked at.
///
/// # Errors
///
/// Returns `MalformedLock` if the text is not a lock document,
/// `UnsupportedLockVersion` for any version but `v1`, and
/// `InvalidPinRecord` naming the first bad record
pub fn parse_lock(text: &str) -> Result<Vec<ModulePin>, ModuleError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let Some(header) = serde_yaml::from_str::<Option<LockHeader>>(text).map_err(ModuleError::MalformedLock)? else {
        return Ok(Vec::new());
    };
    let version = header.version.unwrap_or_default();
    if version != LOCK_VERSION_V1 {
        return Err(ModuleError::UnsupportedLockVersion { version });
    }

    let layout = serde_yaml::from_str::<Option<LockLayout>>(text)
        .map_err(ModuleError::MalformedLock)?
        .unwrap_or_default();
    let layouts = layout.deps.unwrap_or_default();
    let readable = layouts.iter().take_while(|l| matches!(l, RecordLayout::Fields)).count();

    let records = if readable == 0 {
        Vec::new()
    } else {
        LeadingRecords { limit: readable }
            .deserialize(serde_yaml::Deserializer::from_str(text))
            .map_err(ModuleError::MalformedLock)?
    };
    let mut pins = Vec::with_capacity(layouts.len());
    for (index, record) in records.into_iter().enumerate() {
        pins.push(record.into_pin().map_err(|reason| ModuleError::InvalidPinRecord { index, reason })?);
    }
    if let Some(layout) = layouts.get(readable) {
        return Err(ModuleError::InvalidPinRecord {
            index: readable,
            reason: PinError::Malformed(layout.to_string()),
        });
    }
    Ok(pins)
}

/// Layout of one dependency record, before its values are read
#[derive(Debug)]
enum RecordLayout {
    /// A mapping whose known fields are all scalars
    Fields,
    /// A known field holds a sequence or mapping
    NonScalarField(String),
    /// The record is not a mapping
    NotMapping,
}

impl fmt::Display for RecordLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fields => f.write_str("record"),
            Self::NonScalarField(field) => write!(f, "field {field:?} is not a scalar"),
            Self::NotMapping => f.write_str("record is not a mapping"),
        }
    }
}

impl<'de> Deserialize<'de> for RecordLayout {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RecordLayoutVisitor)
    }
}

struct RecordLayoutVisitor;

impl<'de> Visitor<'de> for RecordLayoutVisitor {
    type Value = RecordLayout;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a dependency record")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut layout = RecordLayout::Fields;
        while let Some(key) = map.next_key::<String>()? {
            let scalar = map.next_value::<ScalarCheck>()?.0;
            if !scalar && matches!(layout, RecordLayout::Fields) && RECORD_FIELDS.contains(&key.as_str()) {
                layout = RecordLayout::NonScalarField(key);
            }
        }
        Ok(layout)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(RecordLayout::NotMapping)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(RecordLayout::NotMapping)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(RecordLayout::NotMapping)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(RecordLayout::NotMapping)
    }

    fn visit_i128<E: de::Error>(self, _: i128) -> Result<Self::Value, E> {
        Ok(RecordLayout::NotMapping)
    }

    fn visit_u128<E: de::Error>(self, _: u128) -> Result<Self::Value, E> {
        Ok(RecordLayout::NotMapping)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(RecordLayout::NotMapping)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(RecordLayout::NotMapping)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RecordLayout::NotMapping)
    }
}

/// Whether a value is a scalar, of any YAML type
struct ScalarCheck(bool);

impl<'de> Deserialize<'de> for ScalarCheck {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarCheckVisitor)
    }
}

struct ScalarCheckVisitor;

impl<'de> Visitor<'de> for ScalarCheckVisitor {
    type Value = ScalarCheck;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any value")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(ScalarCheck(false))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(ScalarCheck(false))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(ScalarCheck(true))
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(ScalarCheck(true))
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(ScalarCheck(true))
    }

    fn visit_i128<E: de::Error>(self, _: i128) -> Result<Self::Value, E> {
        Ok(ScalarCheck(true))
    }

    fn visit_u128<E: de::Error>(self, _: u128) -> Result<Self::Value, E> {
        Ok(ScalarCheck(true))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(ScalarCheck(true))
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(ScalarCheck(true))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ScalarCheck(true))
    }
}

/// Reads the first `limit` records of the `deps` list as text fields
struct LeadingRecords {
    limit: usize,
}

impl<'de> DeserializeSeed<'de> for LeadingRecords {
    type Value = Vec<LockRecord>;

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for LeadingRecords {
    type Value = Vec<LockRecord>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a lock file mapping")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut records = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            if key == "deps" {
                records = map.next_value_seed(LeadingDeps { limit: self.limit })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(records)
    }
}

struct LeadingDeps {
    limit: usize,
}

impl<'de> DeserializeSeed<'de> for LeadingDeps {
    type Value = Vec<LockRecord>;

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for LeadingDeps {
    type Value = Vec<LockRecord>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of dependency records")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut records = Vec::with_capacity(self.limit);
        while records.len() < self.limit {
            match seq.next_element::<LockRecord>()? {
                Some(record) => records.push(record),
                None => break,
            }
        }
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(records)
    }
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
    fn test_parse_single_pin() {
        let text = format!(
            "\nversion: v1\ndeps:\n  - remote: foo\n    owner: bar\n    repository: baz\n    commit: {COMMIT}\n    digest: {}\n",
            empty_digest()
        );
        let pins = parse_lock(&text).unwrap();
        let want = ModulePin::new("foo", "bar", "baz", "", COMMIT, &empty_digest(), DateTime::<Utc>::UNIX_EPOCH).unwrap();
        assert_eq!(pins, vec![want]);
    }

    #[test]
    fn test_parse_blank_and_empty() {
        assert!(parse_lock("").unwrap().is_empty());
        assert!(parse_lock("  \n\n").unwrap().is_empty());
        assert!(parse_lock("# no deps yet\n").unwrap().is_empty());
        assert!(parse_lock("version: v1\n").unwrap().is_empty());
        assert!(parse_lock("version: v1\ndeps: []\n").unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_version() {
        match parse_lock("version: v0").unwrap_err() {
            ModuleError::UnsupportedLockVersion { version } => assert_eq!(version, "v0"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            parse_lock("deps: []").unwrap_err(),
            ModuleError::UnsupportedLockVersion { version } if version.is_empty()
        ));
    }

    #[test]
    fn test_version_checked_before_records() {
        let text = "version: v2\ndeps:\n  - remote: foo\n";
        assert!(matches!(
            parse_lock(text).unwrap_err(),
            ModuleError::UnsupportedLockVersion { .. }
        ));
    }

    #[test]
    fn test_pins_keep_file_order() {
        let digest = empty_digest();
        let text = format!(
            "version: v1\ndeps:\n\
             - {{remote: r, owner: o, repository: zeta, commit: {COMMIT}, digest: '{digest}'}}\n\
             - {{remote: r, owner: o, repository: alpha, commit: {COMMIT}, digest: '{digest}'}}\n"
        );
        let pins = parse_lock(&text).unwrap();
        let repos: Vec<&str> = pins.iter().map(ModulePin::repository).collect();
        assert_eq!(repos, ["zeta", "alpha"]);
    }

    #[test]
    fn test_timestamps() {
        let digest = empty_digest();
        let text = format!(
            "version: v1\ndeps:\n\
             - {{remote: r, owner: o, repository: a, branch: main, commit: {COMMIT}, digest: '{digest}', create_time: '2022-03-04T05:06:07Z'}}\n\
             - {{remote: r, owner: o, repository: b, commit: {COMMIT}, digest: '{digest}', creationTimestamp: '2021-01-01T00:00:00Z'}}\n"
        );
        let pins = parse_lock(&text).unwrap();
        assert_eq!(pins[0].branch(), "main");
        assert_eq!(pins[0].create_time().to_rfc3339(), "2022-03-04T05:06:07+00:00");
        assert_eq!(pins[1].create_time().to_rfc3339(), "2021-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_invalid_records_name_index() {
        let digest = empty_digest();
        let text = format!(
            "version: v1\ndeps:\n\
             - {{remote: r, owner: o, repository: a, commit: {COMMIT}, digest: '{digest}'}}\n\
             - {{remote: r, owner: o, repository: b, commit: not-hex, digest: '{digest}'}}\n"
        );
        match parse_lock(&text).unwrap_err() {
            ModuleError::InvalidPinRecord { index, reason } => {
                assert_eq!(index, 1);
                assert!(matches!(reason, PinError::InvalidCommit(_)));
            }
            other => panic!("unexpected error: {other}"),
        }

        let text = format!("version: v1\ndeps:\n  - {{owner: o, repository: a, commit: {COMMIT}, digest: '{digest}'}}\n");
        assert!(matches!(
            parse_lock(&text).unwrap_err(),
            ModuleError::InvalidPinRecord {
                index: 0,
                reason: PinError::MissingField("remote")
            }
        ));

        let text = "version: v1\ndeps:\n  - remote: [1, 2]\n";
        assert!(matches!(
            parse_lock(text).unwrap_err(),
            ModuleError::InvalidPinRecord {
                index: 0,
                reason: PinError::Malformed(_)
            }
        ));
    }

    #[test]
    fn test_malformed_lock() {
        assert!(matches!(parse_lock("just text").unwrap_err(), ModuleError::MalformedLock(_)));
        assert!(matches!(parse_lock("version: [v1]").unwrap_err(), ModuleError::MalformedLock(_)));
        assert!(matches!(parse_lock("deps: 7\nversion: v1").unwrap_err(), ModuleError::MalformedLock(_)));
    }

    #[test]
    fn test_version_checked_before_deps_shape() {
        for text in ["version: v0\ndeps: 7\n", "deps: {a: b}\nversion: v2\n", "deps: 7\n"] {
            assert!(
                matches!(parse_lock(text).unwrap_err(), ModuleError::UnsupportedLockVersion { .. }),
                "{text:?}"
            );
        }
    }

    #[test]
    fn test_numeric_scalars_read_as_text() {
        let digest = empty_digest();
        let digits = "12345678901234567890123456789012";
        let text = format!(
            "version: v1\ndeps:\n\
             - {{remote: r, owner: 42, repository: 'true', branch: 1.5, commit: {digits}, digest: '{digest}'}}\n"
        );
        let pins = parse_lock(&text).unwrap();
        assert_eq!(pins[0].commit(), digits);
        assert_eq!(pins[0].owner(), "42");
        assert_eq!(pins[0].repository(), "true");
        assert_eq!(pins[0].branch(), "1.5");

        let text = format!("version: v1\ndeps:\n  - {{remote: r, owner: o, repository: a, commit: 1234, digest: '{digest}'}}\n");
        match parse_lock(&text).unwrap_err() {
            ModuleError::InvalidPinRecord {
                index: 0,
                reason: PinError::InvalidCommit(commit),
            } => assert_eq!(commit, "1234"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_first_bad_record_wins() {
        let digest = empty_digest();
        let text = format!(
            "version: v1\ndeps:\n\
             - {{remote: r, owner: o, repository: a, commit: {COMMIT}, digest: '{digest}'}}\n\
             - {{remote: r, owner: o, repository: b, commit: bad, digest: '{digest}'}}\n\
             - {{remote: [r], owner: o, repository: c, commit: {COMMIT}, digest: '{digest}'}}\n"
        );
        assert!(matches!(
            parse_lock(&text).unwrap_err(),
            ModuleError::InvalidPinRecord {
                index: 1,
                reason: PinError::InvalidCommit(_)
            }
        ));

        let text = format!(
            "version: v1\ndeps:\n\
             - {{remote: r, owner: o, repository: a, commit: {COMMIT}, digest: '{digest}'}}\n\
             - just-a-string\n"
        );
        match parse_lock(&text).unwrap_err() {
            ModuleError::InvalidPinRecord {
                index: 1,
                reason: PinError::Malformed(message),
            } => assert!(message.contains("not a mapping")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_timestamp() {
        let text = format!(
            "version: v1\ndeps:\n  - {{remote: r, owner: o, repository: a, commit: {COMMIT}, digest: '{}', create_time: yesterday}}\n",
            empty_digest()
        );
        assert!(matches!(
            parse_lock(&text).unwrap_err(),
            ModuleError::InvalidPinRecord {
                index: 0,
                reason: PinError::Malformed(_)
            }
        ));
    }
}
