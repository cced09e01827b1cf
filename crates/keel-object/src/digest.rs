//! SHA-1 content digests and their textual views.

use crate::{ObjectError, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;

/// A validated 20-byte SHA-1 content digest.
///
/// Ordering is lexicographic over the raw bytes, so digests are usable as
/// sorted-map keys.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sha1Digest([u8; 20]);

impl Sha1Digest {
    /// The length of a digest in raw bytes.
    pub const LEN: usize = 20;

    /// The length of a digest in hex characters.
    pub const HEX_LEN: usize = 40;

    /// The all-zero digest used by the push protocol for ref creation and
    /// deletion commands.
    pub const ZERO: Sha1Digest = Sha1Digest([0u8; 20]);

    /// Creates a digest from any accepted source, validating immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::MalformedDigest`] when the source is not
    /// exactly 20 raw bytes or 40 hex characters.
    pub fn new(source: impl Into<DigestSource>) -> Result<Self> {
        source.into().resolve()
    }

    /// Creates a digest from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates a digest from a 40-character hex string.
    ///
    /// Uppercase input is accepted and normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::MalformedDigest`] on bad length or characters.
    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.len() != Self::HEX_LEN {
            return Err(ObjectError::MalformedDigest(format!(
                "expected {} hex characters, got {}",
                Self::HEX_LEN,
                hex.len()
            )));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex, &mut bytes)
            .map_err(|e| ObjectError::MalformedDigest(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Creates a digest from 40 hex characters given as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::MalformedDigest`] on bad length or characters.
    pub fn from_hex_bytes(hex: &[u8]) -> Result<Self> {
        let s = std::str::from_utf8(hex)
            .map_err(|_| ObjectError::MalformedDigest("digest is not hex text".to_string()))?;
        Self::from_hex(s)
    }

    /// Creates a digest from a finalized SHA-1 streaming hasher.
    #[must_use]
    pub fn from_hasher(hasher: Sha1) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns the 40-character lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the hex form as bytes.
    #[must_use]
    pub fn hex_bytes(&self) -> [u8; 40] {
        let mut out = [0u8; 40];
        // hex::encode_to_slice only fails on length mismatch, which the
        // fixed-size buffers rule out.
        let _ = hex::encode_to_slice(self.0, &mut out);
        out
    }

    /// Returns the abbreviated 7-character hex form.
    #[must_use]
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }

    /// Returns the abbreviated hex form as bytes.
    #[must_use]
    pub fn short_hex_bytes(&self) -> [u8; 7] {
        let mut out = [0u8; 7];
        out.copy_from_slice(&self.hex_bytes()[..7]);
        out
    }

    /// Returns true if this is the all-zero digest.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Sha1Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha1Digest({})", self.to_hex())
    }
}

impl fmt::Display for Sha1Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Sha1Digest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Sha1Digest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Sha1Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl From<[u8; 20]> for Sha1Digest {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl PartialEq<[u8]> for Sha1Digest {
    fn eq(&self, other: &[u8]) -> bool {
        match other.len() {
            Self::LEN => self.0[..] == *other,
            Self::HEX_LEN => self.hex_bytes()[..] == *other,
            _ => false,
        }
    }
}

impl PartialEq<&[u8]> for Sha1Digest {
    fn eq(&self, other: &&[u8]) -> bool {
        self == *other
    }
}

impl PartialEq<str> for Sha1Digest {
    fn eq(&self, other: &str) -> bool {
        self.to_hex() == other
    }
}

impl PartialEq<&str> for Sha1Digest {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq<Sha1Digest> for [u8] {
    fn eq(&self, other: &Sha1Digest) -> bool {
        other == self
    }
}

impl PartialEq<Sha1Digest> for str {
    fn eq(&self, other: &Sha1Digest) -> bool {
        other == self
    }
}

/// The closed set of accepted digest sources.
///
/// Anything outside this set is unrepresentable; there is no runtime
/// probing of source shapes.
#[derive(Debug, Clone)]
pub enum DigestSource {
    /// 20 raw bytes, or 40 hex characters given as bytes.
    Bytes(Vec<u8>),
    /// 40 hex characters.
    Hex(String),
    /// A SHA-1 streaming hasher to finalize.
    Hasher(Sha1),
}

impl DigestSource {
    /// Validates the source and produces the digest.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::MalformedDigest`] when a byte source is not
    /// exactly 20 raw or 40 hex bytes, or a hex source is not 40 valid hex
    /// characters.
    pub fn resolve(self) -> Result<Sha1Digest> {
        match self {
            Self::Hex(s) => Sha1Digest::from_hex(&s),
            Self::Bytes(b) => match b.len() {
                Sha1Digest::LEN => {
                    let mut bytes = [0u8; 20];
                    bytes.copy_from_slice(&b);
                    Ok(Sha1Digest(bytes))
                }
                Sha1Digest::HEX_LEN => Sha1Digest::from_hex_bytes(&b),
                n => Err(ObjectError::MalformedDigest(format!(
                    "expected 20 raw or 40 hex bytes, got {n}"
                ))),
            },
            Self::Hasher(h) => Ok(Sha1Digest::from_hasher(h)),
        }
    }
}

impl From<&str> for DigestSource {
    fn from(s: &str) -> Self {
        Self::Hex(s.to_string())
    }
}

impl From<String> for DigestSource {
    fn from(s: String) -> Self {
        Self::Hex(s)
    }
}

impl From<&[u8]> for DigestSource {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for DigestSource {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<[u8; 20]> for DigestSource {
    fn from(b: [u8; 20]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

impl From<Sha1> for DigestSource {
    fn from(h: Sha1) -> Self {
        Self::Hasher(h)
    }
}

/// A digest whose validation is deferred until a view is first read.
///
/// The unvalidated source is kept alongside a validate-once cache; every
/// view accessor resolves the source on first use and fails with the same
/// error a strict construction would have produced.
#[derive(Debug, Clone)]
pub struct LazyDigest {
    source: DigestSource,
    resolved: OnceCell<Sha1Digest>,
}

impl LazyDigest {
    /// Wraps a source without validating it.
    pub fn new(source: impl Into<DigestSource>) -> Self {
        Self {
            source: source.into(),
            resolved: OnceCell::new(),
        }
    }

    /// Resolves the source, validating it on the first call.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::MalformedDigest`] when the deferred source is
    /// invalid.
    pub fn get(&self) -> Result<&Sha1Digest> {
        self.resolved
            .get_or_try_init(|| self.source.clone().resolve())
    }

    /// Returns the raw bytes, validating on first access.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::MalformedDigest`] when the deferred source is
    /// invalid.
    pub fn bytes(&self) -> Result<&[u8; 20]> {
        Ok(self.get()?.as_bytes())
    }

    /// Returns the hex string, validating on first access.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::MalformedDigest`] when the deferred source is
    /// invalid.
    pub fn to_hex(&self) -> Result<String> {
        Ok(self.get()?.to_hex())
    }

    /// Returns the hex form as bytes, validating on first access.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::MalformedDigest`] when the deferred source is
    /// invalid.
    pub fn hex_bytes(&self) -> Result<[u8; 40]> {
        Ok(self.get()?.hex_bytes())
    }
}

impl From<Sha1Digest> for LazyDigest {
    fn from(digest: Sha1Digest) -> Self {
        let resolved = OnceCell::new();
        let _ = resolved.set(digest);
        Self {
            source: DigestSource::Bytes(digest.as_bytes().to_vec()),
            resolved,
        }
    }
}

/// Validates that `value` is exactly 40 hex characters.
///
/// Used by object `check()` paths, which report digest problems as format
/// errors rather than construction errors.
///
/// # Errors
///
/// Returns [`ObjectError::Format`] on bad length or characters.
pub fn check_hexsha(value: &[u8], what: &str) -> Result<()> {
    if value.len() != Sha1Digest::HEX_LEN || !value.iter().all(u8::is_ascii_hexdigit) {
        return Err(ObjectError::Format(format!(
            "invalid {}: {}",
            what,
            String::from_utf8_lossy(value)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_hex_string() {
        let s = Sha1Digest::new("1".repeat(40)).unwrap();
        assert_eq!(s.as_bytes(), &[0x11u8; 20]);
        assert_eq!(s.to_hex(), "1".repeat(40));
        assert_eq!(s.hex_bytes(), [b'1'; 40]);
        assert_eq!(s.short(), "1".repeat(7));
        assert_eq!(s.short_hex_bytes(), [b'1'; 7]);
    }

    #[test]
    fn from_hex_bytes() {
        let s = Sha1Digest::new(vec![b'1'; 40]).unwrap();
        assert_eq!(s.as_bytes(), &[0x11u8; 20]);
        assert_eq!(s.to_hex(), "1".repeat(40));
    }

    #[test]
    fn from_raw_bytes() {
        let s = Sha1Digest::new([0x11u8; 20]).unwrap();
        assert_eq!(s.as_bytes(), &[0x11u8; 20]);
        assert_eq!(s.to_hex(), "1".repeat(40));
        assert_eq!(s.hex_bytes(), [b'1'; 40]);
    }

    #[test]
    fn from_hasher() {
        let expected = Sha1Digest::from_hex("ff8e8b6ff073aaff7c02c0e973597e9da63c1225").unwrap();
        let mut hasher = Sha1::new();
        hasher.update(b"I'm a lumberjack");
        let actual = Sha1Digest::new(hasher).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn uppercase_normalized() {
        let s = Sha1Digest::from_hex(&"AB".repeat(20)).unwrap();
        assert_eq!(s.to_hex(), "ab".repeat(20));
    }

    #[test]
    fn invalid_sources() {
        assert!(matches!(
            Sha1Digest::new("Derp"),
            Err(ObjectError::MalformedDigest(_))
        ));
        assert!(matches!(
            Sha1Digest::new("1".repeat(39)),
            Err(ObjectError::MalformedDigest(_))
        ));
        assert!(matches!(
            Sha1Digest::new("2".repeat(41)),
            Err(ObjectError::MalformedDigest(_))
        ));
        assert!(matches!(
            Sha1Digest::new("X".repeat(40)),
            Err(ObjectError::MalformedDigest(_))
        ));
        assert!(matches!(
            Sha1Digest::new(b"Derp".as_slice()),
            Err(ObjectError::MalformedDigest(_))
        ));
        assert!(matches!(
            Sha1Digest::new(vec![0xde, 0xad, 0xbe, 0xef]),
            Err(ObjectError::MalformedDigest(_))
        ));
    }

    #[test]
    fn lazy_defers_validation() {
        let invalid = [
            LazyDigest::new("Derp"),
            LazyDigest::new(b"Derp".as_slice()),
            LazyDigest::new("1".repeat(39)),
            LazyDigest::new("2".repeat(41)),
            LazyDigest::new("X".repeat(40)),
        ];
        for lazy in &invalid {
            assert!(lazy.to_hex().is_err());
            assert!(lazy.bytes().is_err());
            assert!(lazy.hex_bytes().is_err());
        }
    }

    #[test]
    fn lazy_resolves_once() {
        let lazy = LazyDigest::new("2".repeat(40));
        assert_eq!(lazy.bytes().unwrap(), &[0x22u8; 20]);
        assert_eq!(lazy.to_hex().unwrap(), "2".repeat(40));
        assert_eq!(lazy.hex_bytes().unwrap(), [b'2'; 40]);
    }

    #[test]
    fn equal_across_representations() {
        let a = Sha1Digest::new("1a2b3c4d".repeat(5)).unwrap();
        let b = Sha1Digest::new(vec![0x1a, 0x2b, 0x3c, 0x4d].repeat(5)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hex_bytes(), b.hex_bytes());
        assert_eq!(a.to_hex(), b.to_hex());
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(a, "1a2b3c4d".repeat(5).as_str());
        assert_eq!(a, vec![0x1a, 0x2b, 0x3c, 0x4d].repeat(5).as_slice());
        assert_eq!(a, "1a2b3c4d".repeat(5).into_bytes().as_slice());
    }

    #[test]
    fn not_equal() {
        let a = Sha1Digest::new("1a2b3c4d".repeat(5)).unwrap();
        let b = Sha1Digest::new(vec![0x4d, 0x3c, 0x2b, 0x1a].repeat(5)).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, "4d3c2b1a".repeat(5).as_str());
        assert_ne!(a, vec![0x4d, 0x3c, 0x2b, 0x1a].repeat(5).as_slice());
    }

    #[test]
    fn total_order() {
        let a = Sha1Digest::new("1".repeat(40)).unwrap();
        let b = Sha1Digest::new("2".repeat(40)).unwrap();
        let c = Sha1Digest::new("3".repeat(40)).unwrap();
        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
        assert!(a <= a && b <= b && c <= c);
        assert!(c > b && b > a && c > a);
    }

    #[test]
    fn usable_as_map_key() {
        use std::collections::{BTreeMap, HashSet};

        let a = Sha1Digest::new("a".repeat(40)).unwrap();
        let b = Sha1Digest::new("b".repeat(40)).unwrap();

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        set.insert(a);
        assert_eq!(set.len(), 2);

        let mut map = BTreeMap::new();
        map.insert(b, "B");
        map.insert(a, "A");
        assert_eq!(map.keys().next(), Some(&a));
    }

    #[test]
    fn zero_digest() {
        assert!(Sha1Digest::ZERO.is_zero());
        assert_eq!(Sha1Digest::ZERO.to_hex(), "0".repeat(40));
        assert!(!Sha1Digest::new("1".repeat(40)).unwrap().is_zero());
    }

    #[test]
    fn serde_roundtrip() {
        let digest = Sha1Digest::new("ab".repeat(20)).unwrap();
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(20)));
        let parsed: Sha1Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(digest, parsed);
    }

    #[test]
    fn check_hexsha_rules() {
        check_hexsha("a".repeat(40).as_bytes(), "sha").unwrap();
        assert!(check_hexsha("1".repeat(39).as_bytes(), "sha").is_err());
        assert!(check_hexsha("1".repeat(41).as_bytes(), "sha").is_err());
        assert!(check_hexsha("x".repeat(40).as_bytes(), "sha").is_err());
    }

    proptest::proptest! {
        #[test]
        fn views_stay_consistent(bytes in proptest::array::uniform20(proptest::prelude::any::<u8>())) {
            let digest = Sha1Digest::from_bytes(bytes);
            proptest::prop_assert_eq!(Sha1Digest::from_hex(&digest.to_hex()).unwrap(), digest);
            proptest::prop_assert_eq!(
                Sha1Digest::new(digest.hex_bytes().to_vec()).unwrap(),
                digest
            );
        }
    }
}
