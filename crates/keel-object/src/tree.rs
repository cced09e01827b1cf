//! Tree objects and git's canonical tree-entry ordering.

use crate::object::{hash_body, ObjectType};
use crate::{ObjectError, Result, Sha1Digest};
use bytes::Bytes;
use std::collections::BTreeMap;

/// File mode values stored in tree entries.
pub mod mode {
    /// Regular file.
    pub const REGULAR: u32 = 0o100644;
    /// Executable file.
    pub const EXECUTABLE: u32 = 0o100755;
    /// Symbolic link.
    pub const SYMLINK: u32 = 0o120000;
    /// Submodule (gitlink).
    pub const GITLINK: u32 = 0o160000;
    /// Directory.
    pub const DIRECTORY: u32 = 0o040000;

    const IFMT: u32 = 0o170000;

    /// Returns true when the mode denotes a directory entry.
    #[must_use]
    pub fn is_directory(mode: u32) -> bool {
        mode & IFMT == DIRECTORY
    }
}

/// Modes accepted by [`Tree::check`].
const ALLOWED_MODES: [u32; 5] = [
    mode::REGULAR,
    mode::EXECUTABLE,
    mode::SYMLINK,
    mode::GITLINK,
    mode::DIRECTORY,
];

/// A single tree entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path segment name.
    pub name: Vec<u8>,
    /// File mode.
    pub mode: u32,
    /// Target object digest.
    pub digest: Sha1Digest,
}

impl TreeEntry {
    /// The key git compares entries by: the name, with a `/` appended when
    /// the mode denotes a directory.
    #[must_use]
    pub fn sort_key(&self) -> Vec<u8> {
        let mut key = self.name.clone();
        if mode::is_directory(self.mode) {
            key.push(b'/');
        }
        key
    }
}

/// Parses tree body records of the form `<octal-mode> <name>\0<20-byte-digest>`.
///
/// Parsing is lenient: a leading zero on the mode and newline padding
/// between records are accepted unless `strict` is set. [`Tree::check`]
/// parses strictly.
///
/// # Errors
///
/// Returns [`ObjectError::Format`] on a missing space after the mode, a
/// name that is not NUL-terminated, or a truncated digest.
pub fn parse_tree(data: &[u8], strict: bool) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        if strict && data[pos] == b'0' {
            return Err(ObjectError::Format(
                "illegal leading zero on tree entry mode".to_string(),
            ));
        }
        // Legacy trees pad records with whitespace.
        while pos < data.len() && data[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let mut mode = 0u32;
        while pos < data.len() && (b'0'..=b'7').contains(&data[pos]) {
            mode = mode * 8 + u32::from(data[pos] - b'0');
            pos += 1;
        }
        if pos >= data.len() || data[pos] != b' ' {
            return Err(ObjectError::Format(
                "expected space after tree entry mode".to_string(),
            ));
        }
        pos += 1;
        let nul = data[pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| ObjectError::Format("tree entry name is not NUL-terminated".to_string()))?;
        let name = data[pos..pos + nul].to_vec();
        pos += nul + 1;
        if pos + Sha1Digest::LEN > data.len() {
            return Err(ObjectError::Format("tree entry digest is truncated".to_string()));
        }
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&data[pos..pos + Sha1Digest::LEN]);
        pos += Sha1Digest::LEN;
        entries.push(TreeEntry {
            name,
            mode,
            digest: Sha1Digest::from_bytes(raw),
        });
    }
    Ok(entries)
}

/// Returns the entries of a name → (mode, digest) mapping sorted in git's
/// canonical tree order, or in raw name order when `name_order` is set.
///
/// Name order is a display ordering only; canonical serialization and
/// validation always use the directory-suffix rule.
#[must_use]
pub fn sorted_tree_items(
    entries: &BTreeMap<Vec<u8>, (u32, Sha1Digest)>,
    name_order: bool,
) -> Vec<TreeEntry> {
    let mut items: Vec<TreeEntry> = entries
        .iter()
        .map(|(name, &(mode, digest))| TreeEntry {
            name: name.clone(),
            mode,
            digest,
        })
        .collect();
    if name_order {
        items.sort_by(|a, b| a.name.cmp(&b.name));
    } else {
        items.sort_by_key(TreeEntry::sort_key);
    }
    items
}

/// A tree object: a mapping from path segment to (mode, digest).
#[derive(Debug, Clone, Default)]
pub struct Tree {
    entries: BTreeMap<Vec<u8>, (u32, Sha1Digest)>,
    raw: Option<Bytes>,
}

impl Tree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a tree body.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Format`] on structurally invalid records.
    pub fn parse(body: impl Into<Bytes>) -> Result<Self> {
        let raw = body.into();
        let entries = parse_tree(&raw, false)?
            .into_iter()
            .map(|e| (e.name, (e.mode, e.digest)))
            .collect();
        Ok(Self {
            entries,
            raw: Some(raw),
        })
    }

    /// Adds or replaces an entry, invalidating any cached serialization.
    pub fn add(&mut self, name: impl Into<Vec<u8>>, mode: u32, digest: Sha1Digest) {
        self.entries.insert(name.into(), (mode, digest));
        self.raw = None;
    }

    /// Removes an entry, invalidating any cached serialization.
    pub fn remove(&mut self, name: &[u8]) -> Option<(u32, Sha1Digest)> {
        let removed = self.entries.remove(name);
        if removed.is_some() {
            self.raw = None;
        }
        removed
    }

    /// Looks up an entry by name.
    #[must_use]
    pub fn get(&self, name: &[u8]) -> Option<&(u32, Sha1Digest)> {
        self.entries.get(name)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the tree has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries in canonical tree order.
    #[must_use]
    pub fn items(&self) -> Vec<TreeEntry> {
        sorted_tree_items(&self.entries, false)
    }

    /// Returns the entries in raw name order (display ordering).
    #[must_use]
    pub fn items_name_order(&self) -> Vec<TreeEntry> {
        sorted_tree_items(&self.entries, true)
    }

    /// Serializes the tree body.
    ///
    /// A tree parsed from bytes returns those bytes unchanged; a
    /// constructed or mutated tree renders its entries in canonical order.
    #[must_use]
    pub fn serialize(&self) -> Bytes {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        let mut out = Vec::new();
        for entry in self.items() {
            out.extend_from_slice(format!("{:o} ", entry.mode).as_bytes());
            out.extend_from_slice(&entry.name);
            out.push(0);
            out.extend_from_slice(entry.digest.as_bytes());
        }
        Bytes::from(out)
    }

    /// Computes the tree's digest over its loose framing.
    #[must_use]
    pub fn digest(&self) -> Sha1Digest {
        hash_body(ObjectType::Tree, &self.serialize())
    }

    /// Validates the tree format beyond structural parsing.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Format`] on an empty name, `.` or `..`, a
    /// name containing `/`, a mode outside the whitelist, a leading-zero
    /// mode string, or entries out of canonical order or duplicated.
    pub fn check(&self) -> Result<()> {
        let body = self.serialize();
        let mut last: Option<Vec<u8>> = None;
        for entry in parse_tree(&body, true)? {
            if entry.name.is_empty() || entry.name == b"." || entry.name == b".." {
                return Err(ObjectError::Format(format!(
                    "invalid tree entry name: {:?}",
                    String::from_utf8_lossy(&entry.name)
                )));
            }
            if entry.name.contains(&b'/') {
                return Err(ObjectError::Format(format!(
                    "tree entry name contains a slash: {:?}",
                    String::from_utf8_lossy(&entry.name)
                )));
            }
            if !ALLOWED_MODES.contains(&entry.mode) {
                return Err(ObjectError::Format(format!(
                    "invalid tree entry mode: {:o}",
                    entry.mode
                )));
            }
            let key = entry.sort_key();
            if let Some(prev) = &last {
                if *prev >= key {
                    return Err(ObjectError::Format(
                        "tree entries out of order or duplicated".to_string(),
                    ));
                }
            }
            last = Some(key);
        }
        Ok(())
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.serialize() == other.serialize()
    }
}

impl Eq for Tree {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(hex: &str) -> Sha1Digest {
        Sha1Digest::from_hex(hex).unwrap()
    }

    fn a_sha() -> Sha1Digest {
        d("6f670c0fb53f9463760b7295fbb814e965fb20c8")
    }

    fn b_sha() -> Sha1Digest {
        d("2969be3e8ee1c0222396a5611407e4769f14e54b")
    }

    fn sample_entries() -> BTreeMap<Vec<u8>, (u32, Sha1Digest)> {
        let sha = d("d80c186a03f423a81b39df39dc87fd269736ca86");
        let mut entries = BTreeMap::new();
        entries.insert(b"a.c".to_vec(), (mode::EXECUTABLE, sha));
        entries.insert(b"a".to_vec(), (mode::DIRECTORY, sha));
        entries.insert(b"a/c".to_vec(), (mode::DIRECTORY, sha));
        entries
    }

    fn check_fails(body: Vec<u8>) {
        let result = Tree::parse(body).and_then(|t| t.check());
        assert!(result.is_err());
    }

    fn check_succeeds(body: Vec<u8>) {
        Tree::parse(body).unwrap().check().unwrap();
    }

    #[test]
    fn add_and_serialize() {
        let sha = d("d80c186a03f423a81b39df39dc87fd269736ca86");
        let mut tree = Tree::new();
        tree.add(b"myname".to_vec(), mode::EXECUTABLE, sha);
        assert_eq!(tree.get(b"myname"), Some(&(mode::EXECUTABLE, sha)));
        let mut expected = b"100755 myname\0".to_vec();
        expected.extend_from_slice(sha.as_bytes());
        assert_eq!(tree.serialize().as_ref(), expected.as_slice());
    }

    #[test]
    fn canonical_sort() {
        let items = sorted_tree_items(&sample_entries(), false);
        let names: Vec<&[u8]> = items.iter().map(|e| e.name.as_slice()).collect();
        assert_eq!(names, vec![b"a.c".as_slice(), b"a", b"a/c"]);
        assert_eq!(items[0].mode, mode::EXECUTABLE);
    }

    #[test]
    fn name_order_sort() {
        let items = sorted_tree_items(&sample_entries(), true);
        let names: Vec<&[u8]> = items.iter().map(|e| e.name.as_slice()).collect();
        assert_eq!(names, vec![b"a".as_slice(), b"a.c", b"a/c"]);
    }

    #[test]
    fn tree_items_use_canonical_sort() {
        let mut tree = Tree::new();
        for (name, (m, sha)) in sample_entries() {
            tree.add(name, m, sha);
        }
        let items = tree.items();
        let names: Vec<&[u8]> = items.iter().map(|e| e.name.as_slice()).collect();
        assert_eq!(names, vec![b"a.c".as_slice(), b"a", b"a/c"]);
    }

    #[test]
    fn parse_roundtrip() {
        let mut body = b"100644 a\0".to_vec();
        body.extend_from_slice(a_sha().as_bytes());
        body.extend_from_slice(b"100644 b\0");
        body.extend_from_slice(b_sha().as_bytes());

        let tree = Tree::parse(body.clone()).unwrap();
        assert_eq!(tree.len(), 2);
        let items = tree.items();
        assert_eq!(items[0].name, b"a");
        assert_eq!(items[0].mode, mode::REGULAR);
        assert_eq!(items[0].digest, a_sha());
        assert_eq!(items[1].name, b"b");
        assert_eq!(tree.serialize().as_ref(), body.as_slice());
    }

    #[test]
    fn parse_accepts_leading_zero_mode() {
        let mut body = b"0100644 foo\0".to_vec();
        body.extend_from_slice(a_sha().as_bytes());
        let entries = parse_tree(&body, false).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, b"foo");
        assert_eq!(entries[0].mode, mode::REGULAR);
        assert!(parse_tree(&body, true).is_err());
    }

    #[test]
    fn check_rejects_leading_zero_mode() {
        let mut body = b"0100644 foo\0".to_vec();
        body.extend_from_slice(a_sha().as_bytes());
        check_fails(body);
    }

    #[test]
    fn check_filenames() {
        let sha = a_sha();
        let mut ok = b"100644 .a\0".to_vec();
        ok.extend_from_slice(sha.as_bytes());
        check_succeeds(ok);

        for name in [b"".as_slice(), b".", b"..", b"a/a"] {
            let mut body = b"100644 ".to_vec();
            body.extend_from_slice(name);
            body.push(0);
            body.extend_from_slice(sha.as_bytes());
            check_fails(body);
        }
    }

    #[test]
    fn check_modes() {
        let sha = a_sha();
        for m in ["100644", "100755", "160000", "120000", "40000"] {
            let mut body = format!("{m} a\0").into_bytes();
            body.extend_from_slice(sha.as_bytes());
            check_succeeds(body);
        }
        for m in ["123456", "123abc"] {
            let mut body = format!("{m} a\0").into_bytes();
            body.extend_from_slice(sha.as_bytes());
            check_fails(body);
        }
    }

    #[test]
    fn check_truncated_digests() {
        let mut body = b"100644 a\0".to_vec();
        body.extend_from_slice(&[b'x'; 5]);
        check_fails(body);

        let mut body = b"100644 a\0".to_vec();
        body.extend_from_slice(&[b'x'; 18]);
        body.push(0);
        check_fails(body);

        let mut body = b"100644 a\0".to_vec();
        body.extend_from_slice(&[b'x'; 21]);
        body.extend_from_slice(b"\n100644 b\0");
        body.extend_from_slice(a_sha().as_bytes());
        check_fails(body);
    }

    #[test]
    fn check_ordering() {
        let sha = a_sha();
        let sha2 = b_sha();

        let mut ascending = b"100644 a\0".to_vec();
        ascending.extend_from_slice(sha.as_bytes());
        ascending.extend_from_slice(b"\n100644 b\0");
        ascending.extend_from_slice(sha2.as_bytes());
        check_succeeds(ascending);

        let mut duplicate = b"100644 a\0".to_vec();
        duplicate.extend_from_slice(sha.as_bytes());
        duplicate.extend_from_slice(b"\n100755 a\0");
        duplicate.extend_from_slice(sha2.as_bytes());
        check_fails(duplicate);

        let mut descending = b"100644 b\0".to_vec();
        descending.extend_from_slice(sha2.as_bytes());
        descending.extend_from_slice(b"\n100644 a\0");
        descending.extend_from_slice(sha.as_bytes());
        check_fails(descending);
    }

    #[test]
    fn remove_invalidates_cache() {
        let mut body = b"100644 a\0".to_vec();
        body.extend_from_slice(a_sha().as_bytes());
        body.extend_from_slice(b"100644 b\0");
        body.extend_from_slice(b_sha().as_bytes());

        let mut tree = Tree::parse(body).unwrap();
        tree.remove(b"a");
        let mut expected = b"100644 b\0".to_vec();
        expected.extend_from_slice(b_sha().as_bytes());
        assert_eq!(tree.serialize().as_ref(), expected.as_slice());
    }

    #[test]
    fn equality_is_byte_equality() {
        let mut body = b"100644 a\0".to_vec();
        body.extend_from_slice(a_sha().as_bytes());
        let parsed = Tree::parse(body).unwrap();
        let mut built = Tree::new();
        built.add(b"a".to_vec(), mode::REGULAR, a_sha());
        assert_eq!(parsed, built);
    }
}
