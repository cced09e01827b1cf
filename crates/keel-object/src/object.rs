//! Git objects and their loose-object framing.

use crate::{Commit, ObjectError, Result, Sha1Digest, Tag, Tree};
use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Git object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// File content.
    Blob,
    /// Directory listing.
    Tree,
    /// Commit object.
    Commit,
    /// Annotated tag.
    Tag,
}

impl ObjectType {
    /// Returns the type name used in object headers and tag `type` fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    /// Parses a type name.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Format`] for an unknown name.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            _ => Err(ObjectError::Format(format!("unknown object type: {s}"))),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes the digest of an object body: SHA-1 over the loose framing
/// `<type> <len>\0<body>`.
#[must_use]
pub(crate) fn hash_body(object_type: ObjectType, body: &[u8]) -> Sha1Digest {
    let mut hasher = Sha1::new();
    hasher.update(format!("{} {}\0", object_type, body.len()).as_bytes());
    hasher.update(body);
    Sha1Digest::from_hasher(hasher)
}

/// A blob object: an opaque byte payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob {
    /// The payload.
    pub data: Bytes,
}

impl Blob {
    /// Creates a blob from its payload.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Serializes the blob body (the payload itself).
    #[must_use]
    pub fn serialize(&self) -> Bytes {
        self.data.clone()
    }

    /// Computes the blob's digest over its loose framing.
    #[must_use]
    pub fn digest(&self) -> Sha1Digest {
        hash_body(ObjectType::Blob, &self.data)
    }
}

/// A git object: blob, tree, commit, or tag.
///
/// The variant set is closed; every operation that serializes or validates
/// matches it exhaustively.
#[derive(Debug, Clone)]
pub enum GitObject {
    /// File content.
    Blob(Blob),
    /// Directory listing.
    Tree(Tree),
    /// Commit object.
    Commit(Commit),
    /// Annotated tag.
    Tag(Tag),
}

impl GitObject {
    /// Returns the object's type.
    #[must_use]
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Blob(_) => ObjectType::Blob,
            Self::Tree(_) => ObjectType::Tree,
            Self::Commit(_) => ObjectType::Commit,
            Self::Tag(_) => ObjectType::Tag,
        }
    }

    /// Parses a body whose type arrived separately, as on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Format`] on a structurally invalid body.
    pub fn parse_body(object_type: ObjectType, body: impl Into<Bytes>) -> Result<Self> {
        match object_type {
            ObjectType::Blob => Ok(Self::Blob(Blob::new(body))),
            ObjectType::Tree => Tree::parse(body).map(Self::Tree),
            ObjectType::Commit => Commit::parse(body).map(Self::Commit),
            ObjectType::Tag => Tag::parse(body).map(Self::Tag),
        }
    }

    /// Parses the legacy loose framing `<type> <len>\0<body>`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Format`] when the header is malformed or the
    /// declared length does not match the body length.
    pub fn parse_loose(data: &[u8]) -> Result<Self> {
        let nul = data
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| ObjectError::Format("missing NUL in loose object header".to_string()))?;
        let header = std::str::from_utf8(&data[..nul])
            .map_err(|_| ObjectError::Format("loose object header is not valid text".to_string()))?;
        let (type_name, len_str) = header
            .split_once(' ')
            .ok_or_else(|| ObjectError::Format(format!("malformed loose object header: {header}")))?;
        let object_type = ObjectType::parse(type_name)?;
        let declared: usize = len_str
            .parse()
            .map_err(|_| ObjectError::Format(format!("invalid loose object length: {len_str}")))?;
        let body = &data[nul + 1..];
        if body.len() != declared {
            return Err(ObjectError::Format(format!(
                "declared length {} does not match body length {}",
                declared,
                body.len()
            )));
        }
        Self::parse_body(object_type, Bytes::copy_from_slice(body))
    }

    /// Serializes the object body.
    #[must_use]
    pub fn serialize(&self) -> Bytes {
        match self {
            Self::Blob(blob) => blob.serialize(),
            Self::Tree(tree) => tree.serialize(),
            Self::Commit(commit) => commit.serialize(),
            Self::Tag(tag) => tag.serialize(),
        }
    }

    /// Produces the loose framing, which is also the digest pre-image.
    #[must_use]
    pub fn as_loose_bytes(&self) -> Vec<u8> {
        let body = self.serialize();
        let mut out = format!("{} {}\0", self.object_type(), body.len()).into_bytes();
        out.extend_from_slice(&body);
        out
    }

    /// Computes the object's digest.
    #[must_use]
    pub fn digest(&self) -> Sha1Digest {
        hash_body(self.object_type(), &self.serialize())
    }

    /// Validates format rules beyond structural parsing.
    ///
    /// Callers must not accept an object whose `check` fails.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Format`] describing the first violation.
    pub fn check(&self) -> Result<()> {
        match self {
            Self::Blob(_) => Ok(()),
            Self::Tree(tree) => tree.check(),
            Self::Commit(commit) => commit.check(),
            Self::Tag(tag) => tag.check(),
        }
    }

    /// Reads a zlib-compressed loose object from a reader.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Io`] on decompression failure and
    /// [`ObjectError::Format`] on a malformed decompressed record.
    pub fn from_loose_reader<R: Read>(reader: R) -> Result<Self> {
        let mut decoder = ZlibDecoder::new(reader);
        let mut data = Vec::new();
        decoder.read_to_end(&mut data)?;
        Self::parse_loose(&data)
    }

    /// Reads a zlib-compressed loose object from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Io`] when the file cannot be read and
    /// [`ObjectError::Format`] on a malformed record.
    pub fn from_loose_file(path: &Path) -> Result<Self> {
        Self::from_loose_reader(File::open(path)?)
    }

    /// Writes the zlib-compressed loose form to a writer.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Io`] on write failure.
    pub fn to_loose_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut encoder = ZlibEncoder::new(writer, Compression::default());
        encoder.write_all(&self.as_loose_bytes())?;
        encoder.finish()?;
        Ok(())
    }
}

impl PartialEq for GitObject {
    fn eq(&self, other: &Self) -> bool {
        self.object_type() == other.object_type() && self.serialize() == other.serialize()
    }
}

impl Eq for GitObject {}

impl std::hash::Hash for GitObject {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.digest().hash(state);
    }
}

impl From<Blob> for GitObject {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

impl From<Tree> for GitObject {
    fn from(tree: Tree) -> Self {
        Self::Tree(tree)
    }
}

impl From<Commit> for GitObject {
    fn from(commit: Commit) -> Self {
        Self::Commit(commit)
    }
}

impl From<Tag> for GitObject {
    fn from(tag: Tag) -> Self {
        Self::Tag(tag)
    }
}

/// Maps a digest to the fan-out path of its loose object under `root`.
#[must_use]
pub fn loose_object_path(root: &Path, digest: &Sha1Digest) -> PathBuf {
    let hex = digest.to_hex();
    root.join(&hex[..2]).join(&hex[2..])
}
