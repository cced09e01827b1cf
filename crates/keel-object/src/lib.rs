//! Content-addressable git object model for Keel.
//!
//! This crate provides the immutable, SHA-1 addressed object records
//! (blobs, trees, commits, tags) with strict serialization, parsing, and
//! format validation, plus the minimal store contract the wire protocol
//! builds on.

mod commit;
mod digest;
mod error;
mod identity;
mod message;
mod object;
mod store;
mod tag;
mod time;
mod tree;

pub use commit::Commit;
pub use digest::{check_hexsha, DigestSource, LazyDigest, Sha1Digest};
pub use error::ObjectError;
pub use identity::{check_identity, TimedIdentity};
pub use object::{loose_object_path, Blob, GitObject, ObjectType};
pub use store::{MemoryObjectStore, ObjectStore};
pub use tag::Tag;
pub use time::{format_timezone, parse_timezone};
pub use tree::{mode, parse_tree, sorted_tree_items, Tree, TreeEntry};

/// A specialized Result type for object model operations.
pub type Result<T> = std::result::Result<T, ObjectError>;
