//! The object store contract required by the protocol core.

use crate::{GitObject, ObjectError, Result, Sha1Digest};
use parking_lot::RwLock;
use std::collections::HashMap;

/// The minimal capability set the core requires from an object store.
///
/// The core never assumes a specific storage medium; loose files, pack
/// files, and memory are all valid backings.
pub trait ObjectStore: Send + Sync {
    /// Checks whether the store holds an object.
    fn contains(&self, digest: &Sha1Digest) -> bool;

    /// Retrieves an object.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::NotFound`] when the object is absent.
    fn get(&self, digest: &Sha1Digest) -> Result<GitObject>;

    /// Adds an object. Adding an identical digest twice is a no-op.
    fn add(&self, object: GitObject);
}

/// In-memory reference implementation of the store contract.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<Sha1Digest, GitObject>>,
}

impl MemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Lists all stored digests.
    #[must_use]
    pub fn digests(&self) -> Vec<Sha1Digest> {
        self.objects.read().keys().copied().collect()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn contains(&self, digest: &Sha1Digest) -> bool {
        self.objects.read().contains_key(digest)
    }

    fn get(&self, digest: &Sha1Digest) -> Result<GitObject> {
        self.objects
            .read()
            .get(digest)
            .cloned()
            .ok_or_else(|| ObjectError::NotFound(digest.to_hex()))
    }

    fn add(&self, object: GitObject) {
        let digest = object.digest();
        self.objects.write().entry(digest).or_insert(object);
    }
}
