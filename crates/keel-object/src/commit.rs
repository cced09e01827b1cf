//! Commit objects.

use crate::digest::check_hexsha;
use crate::message::{parse_message, push_header};
use crate::object::{hash_body, ObjectType};
use crate::{ObjectError, Result, Sha1Digest, TimedIdentity};
use bytes::Bytes;

/// A commit object.
///
/// Required headers may be absent after parsing; [`Commit::check`] is what
/// rejects an incomplete or ill-ordered commit, so legacy objects can be
/// parsed before being validated.
#[derive(Debug, Clone, Default)]
pub struct Commit {
    tree: Option<Sha1Digest>,
    parents: Vec<Sha1Digest>,
    author: Option<TimedIdentity>,
    committer: Option<TimedIdentity>,
    encoding: Option<String>,
    extra: Vec<(String, Vec<u8>)>,
    message: Bytes,
    raw: Option<Bytes>,
}

impl Commit {
    /// Creates a commit with the required fields.
    pub fn new(
        tree: Sha1Digest,
        author: TimedIdentity,
        committer: TimedIdentity,
        message: impl Into<Bytes>,
    ) -> Self {
        Self {
            tree: Some(tree),
            parents: Vec::new(),
            author: Some(author),
            committer: Some(committer),
            encoding: None,
            extra: Vec::new(),
            message: message.into(),
            raw: None,
        }
    }

    /// Parses a commit body.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Format`] on malformed header lines or header
    /// values; missing required headers are reported by [`Commit::check`],
    /// not here.
    pub fn parse(body: impl Into<Bytes>) -> Result<Self> {
        let raw = body.into();
        let (headers, message) = parse_message(&raw)?;
        let mut commit = Self {
            message,
            raw: Some(raw.clone()),
            ..Self::default()
        };
        for (name, value) in headers {
            match name.as_str() {
                "tree" => commit.tree = Some(Sha1Digest::from_hex_bytes(&value)?),
                "parent" => commit.parents.push(Sha1Digest::from_hex_bytes(&value)?),
                "author" => commit.author = Some(TimedIdentity::parse(header_text(&value)?)?),
                "committer" => commit.committer = Some(TimedIdentity::parse(header_text(&value)?)?),
                "encoding" => commit.encoding = Some(header_text(&value)?.to_string()),
                _ => commit.extra.push((name, value)),
            }
        }
        Ok(commit)
    }

    /// The tree this commit snapshots.
    #[must_use]
    pub fn tree(&self) -> Option<Sha1Digest> {
        self.tree
    }

    /// The parent commits, in order.
    #[must_use]
    pub fn parents(&self) -> &[Sha1Digest] {
        &self.parents
    }

    /// The author identity and timestamp.
    #[must_use]
    pub fn author(&self) -> Option<&TimedIdentity> {
        self.author.as_ref()
    }

    /// The committer identity and timestamp.
    #[must_use]
    pub fn committer(&self) -> Option<&TimedIdentity> {
        self.committer.as_ref()
    }

    /// The declared message encoding, if any.
    #[must_use]
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Extra headers in order of appearance.
    #[must_use]
    pub fn extra(&self) -> &[(String, Vec<u8>)] {
        &self.extra
    }

    /// The commit message bytes.
    #[must_use]
    pub fn message(&self) -> &Bytes {
        &self.message
    }

    /// Sets the tree, invalidating any cached serialization.
    pub fn set_tree(&mut self, tree: Sha1Digest) {
        self.tree = Some(tree);
        self.raw = None;
    }

    /// Replaces the parent list, invalidating any cached serialization.
    pub fn set_parents(&mut self, parents: Vec<Sha1Digest>) {
        self.parents = parents;
        self.raw = None;
    }

    /// Appends a parent, invalidating any cached serialization.
    pub fn add_parent(&mut self, parent: Sha1Digest) {
        self.parents.push(parent);
        self.raw = None;
    }

    /// Sets the author, invalidating any cached serialization.
    pub fn set_author(&mut self, author: TimedIdentity) {
        self.author = Some(author);
        self.raw = None;
    }

    /// Sets the committer, invalidating any cached serialization.
    pub fn set_committer(&mut self, committer: TimedIdentity) {
        self.committer = Some(committer);
        self.raw = None;
    }

    /// Sets the message encoding, invalidating any cached serialization.
    pub fn set_encoding(&mut self, encoding: impl Into<String>) {
        self.encoding = Some(encoding.into());
        self.raw = None;
    }

    /// Appends an extra header, invalidating any cached serialization.
    pub fn add_extra(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.extra.push((name.into(), value.into()));
        self.raw = None;
    }

    /// Sets the message, invalidating any cached serialization.
    pub fn set_message(&mut self, message: impl Into<Bytes>) {
        self.message = message.into();
        self.raw = None;
    }

    /// Serializes the commit body.
    ///
    /// A commit parsed from bytes returns those bytes unchanged; a
    /// constructed or mutated commit renders its headers in canonical
    /// order.
    #[must_use]
    pub fn serialize(&self) -> Bytes {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        let mut out = Vec::new();
        if let Some(tree) = &self.tree {
            push_header(&mut out, "tree", tree.to_hex().as_bytes());
        }
        for parent in &self.parents {
            push_header(&mut out, "parent", parent.to_hex().as_bytes());
        }
        if let Some(author) = &self.author {
            push_header(&mut out, "author", author.render().as_bytes());
        }
        if let Some(committer) = &self.committer {
            push_header(&mut out, "committer", committer.render().as_bytes());
        }
        if let Some(encoding) = &self.encoding {
            push_header(&mut out, "encoding", encoding.as_bytes());
        }
        for (name, value) in &self.extra {
            push_header(&mut out, name, value);
        }
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        Bytes::from(out)
    }

    /// Computes the commit's digest over its loose framing.
    #[must_use]
    pub fn digest(&self) -> Sha1Digest {
        hash_body(ObjectType::Commit, &self.serialize())
    }

    /// Validates the commit format.
    ///
    /// The required headers must appear in the fixed order `tree`,
    /// `parent`*, `author`, `committer`, `encoding`?; only `parent` may
    /// repeat; identities and digests must be well formed.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Format`] describing the first violation.
    pub fn check(&self) -> Result<()> {
        let body = self.serialize();
        let (headers, _) = parse_message(&body)?;
        let mut last: Option<&str> = None;
        let mut has_tree = false;
        let mut has_author = false;
        let mut has_committer = false;
        for (name, value) in &headers {
            match name.as_str() {
                "tree" => {
                    if last.is_some() {
                        return Err(unexpected(name));
                    }
                    check_hexsha(value, "tree sha")?;
                    has_tree = true;
                }
                "parent" => {
                    if !matches!(last, Some("tree" | "parent")) {
                        return Err(unexpected(name));
                    }
                    check_hexsha(value, "parent sha")?;
                }
                "author" => {
                    if !matches!(last, Some("tree" | "parent")) {
                        return Err(unexpected(name));
                    }
                    TimedIdentity::parse(header_text(value)?)?.check("author")?;
                    has_author = true;
                }
                "committer" => {
                    if last != Some("author") {
                        return Err(unexpected(name));
                    }
                    TimedIdentity::parse(header_text(value)?)?.check("committer")?;
                    has_committer = true;
                }
                "encoding" => {
                    if last != Some("committer") {
                        return Err(unexpected(name));
                    }
                }
                _ => {}
            }
            last = Some(name.as_str());
        }
        for (present, what) in [
            (has_tree, "tree"),
            (has_author, "author"),
            (has_committer, "committer"),
        ] {
            if !present {
                return Err(ObjectError::Format(format!("missing {what} header")));
            }
        }
        Ok(())
    }
}

impl PartialEq for Commit {
    fn eq(&self, other: &Self) -> bool {
        self.serialize() == other.serialize()
    }
}

impl Eq for Commit {}

fn unexpected(name: &str) -> ObjectError {
    ObjectError::Format(format!("unexpected {name} header"))
}

fn header_text(value: &[u8]) -> Result<&str> {
    std::str::from_utf8(value)
        .map_err(|_| ObjectError::Format("header value is not valid text".to_string()))
}
