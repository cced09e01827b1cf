//! Annotated tag objects.

use crate::digest::check_hexsha;
use crate::identity::check_identity;
use crate::message::{parse_message, push_header};
use crate::object::{hash_body, ObjectType};
use crate::{ObjectError, Result, Sha1Digest, TimedIdentity};
use bytes::Bytes;

/// An annotated tag object.
///
/// As with commits, required headers may be absent after parsing and are
/// enforced by [`Tag::check`]. The message may embed a detached signature
/// block, which is carried verbatim.
#[derive(Debug, Clone, Default)]
pub struct Tag {
    object: Option<(ObjectType, Sha1Digest)>,
    name: Option<String>,
    tagger: Option<String>,
    tag_time: Option<i64>,
    tag_timezone: Option<(i32, bool)>,
    message: Bytes,
    raw: Option<Bytes>,
}

impl Tag {
    /// Creates a tag with the required fields.
    pub fn new(
        object_type: ObjectType,
        object: Sha1Digest,
        name: impl Into<String>,
        message: impl Into<Bytes>,
    ) -> Self {
        Self {
            object: Some((object_type, object)),
            name: Some(name.into()),
            tagger: None,
            tag_time: None,
            tag_timezone: None,
            message: message.into(),
            raw: None,
        }
    }

    /// Parses a tag body.
    ///
    /// A `tagger` value without trailing time fields is accepted here (the
    /// time fields stay unset) and rejected by [`Tag::check`].
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Format`] on malformed header lines or an
    /// unknown `type` value.
    pub fn parse(body: impl Into<Bytes>) -> Result<Self> {
        let raw = body.into();
        let (headers, message) = parse_message(&raw)?;
        let mut object_digest = None;
        let mut object_type = None;
        let mut tag = Self {
            message,
            raw: Some(raw.clone()),
            ..Self::default()
        };
        for (name, value) in headers {
            let text = || {
                std::str::from_utf8(&value)
                    .map_err(|_| ObjectError::Format("header value is not valid text".to_string()))
            };
            match name.as_str() {
                "object" => object_digest = Some(Sha1Digest::from_hex_bytes(&value)?),
                "type" => object_type = Some(ObjectType::parse(text()?)?),
                "tag" => tag.name = Some(text()?.to_string()),
                "tagger" => match TimedIdentity::parse(text()?) {
                    Ok(timed) => {
                        tag.tagger = Some(timed.identity);
                        tag.tag_time = Some(timed.time);
                        tag.tag_timezone = Some((timed.offset, timed.negative_utc));
                    }
                    // Legacy tags may omit the timestamp fields.
                    Err(_) => tag.tagger = Some(text()?.to_string()),
                },
                _ => {}
            }
        }
        if let (Some(object_type), Some(digest)) = (object_type, object_digest) {
            tag.object = Some((object_type, digest));
        }
        Ok(tag)
    }

    /// The tagged object's type and digest.
    #[must_use]
    pub fn object(&self) -> Option<(ObjectType, Sha1Digest)> {
        self.object
    }

    /// The tag name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The tagger identity, if any.
    #[must_use]
    pub fn tagger(&self) -> Option<&str> {
        self.tagger.as_deref()
    }

    /// The tag timestamp in epoch seconds, if any.
    #[must_use]
    pub fn tag_time(&self) -> Option<i64> {
        self.tag_time
    }

    /// The tag timezone offset and negative-UTC flag, if any.
    #[must_use]
    pub fn tag_timezone(&self) -> Option<(i32, bool)> {
        self.tag_timezone
    }

    /// The tag message bytes.
    #[must_use]
    pub fn message(&self) -> &Bytes {
        &self.message
    }

    /// Sets the tagged object, invalidating any cached serialization.
    pub fn set_object(&mut self, object_type: ObjectType, digest: Sha1Digest) {
        self.object = Some((object_type, digest));
        self.raw = None;
    }

    /// Sets the tag name, invalidating any cached serialization.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
        self.raw = None;
    }

    /// Sets the tagger with timestamp, invalidating any cached
    /// serialization.
    pub fn set_tagger(&mut self, tagger: TimedIdentity) {
        self.tagger = Some(tagger.identity);
        self.tag_time = Some(tagger.time);
        self.tag_timezone = Some((tagger.offset, tagger.negative_utc));
        self.raw = None;
    }

    /// Sets the message, invalidating any cached serialization.
    pub fn set_message(&mut self, message: impl Into<Bytes>) {
        self.message = message.into();
        self.raw = None;
    }

    /// Serializes the tag body.
    #[must_use]
    pub fn serialize(&self) -> Bytes {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        let mut out = Vec::new();
        if let Some((object_type, digest)) = &self.object {
            push_header(&mut out, "object", digest.to_hex().as_bytes());
            push_header(&mut out, "type", object_type.as_str().as_bytes());
        }
        if let Some(name) = &self.name {
            push_header(&mut out, "tag", name.as_bytes());
        }
        if let Some(tagger) = &self.tagger {
            let value = match (self.tag_time, self.tag_timezone) {
                (Some(time), Some((offset, negative_utc))) => TimedIdentity {
                    identity: tagger.clone(),
                    time,
                    offset,
                    negative_utc,
                }
                .render(),
                _ => tagger.clone(),
            };
            push_header(&mut out, "tagger", value.as_bytes());
        }
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        Bytes::from(out)
    }

    /// Computes the tag's digest over its loose framing.
    #[must_use]
    pub fn digest(&self) -> Sha1Digest {
        hash_body(ObjectType::Tag, &self.serialize())
    }

    /// Validates the tag format.
    ///
    /// The required headers must appear in the fixed order `object`,
    /// `type`, `tag`, `tagger`?; none may repeat; the tag name must be
    /// non-empty and a present tagger must carry a valid identity and
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Format`] describing the first violation.
    pub fn check(&self) -> Result<()> {
        let body = self.serialize();
        let (headers, _) = parse_message(&body)?;
        let mut last: Option<&str> = None;
        let mut has_object = false;
        let mut has_type = false;
        let mut has_name = false;
        for (name, value) in &headers {
            match name.as_str() {
                "object" => {
                    if last.is_some() {
                        return Err(unexpected(name));
                    }
                    check_hexsha(value, "object sha")?;
                    has_object = true;
                }
                "type" => {
                    if last != Some("object") {
                        return Err(unexpected(name));
                    }
                    ObjectType::parse(header_text(value)?)?;
                    has_type = true;
                }
                "tag" => {
                    if last != Some("type") {
                        return Err(unexpected(name));
                    }
                    if value.is_empty() {
                        return Err(ObjectError::Format("empty tag name".to_string()));
                    }
                    has_name = true;
                }
                "tagger" => {
                    if last != Some("tag") {
                        return Err(unexpected(name));
                    }
                    let timed = TimedIdentity::parse(header_text(value)?)?;
                    check_identity(&timed.identity, "tagger")?;
                }
                _ => {}
            }
            last = Some(name.as_str());
        }
        for (present, what) in [
            (has_object, "object"),
            (has_type, "type"),
            (has_name, "tag"),
        ] {
            if !present {
                return Err(ObjectError::Format(format!("missing {what} header")));
            }
        }
        Ok(())
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.serialize() == other.serialize()
    }
}

impl Eq for Tag {}

fn unexpected(name: &str) -> ObjectError {
    ObjectError::Format(format!("unexpected {name} header"))
}

fn header_text(value: &[u8]) -> Result<&str> {
    std::str::from_utf8(value)
        .map_err(|_| ObjectError::Format("header value is not valid text".to_string()))
}
