//! Author, committer, and tagger identity lines.

use crate::time::{format_timezone, parse_timezone};
use crate::{ObjectError, Result};

/// Validates a `Name <email>` identity string.
///
/// Exactly one `<`/`>` pair is required, `<` before `>`, with no nested or
/// duplicated delimiters and nothing after the closing `>`.
///
/// # Errors
///
/// Returns [`ObjectError::Format`] naming `what` when the identity is
/// malformed.
pub fn check_identity(identity: &str, what: &str) -> Result<()> {
    let valid = match (identity.find('<'), identity.find('>')) {
        (Some(open), Some(close)) => {
            open < close
                && !identity[open + 1..].contains('<')
                && !identity[close + 1..].contains('>')
                && close == identity.len() - 1
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ObjectError::Format(format!("invalid {what}: {identity}")))
    }
}

/// An identity line together with its timestamp and timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedIdentity {
    /// The `Name <email>` portion.
    pub identity: String,
    /// Seconds since the Unix epoch.
    pub time: i64,
    /// Timezone offset in seconds.
    pub offset: i32,
    /// Whether a zero offset renders as `-0000`.
    pub negative_utc: bool,
}

impl TimedIdentity {
    /// Creates a timed identity in UTC.
    pub fn new(identity: impl Into<String>, time: i64) -> Self {
        Self {
            identity: identity.into(),
            time,
            offset: 0,
            negative_utc: false,
        }
    }

    /// Sets the timezone offset.
    #[must_use]
    pub fn with_timezone(mut self, offset: i32, negative_utc: bool) -> Self {
        self.offset = offset;
        self.negative_utc = negative_utc;
        self
    }

    /// Parses an `identity epoch ±HHMM` header value.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Format`] when the trailing timestamp or
    /// timezone fields are missing or malformed.
    pub fn parse(value: &str) -> Result<Self> {
        let malformed = || ObjectError::Format(format!("missing timestamp in: {value}"));
        let (rest, tz) = value.rsplit_once(' ').ok_or_else(malformed)?;
        let (identity, time) = rest.rsplit_once(' ').ok_or_else(malformed)?;
        let time: i64 = time
            .parse()
            .map_err(|_| ObjectError::Format(format!("invalid timestamp in: {value}")))?;
        let (offset, negative_utc) = parse_timezone(tz.as_bytes())?;
        Ok(Self {
            identity: identity.to_string(),
            time,
            offset,
            negative_utc,
        })
    }

    /// Renders the `identity epoch ±HHMM` header value.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "{} {} {}",
            self.identity,
            self.time,
            format_timezone(self.offset, self.negative_utc)
        )
    }

    /// Validates the identity portion.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Format`] naming `what` when the identity is
    /// malformed.
    pub fn check(&self, what: &str) -> Result<()> {
        check_identity(&self.identity, what)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn good_identities() {
        check_identity("Dave Borowitz <dborowitz@google.com>", "identity").unwrap();
        check_identity("<dborowitz@google.com>", "identity").unwrap();
        check_identity(" <@localhost>", "identity").unwrap();
    }

    #[test]
    fn bad_identities() {
        for bad in [
            "Dave Borowitz",
            "Dave Borowitz <dborowitz",
            "dborowitz@google.com>",
            "Dave Borowitz <<dborowitz@google.com>",
            "Dave Borowitz <dborowitz@google.com>>",
            "Dave Borowitz <dborowitz@google.com>xxx",
        ] {
            assert!(
                check_identity(bad, "identity").is_err(),
                "accepted: {bad:?}"
            );
        }
    }

    #[test]
    fn timed_identity_roundtrip() {
        let value = "James Westby <jw+debian@jameswestby.net> 1174773719 +0000";
        let parsed = TimedIdentity::parse(value).unwrap();
        assert_eq!(parsed.identity, "James Westby <jw+debian@jameswestby.net>");
        assert_eq!(parsed.time, 1174773719);
        assert_eq!(parsed.offset, 0);
        assert!(!parsed.negative_utc);
        assert_eq!(parsed.render(), value);
    }

    #[test]
    fn timed_identity_negative_offset() {
        let value = "Linus Torvalds <torvalds@woody.linux-foundation.org> 1183319674 -0700";
        let parsed = TimedIdentity::parse(value).unwrap();
        assert_eq!(parsed.offset, -25200);
        assert_eq!(parsed.render(), value);
    }

    #[test]
    fn timed_identity_keeps_leading_space() {
        let parsed = TimedIdentity::parse(" <@localhost> 1231203091 +0000").unwrap();
        assert_eq!(parsed.identity, " <@localhost>");
    }

    #[test]
    fn timed_identity_rejects_wordy_dates() {
        assert!(TimedIdentity::parse(
            "Linus Torvalds <torvalds@woody.linux-foundation.org> Sun 7 Jul 2007 12:54:34 +0700"
        )
        .is_err());
        assert!(TimedIdentity::parse("no time here").is_err());
    }
}
