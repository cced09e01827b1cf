//! Protocol capability tokens and negotiated capability sets.

use std::collections::BTreeSet;
use std::fmt;

/// The `multi_ack` capability token.
pub const CAP_MULTI_ACK: &str = "multi_ack";
/// The `multi_ack_detailed` capability token.
pub const CAP_MULTI_ACK_DETAILED: &str = "multi_ack_detailed";
/// The `side-band` capability token.
pub const CAP_SIDE_BAND: &str = "side-band";
/// The `side-band-64k` capability token.
pub const CAP_SIDE_BAND_64K: &str = "side-band-64k";
/// The `ofs-delta` capability token.
pub const CAP_OFS_DELTA: &str = "ofs-delta";
/// The `thin-pack` capability token.
pub const CAP_THIN_PACK: &str = "thin-pack";
/// The `shallow` capability token.
pub const CAP_SHALLOW: &str = "shallow";
/// The `no-progress` capability token.
pub const CAP_NO_PROGRESS: &str = "no-progress";
/// The `include-tag` capability token.
pub const CAP_INCLUDE_TAG: &str = "include-tag";
/// The `report-status` capability token.
pub const CAP_REPORT_STATUS: &str = "report-status";

/// Capabilities the client offers when fetching.
pub const FETCH_CAPABILITIES: &[&str] = &[
    CAP_MULTI_ACK,
    CAP_SIDE_BAND_64K,
    CAP_OFS_DELTA,
    CAP_THIN_PACK,
    CAP_MULTI_ACK_DETAILED,
];

/// Capabilities the client offers when pushing.
pub const SEND_CAPABILITIES: &[&str] = &[CAP_OFS_DELTA, CAP_REPORT_STATUS, CAP_SIDE_BAND_64K];

/// A set of capability tokens advertized by a peer or negotiated with it.
///
/// Tokens are opaque, case-sensitive strings. Rendering is sorted so the
/// emitted capability list is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    tokens: BTreeSet<String>,
}

impl CapabilitySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a space-separated capability list, as advertized on the
    /// first ref line after the NUL.
    pub fn parse(raw: &str) -> Self {
        raw.split(' ')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Returns true if the set contains `token`.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Returns the tokens present in both sets.
    pub fn intersect(&self, other: &CapabilitySet) -> CapabilitySet {
        Self {
            tokens: self.tokens.intersection(&other.tokens).cloned().collect(),
        }
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns the number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Iterates the tokens in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for token in &self.tokens {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(token)?;
            first = false;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().map(Into::into).collect(),
        }
    }
}
