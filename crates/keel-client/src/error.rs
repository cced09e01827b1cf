//! Protocol client error types.

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during smart protocol exchanges.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A transport-level failure during connect or data transfer.
    ///
    /// The caller may retry by reconnecting; the client never retries
    /// internally.
    #[error("connection error: {0}")]
    Connection(String),

    /// A pkt-line framing error or protocol-state violation.
    ///
    /// Fatal to the current exchange; there is no partial recovery.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The remote rejected the entire push at the unpack stage.
    ///
    /// No refs were updated; the caller must not assume partial success.
    #[error("send-pack failed: {0}")]
    SendPack(String),

    /// The remote accepted the unpack but rejected specific refs.
    #[error("ref updates rejected: {}", format_reasons(.reasons))]
    UpdateRefs {
        /// Failure reason per rejected ref; refs that succeeded are not
        /// listed.
        reasons: BTreeMap<String, String>,
    },

    /// The URL does not resolve to a supported transport.
    #[error("unsupported transport URL: {0}")]
    UnsupportedUrl(String),

    /// An object-model error.
    #[error(transparent)]
    Object(#[from] keel_object::ObjectError),

    /// An I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_reasons(reasons: &BTreeMap<String, String>) -> String {
    reasons
        .iter()
        .map(|(r, why)| format!("{r}: {why}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A specialized Result type for protocol client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
