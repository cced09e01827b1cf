//! Git smart protocol client for Keel.
//!
//! Implements pkt-line framing, capability negotiation, and the
//! fetch-pack/send-pack exchanges over TCP, SSH, local subprocess, and
//! smart HTTP transports, including post-push status report parsing.

mod capabilities;
mod client;
mod error;
mod http;
mod pktline;
mod report;
mod transport;

pub use capabilities::{
    CapabilitySet, CAP_INCLUDE_TAG, CAP_MULTI_ACK, CAP_MULTI_ACK_DETAILED, CAP_NO_PROGRESS,
    CAP_OFS_DELTA, CAP_REPORT_STATUS, CAP_SHALLOW, CAP_SIDE_BAND, CAP_SIDE_BAND_64K,
    CAP_THIN_PACK, FETCH_CAPABILITIES, SEND_CAPABILITIES,
};
pub use client::{GitClient, RefUpdate};
pub use error::ClientError;
pub use http::{strip_service_banner, HttpTransport};
pub use pktline::{PktLine, PktLineReader, PktLineWriter, MAX_PAYLOAD};
pub use report::{RefUpdateResult, ReportStatusParser};
pub use transport::{
    get_transport_and_path, CommandPaths, Connection, GitTransport, SshTransport,
    SubprocessTransport, TcpTransport, Transport, TCP_GIT_PORT,
};

/// A specialized Result type for protocol client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
