//! Transports carrying the smart protocol byte streams.
//!
//! Every transport yields a [`Connection`]: a readable stream positioned at
//! the remote's ref advertisement and a writable stream for the client's
//! side of the exchange.

use crate::http::HttpTransport;
use crate::pktline::PktLineWriter;
use crate::{ClientError, Result};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::process::{Child, Command, Stdio};
use tracing::debug;
use url::Url;

/// The port git daemons listen on by default.
pub const TCP_GIT_PORT: u16 = 9418;

/// An established duplex byte stream to a remote service.
pub struct Connection {
    reader: Box<dyn Read>,
    writer: Box<dyn Write>,
    child: Option<Child>,
}

impl Connection {
    /// Wraps a reader/writer pair.
    pub fn new(reader: impl Read + 'static, writer: impl Write + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            child: None,
        }
    }

    /// Wraps the stdio streams of a spawned service process. The process is
    /// reaped when the connection is dropped.
    pub fn from_child(mut child: Child) -> Result<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::Connection("child process has no stdout".to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClientError::Connection("child process has no stdin".to_string()))?;
        Ok(Self {
            reader: Box::new(stdout),
            writer: Box::new(stdin),
            child: Some(child),
        })
    }

    /// Borrows both directions of the stream.
    pub fn streams(&mut self) -> (&mut dyn Read, &mut dyn Write) {
        (&mut *self.reader, &mut *self.writer)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// A way of reaching a remote repository's upload-pack and receive-pack
/// services.
pub trait Transport {
    /// Opens a connection for `service` ("upload-pack" or "receive-pack")
    /// against the repository at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connection`] on transport-level failure.
    fn connect(&mut self, service: &str, path: &str) -> Result<Connection>;
}

/// The git-daemon TCP transport (`git://`).
#[derive(Debug, Clone)]
pub struct TcpTransport {
    host: String,
    port: u16,
}

impl TcpTransport {
    /// Creates a transport for `host`, defaulting to [`TCP_GIT_PORT`].
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into(),
            port: port.unwrap_or(TCP_GIT_PORT),
        }
    }

    /// The remote host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The remote port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, service: &str, path: &str) -> Result<Connection> {
        debug!(host = %self.host, port = self.port, service = %service, "connecting via tcp");
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .map_err(|e| ClientError::Connection(format!("connect {}:{}: {e}", self.host, self.port)))?;
        let write_half = stream
            .try_clone()
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        let mut conn = Connection::new(stream, write_half);

        // The daemon expects the request line before it advertises refs.
        let request = format!("git-{service} {path}\0host={}\0", self.host);
        let (_, writer) = conn.streams();
        let mut pkt_writer = PktLineWriter::new(writer);
        pkt_writer.write_data(request.as_bytes())?;
        pkt_writer.flush()?;
        Ok(conn)
    }
}

/// Resolves a service name to the executable a remote shell or local
/// subprocess should run, honoring per-command overrides.
#[derive(Debug, Clone, Default)]
pub struct CommandPaths {
    overrides: HashMap<String, String>,
}

impl CommandPaths {
    /// Overrides the executable used for `command` (e.g. "upload-pack").
    pub fn insert(&mut self, command: impl Into<String>, path: impl Into<String>) {
        self.overrides.insert(command.into(), path.into());
    }

    /// Returns the executable for `command`, defaulting to
    /// `git-<command>`.
    pub fn resolve(&self, command: &str) -> String {
        self.overrides
            .get(command)
            .cloned()
            .unwrap_or_else(|| format!("git-{command}"))
    }
}

/// The SSH transport (`git+ssh://` and SCP-like locations).
#[derive(Debug, Clone)]
pub struct SshTransport {
    host: String,
    port: Option<u16>,
    username: Option<String>,
    /// Per-command executable overrides on the remote side.
    pub command_paths: CommandPaths,
}

impl SshTransport {
    /// Creates a transport for `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: None,
            command_paths: CommandPaths::default(),
        }
    }

    /// Sets the remote port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the remote username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// The remote host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The remote port, if overridden.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The remote username, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

impl Transport for SshTransport {
    fn connect(&mut self, service: &str, path: &str) -> Result<Connection> {
        let command = self.command_paths.resolve(service);
        let target = match &self.username {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        };
        debug!(target = %target, command = %command, "connecting via ssh");
        let mut ssh = Command::new("ssh");
        if let Some(port) = self.port {
            ssh.arg("-p").arg(port.to_string());
        }
        let child = ssh
            .arg(&target)
            .arg(format!("{command} '{path}'"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| ClientError::Connection(format!("spawn ssh: {e}")))?;
        Connection::from_child(child)
    }
}

/// The local subprocess transport for filesystem paths.
#[derive(Debug, Clone, Default)]
pub struct SubprocessTransport {
    /// Per-command executable overrides.
    pub command_paths: CommandPaths,
}

impl SubprocessTransport {
    /// Creates a transport running service binaries locally.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for SubprocessTransport {
    fn connect(&mut self, service: &str, path: &str) -> Result<Connection> {
        let command = self.command_paths.resolve(service);
        debug!(command = %command, path = %path, "spawning local service");
        let child = Command::new(&command)
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| ClientError::Connection(format!("spawn {command}: {e}")))?;
        Connection::from_child(child)
    }
}

/// A transport of any supported kind.
///
/// The variant set is closed; URL dispatch in
/// [`get_transport_and_path`] covers exactly these.
pub enum GitTransport {
    /// `git://` daemon connection.
    Tcp(TcpTransport),
    /// `git+ssh://` or SCP-like connection.
    Ssh(SshTransport),
    /// Local subprocess for filesystem paths.
    Subprocess(SubprocessTransport),
    /// Smart HTTP(S).
    Http(HttpTransport),
}

impl Transport for GitTransport {
    fn connect(&mut self, service: &str, path: &str) -> Result<Connection> {
        match self {
            Self::Tcp(t) => t.connect(service, path),
            Self::Ssh(t) => t.connect(service, path),
            Self::Subprocess(t) => t.connect(service, path),
            Self::Http(t) => t.connect(service, path),
        }
    }
}

/// Resolves a location string to a transport and the repository path to
/// pass to it.
///
/// `git://host[:port]/path` becomes TCP; `git+ssh://[user@]host[:port]/path`
/// and SCP-like `[user@]host:path` become SSH; `http(s)://...` becomes
/// HTTP; a bare filesystem path becomes a local subprocess.
///
/// # Errors
///
/// Returns [`ClientError::UnsupportedUrl`] for any other scheme.
pub fn get_transport_and_path(location: &str) -> Result<(GitTransport, String)> {
    if location.contains("://") {
        let url = Url::parse(location)
            .map_err(|e| ClientError::UnsupportedUrl(format!("{location}: {e}")))?;
        let host = || {
            url.host_str()
                .map(str::to_string)
                .ok_or_else(|| ClientError::UnsupportedUrl(format!("{location}: missing host")))
        };
        return match url.scheme() {
            "git" => Ok((
                GitTransport::Tcp(TcpTransport::new(host()?, url.port())),
                url.path().to_string(),
            )),
            "git+ssh" | "ssh" => {
                let mut transport = SshTransport::new(host()?);
                if let Some(port) = url.port() {
                    transport = transport.with_port(port);
                }
                if !url.username().is_empty() {
                    transport = transport.with_username(url.username());
                }
                Ok((GitTransport::Ssh(transport), url.path().to_string()))
            }
            "http" | "https" => Ok((
                GitTransport::Http(HttpTransport::new(&url)?),
                url.path().to_string(),
            )),
            _ => Err(ClientError::UnsupportedUrl(location.to_string())),
        };
    }

    // SCP-like: [user@]host:path, with the colon before any slash.
    if let Some((head, path)) = location.split_once(':') {
        if !head.contains('/') && !head.is_empty() {
            let transport = match head.split_once('@') {
                Some((user, host)) => SshTransport::new(host).with_username(user),
                None => SshTransport::new(head),
            };
            return Ok((GitTransport::Ssh(transport), path.to_string()));
        }
    }

    // Anything else is a local path served by a subprocess.
    Ok((
        GitTransport::Subprocess(SubprocessTransport::new()),
        location.to_string(),
    ))
}
