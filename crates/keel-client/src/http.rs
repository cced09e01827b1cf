//! The smart HTTP(S) transport.
//!
//! Smart HTTP is request/response rather than a duplex stream: the ref
//! advertisement comes from `GET <repo>/info/refs?service=...`, and the
//! client's request bytes are buffered and POSTed to `<repo>/git-<service>`
//! when the response is first read. The negotiation in this client writes
//! everything before reading, so the buffering is invisible to the
//! protocol state machine.

use crate::pktline::{PktLine, PktLineReader};
use crate::transport::{Connection, Transport};
use crate::{ClientError, Result};
use std::cell::RefCell;
use std::io::{self, Cursor, Read, Write};
use std::rc::Rc;
use tracing::debug;
use url::Url;

/// The smart HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    root: Url,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Creates a transport rooted at the URL's scheme and authority.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connection`] when the HTTP client cannot be
    /// constructed.
    pub fn new(url: &Url) -> Result<Self> {
        let mut root = url.clone();
        root.set_path("");
        root.set_query(None);
        root.set_fragment(None);
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        Ok(Self { root, client })
    }
}

impl Transport for HttpTransport {
    fn connect(&mut self, service: &str, path: &str) -> Result<Connection> {
        let mut repo_url = self.root.clone();
        repo_url.set_path(path);
        let base = repo_url.path().trim_end_matches('/').to_string();

        let mut info_refs = repo_url.clone();
        info_refs.set_path(&format!("{base}/info/refs"));
        info_refs.set_query(Some(&format!("service=git-{service}")));
        debug!(url = %info_refs, "fetching ref advertisement");

        let response = self
            .client
            .get(info_refs.clone())
            .send()
            .map_err(|e| ClientError::Connection(format!("GET {info_refs}: {e}")))?;
        if !response.status().is_success() {
            return Err(ClientError::Connection(format!(
                "GET {info_refs}: status {}",
                response.status()
            )));
        }
        let body = response
            .bytes()
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        let advert = strip_service_banner(&body, service)?;

        let mut post_url = repo_url.clone();
        post_url.set_path(&format!("{base}/git-{service}"));

        let exchange = Rc::new(RefCell::new(HttpExchange {
            client: self.client.clone(),
            url: post_url,
            service: service.to_string(),
            outgoing: Vec::new(),
            advert: Cursor::new(advert),
            response: None,
            posted: false,
        }));
        Ok(Connection::new(
            HttpReader(Rc::clone(&exchange)),
            HttpWriter(exchange),
        ))
    }
}

/// Removes the `# service=git-<service>` banner pkt and its trailing flush
/// from an info/refs response, leaving the bare advertisement.
///
/// A response without the banner is returned unchanged.
///
/// # Errors
///
/// Returns [`ClientError::Protocol`] when the banner names a different
/// service or is not followed by a flush.
pub fn strip_service_banner(body: &[u8], service: &str) -> Result<Vec<u8>> {
    let mut reader = PktLineReader::new(Cursor::new(body));
    match reader.read() {
        Ok(PktLine::Data(data)) if data.starts_with(b"# service=") => {
            let line = std::str::from_utf8(&data)
                .map_err(|_| ClientError::Protocol("service banner is not valid text".to_string()))?
                .trim_end_matches('\n');
            let expected = format!("# service=git-{service}");
            if line != expected {
                return Err(ClientError::Protocol(format!(
                    "unexpected service banner: {line}"
                )));
            }
            match reader.read()? {
                PktLine::Flush => {}
                PktLine::Data(_) => {
                    return Err(ClientError::Protocol(
                        "missing flush after service banner".to_string(),
                    ))
                }
            }
            let consumed = reader.into_inner().position() as usize;
            Ok(body[consumed..].to_vec())
        }
        _ => Ok(body.to_vec()),
    }
}

struct HttpExchange {
    client: reqwest::blocking::Client,
    url: Url,
    service: String,
    outgoing: Vec<u8>,
    advert: Cursor<Vec<u8>>,
    response: Option<reqwest::blocking::Response>,
    posted: bool,
}

struct HttpReader(Rc<RefCell<HttpExchange>>);

impl Read for HttpReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut ex = self.0.borrow_mut();
        let n = ex.advert.read(buf)?;
        if n > 0 {
            return Ok(n);
        }
        if !ex.posted {
            ex.posted = true;
            let body = std::mem::take(&mut ex.outgoing);
            let url = ex.url.clone();
            let content_type = format!("application/x-git-{}-request", ex.service);
            debug!(url = %url, bytes = body.len(), "posting buffered request");
            let response = ex
                .client
                .post(url)
                .header("Content-Type", content_type)
                .body(body)
                .send()
                .map_err(|e| io::Error::other(e.to_string()))?;
            if !response.status().is_success() {
                return Err(io::Error::other(format!(
                    "POST returned status {}",
                    response.status()
                )));
            }
            ex.response = Some(response);
        }
        match ex.response.as_mut() {
            Some(response) => response.read(buf),
            None => Ok(0),
        }
    }
}

struct HttpWriter(Rc<RefCell<HttpExchange>>);

impl Write for HttpWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().outgoing.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
