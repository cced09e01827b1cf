//! Fetch-pack and send-pack orchestration.

use crate::capabilities::{
    CapabilitySet, CAP_REPORT_STATUS, CAP_SIDE_BAND, CAP_SIDE_BAND_64K, FETCH_CAPABILITIES,
    SEND_CAPABILITIES,
};
use crate::pktline::{PktLine, PktLineReader, PktLineWriter};
use crate::report::ReportStatusParser;
use crate::transport::Transport;
use crate::{ClientError, Result};
use keel_object::Sha1Digest;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use tracing::debug;

/// Side-band channel carrying pack data.
const SIDE_BAND_DATA: u8 = 1;
/// Side-band channel carrying progress messages.
const SIDE_BAND_PROGRESS: u8 = 2;
/// Side-band channel carrying a fatal remote error.
const SIDE_BAND_ERROR: u8 = 3;

/// The advertisement line empty repositories use in place of a ref.
const CAPABILITIES_PLACEHOLDER: &str = "capabilities^{}";

/// A requested change to one remote ref.
///
/// The all-zero digest stands for absence: creation has a zero `old`,
/// deletion a zero `new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdate {
    /// Full ref name, e.g. `refs/heads/main`.
    pub name: String,
    /// The digest the remote ref currently has.
    pub old: Sha1Digest,
    /// The digest the remote ref should have afterwards.
    pub new: Sha1Digest,
}

impl RefUpdate {
    /// A ref creation.
    pub fn create(name: impl Into<String>, new: Sha1Digest) -> Self {
        Self {
            name: name.into(),
            old: Sha1Digest::ZERO,
            new,
        }
    }

    /// A ref move from `old` to `new`.
    pub fn update(name: impl Into<String>, old: Sha1Digest, new: Sha1Digest) -> Self {
        Self {
            name: name.into(),
            old,
            new,
        }
    }

    /// A ref deletion.
    pub fn delete(name: impl Into<String>, old: Sha1Digest) -> Self {
        Self {
            name: name.into(),
            old,
            new: Sha1Digest::ZERO,
        }
    }
}

/// Smart protocol client: capability negotiation plus the fetch-pack and
/// send-pack exchanges over any [`Transport`].
///
/// Each exchange owns its connection and negotiation state exclusively;
/// instances share nothing.
#[derive(Debug, Clone)]
pub struct GitClient {
    fetch_capabilities: CapabilitySet,
    send_capabilities: CapabilitySet,
}

impl GitClient {
    /// Creates a client offering the default capability sets.
    pub fn new() -> Self {
        Self {
            fetch_capabilities: FETCH_CAPABILITIES.iter().copied().collect(),
            send_capabilities: SEND_CAPABILITIES.iter().copied().collect(),
        }
    }

    /// The capabilities offered when fetching.
    pub fn fetch_capabilities(&self) -> &CapabilitySet {
        &self.fetch_capabilities
    }

    /// The capabilities offered when pushing.
    pub fn send_capabilities(&self) -> &CapabilitySet {
        &self.send_capabilities
    }

    /// Fetches a pack of missing objects from the remote repository.
    ///
    /// `determine_wants` selects, from the advertised refs, the digests to
    /// request; when it selects nothing the client sends a single flush
    /// and ends the exchange without requesting a pack. `haves` names
    /// locally-known ancestors. The received pack bytes are streamed into
    /// `pack_out`; side-band progress goes to `progress` when provided.
    ///
    /// Returns the refs the remote advertised.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connection`] on transport failure,
    /// [`ClientError::Protocol`] on framing or negotiation violations.
    pub fn fetch_pack<T, W>(
        &self,
        transport: &mut T,
        path: &str,
        determine_wants: impl FnOnce(&BTreeMap<String, Sha1Digest>) -> Vec<Sha1Digest>,
        haves: &[Sha1Digest],
        pack_out: &mut W,
        mut progress: Option<&mut dyn Write>,
    ) -> Result<BTreeMap<String, Sha1Digest>>
    where
        T: Transport,
        W: Write,
    {
        let mut conn = transport.connect("upload-pack", path)?;
        let (reader, writer) = conn.streams();
        let mut pkt_reader = PktLineReader::new(reader);
        let mut pkt_writer = PktLineWriter::new(writer);

        let (refs, server_capabilities) = read_advertisement(&mut pkt_reader)?;
        let negotiated = self.fetch_capabilities.intersect(&server_capabilities);
        debug!(refs = refs.len(), capabilities = %negotiated, "read upload-pack advertisement");

        let wants = determine_wants(&refs);
        if wants.is_empty() {
            pkt_writer.flush_pkt()?;
            pkt_writer.flush()?;
            debug!("nothing wanted, exchange ends at flush");
            return Ok(refs);
        }

        for (i, want) in wants.iter().enumerate() {
            if i == 0 {
                pkt_writer.write_line(&format!("want {want} {negotiated}"))?;
            } else {
                pkt_writer.write_line(&format!("want {want}"))?;
            }
        }
        pkt_writer.flush_pkt()?;
        for have in haves {
            pkt_writer.write_line(&format!("have {have}"))?;
        }
        pkt_writer.write_line("done")?;
        pkt_writer.flush()?;
        debug!(wants = wants.len(), haves = haves.len(), "sent negotiation");

        consume_acks(&mut pkt_reader)?;
        read_pack(&mut pkt_reader, &negotiated, pack_out, progress.take())?;
        Ok(refs)
    }

    /// Pushes ref updates and a pack of objects to the remote repository.
    ///
    /// One command line is sent per update; the pack is streamed when at
    /// least one update creates or moves a ref (deletion-only pushes send
    /// no pack). When `report-status` was negotiated the remote's status
    /// report decides the outcome; otherwise success is assumed unless the
    /// transport fails.
    ///
    /// Returns the refs the remote advertised before the push.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SendPack`] when the remote rejected the
    /// whole pack, [`ClientError::UpdateRefs`] when it rejected specific
    /// refs, and [`ClientError::Connection`]/[`ClientError::Protocol`] on
    /// transport or framing failures.
    pub fn send_pack<T>(
        &self,
        transport: &mut T,
        path: &str,
        updates: &[RefUpdate],
        pack: &[u8],
    ) -> Result<BTreeMap<String, Sha1Digest>>
    where
        T: Transport,
    {
        let mut conn = transport.connect("receive-pack", path)?;
        let (reader, writer) = conn.streams();
        let mut pkt_reader = PktLineReader::new(reader);
        let mut pkt_writer = PktLineWriter::new(writer);

        let (old_refs, server_capabilities) = read_advertisement(&mut pkt_reader)?;
        let negotiated = self.send_capabilities.intersect(&server_capabilities);
        debug!(refs = old_refs.len(), capabilities = %negotiated, "read receive-pack advertisement");

        if updates.is_empty() {
            pkt_writer.flush_pkt()?;
            pkt_writer.flush()?;
            return Ok(old_refs);
        }

        let mut sends_objects = false;
        for (i, update) in updates.iter().enumerate() {
            let line = format!("{} {} {}", update.old, update.new, update.name);
            if i == 0 {
                pkt_writer.write_data(format!("{line}\0{negotiated}").as_bytes())?;
            } else {
                pkt_writer.write_data(line.as_bytes())?;
            }
            if !update.new.is_zero() {
                sends_objects = true;
            }
        }
        pkt_writer.flush_pkt()?;
        if sends_objects {
            pkt_writer.inner_mut().write_all(pack)?;
        }
        pkt_writer.flush()?;
        debug!(updates = updates.len(), pack_bytes = pack.len(), "sent ref commands");

        if negotiated.contains(CAP_REPORT_STATUS) {
            read_report(&mut pkt_reader, &negotiated)?;
        }
        Ok(old_refs)
    }
}

impl Default for GitClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a ref advertisement: `<sha> <ref>` lines until a flush, with the
/// capability list appended after a NUL on the first line only.
fn read_advertisement<R: Read>(
    reader: &mut PktLineReader<R>,
) -> Result<(BTreeMap<String, Sha1Digest>, CapabilitySet)> {
    let mut refs = BTreeMap::new();
    let mut capabilities = CapabilitySet::new();
    let mut first = true;
    loop {
        let data = match reader.read()? {
            PktLine::Flush => return Ok((refs, capabilities)),
            PktLine::Data(data) => data,
        };
        let line = std::str::from_utf8(&data)
            .map_err(|_| ClientError::Protocol("advertisement line is not valid text".to_string()))?
            .trim_end_matches('\n');
        let line = if first {
            first = false;
            match line.split_once('\0') {
                Some((line, caps)) => {
                    capabilities = CapabilitySet::parse(caps);
                    line
                }
                None => line,
            }
        } else {
            line
        };
        let (sha, refname) = line.split_once(' ').ok_or_else(|| {
            ClientError::Protocol(format!("malformed advertisement line: {line}"))
        })?;
        if refname == CAPABILITIES_PLACEHOLDER {
            // Empty repository: the placeholder only carries capabilities.
            continue;
        }
        refs.insert(refname.to_string(), Sha1Digest::from_hex(sha)?);
    }
}

/// Consumes ACK/NAK negotiation lines, stopping after the terminal one.
fn consume_acks<R: Read>(reader: &mut PktLineReader<R>) -> Result<()> {
    loop {
        let data = match reader.read()? {
            PktLine::Flush => {
                return Err(ClientError::Protocol(
                    "unexpected flush during negotiation".to_string(),
                ))
            }
            PktLine::Data(data) => data,
        };
        let line = String::from_utf8_lossy(&data);
        let line = line.trim_end();
        let parts: Vec<&str> = line.split(' ').collect();
        match parts[0] {
            "NAK" => return Ok(()),
            // multi-ack continuation markers keep negotiation open; a bare
            // ACK is terminal.
            "ACK" => {
                if parts.len() < 3 || !matches!(parts[2], "continue" | "common" | "ready") {
                    return Ok(());
                }
            }
            _ => {
                return Err(ClientError::Protocol(format!(
                    "unexpected negotiation line: {line}"
                )))
            }
        }
    }
}

/// Copies the pack stream to `pack_out`, demultiplexing side-band channels
/// when negotiated.
fn read_pack<R: Read, W: Write>(
    reader: &mut PktLineReader<R>,
    negotiated: &CapabilitySet,
    pack_out: &mut W,
    mut progress: Option<&mut dyn Write>,
) -> Result<()> {
    if negotiated.contains(CAP_SIDE_BAND_64K) || negotiated.contains(CAP_SIDE_BAND) {
        loop {
            let data = match reader.read()? {
                PktLine::Flush => return Ok(()),
                PktLine::Data(data) => data,
            };
            let Some((&channel, payload)) = data.split_first() else {
                continue;
            };
            match channel {
                SIDE_BAND_DATA => pack_out.write_all(payload)?,
                SIDE_BAND_PROGRESS => {
                    if let Some(out) = progress.as_deref_mut() {
                        out.write_all(payload)?;
                    }
                }
                SIDE_BAND_ERROR => {
                    return Err(ClientError::Protocol(format!(
                        "remote error: {}",
                        String::from_utf8_lossy(payload).trim_end()
                    )))
                }
                other => {
                    return Err(ClientError::Protocol(format!(
                        "unknown side-band channel: {other}"
                    )))
                }
            }
        }
    } else {
        std::io::copy(reader.inner_mut(), pack_out)?;
        Ok(())
    }
}

/// Feeds the post-push status stream to a [`ReportStatusParser`] and
/// returns its verdict.
fn read_report<R: Read>(reader: &mut PktLineReader<R>, negotiated: &CapabilitySet) -> Result<()> {
    let mut parser = ReportStatusParser::new();
    if negotiated.contains(CAP_SIDE_BAND_64K) || negotiated.contains(CAP_SIDE_BAND) {
        // The report is itself pkt-line framed inside channel 1.
        let mut report = Vec::new();
        loop {
            let data = match reader.read()? {
                PktLine::Flush => break,
                PktLine::Data(data) => data,
            };
            let Some((&channel, payload)) = data.split_first() else {
                continue;
            };
            match channel {
                SIDE_BAND_DATA => report.extend_from_slice(payload),
                SIDE_BAND_PROGRESS => {}
                SIDE_BAND_ERROR => {
                    return Err(ClientError::Protocol(format!(
                        "remote error: {}",
                        String::from_utf8_lossy(payload).trim_end()
                    )))
                }
                other => {
                    return Err(ClientError::Protocol(format!(
                        "unknown side-band channel: {other}"
                    )))
                }
            }
        }
        let len = report.len() as u64;
        let mut inner = PktLineReader::new(Cursor::new(report));
        loop {
            if inner.inner_mut().position() >= len {
                break;
            }
            match inner.read()? {
                PktLine::Flush => break,
                PktLine::Data(data) => parser.handle_packet(Some(&data))?,
            }
        }
    } else {
        loop {
            match reader.read()? {
                PktLine::Flush => break,
                PktLine::Data(data) => parser.handle_packet(Some(&data))?,
            }
        }
    }
    parser.handle_packet(None)?;
    parser.check()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Connection;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    /// Transport over canned input, capturing everything written.
    struct MockTransport {
        input: Vec<u8>,
        written: Rc<RefCell<Vec<u8>>>,
        connected: Rc<RefCell<Vec<String>>>,
    }

    impl MockTransport {
        fn new(input: Vec<u8>) -> Self {
            Self {
                input,
                written: Rc::new(RefCell::new(Vec::new())),
                connected: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn written(&self) -> Vec<u8> {
            self.written.borrow().clone()
        }
    }

    struct SharedWriter(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Transport for MockTransport {
        fn connect(&mut self, service: &str, path: &str) -> Result<Connection> {
            self.connected.borrow_mut().push(format!("{service} {path}"));
            Ok(Connection::new(
                Cursor::new(self.input.clone()),
                SharedWriter(Rc::clone(&self.written)),
            ))
        }
    }

    fn sha(fill: char) -> Sha1Digest {
        Sha1Digest::from_hex(&fill.to_string().repeat(40)).unwrap()
    }

    fn advertisement(lines: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut writer = PktLineWriter::new(&mut out);
            for line in lines {
                writer.write_line(line).unwrap();
            }
            writer.flush_pkt().unwrap();
        }
        out
    }

    #[test]
    fn fetch_with_empty_selection_sends_only_a_flush() {
        init_tracing();
        let input = advertisement(&[&format!(
            "{} HEAD\0multi_ack thin-pack side-band side-band-64k ofs-delta shallow no-progress include-tag",
            "55dcc6bf963f922e1ed5c4bbaaefcfacef57b1d7"
        )]);
        let mut transport = MockTransport::new(input);
        let client = GitClient::new();
        let mut pack = Vec::new();
        let refs = client
            .fetch_pack(&mut transport, "bla", |_| Vec::new(), &[], &mut pack, None)
            .unwrap();
        assert_eq!(transport.written(), b"0000");
        assert!(pack.is_empty());
        assert_eq!(refs.len(), 1);
        assert!(refs.contains_key("HEAD"));
        assert_eq!(
            transport.connected.borrow().as_slice(),
            &["upload-pack bla".to_string()]
        );
    }

    #[test]
    fn fetch_with_sideband_demultiplexes() {
        let mut input = advertisement(&[
            &format!("{} HEAD\0multi_ack side-band-64k ofs-delta", sha('5')),
            &format!("{} refs/heads/main", sha('5')),
        ]);
        {
            let mut writer = PktLineWriter::new(&mut input);
            writer.write_line("NAK").unwrap();
            let mut pkt = vec![SIDE_BAND_DATA];
            pkt.extend_from_slice(b"PACKcontents");
            writer.write_data(&pkt).unwrap();
            let mut pkt = vec![SIDE_BAND_PROGRESS];
            pkt.extend_from_slice(b"resolving deltas\n");
            writer.write_data(&pkt).unwrap();
            writer.flush_pkt().unwrap();
        }

        let mut transport = MockTransport::new(input);
        let client = GitClient::new();
        let mut pack = Vec::new();
        let mut progress = Vec::new();
        let refs = client
            .fetch_pack(
                &mut transport,
                "/repo",
                |refs| vec![refs["refs/heads/main"]],
                &[sha('a')],
                &mut pack,
                Some(&mut progress),
            )
            .unwrap();

        assert_eq!(pack, b"PACKcontents");
        assert_eq!(progress, b"resolving deltas\n");
        assert_eq!(refs.len(), 2);

        let written = transport.written();
        let mut reader = PktLineReader::new(Cursor::new(written));
        assert_eq!(
            reader.read().unwrap(),
            PktLine::from_string(&format!(
                "want {} multi_ack ofs-delta side-band-64k\n",
                sha('5')
            ))
        );
        assert_eq!(reader.read().unwrap(), PktLine::Flush);
        assert_eq!(
            reader.read().unwrap(),
            PktLine::from_string(&format!("have {}\n", sha('a')))
        );
        assert_eq!(reader.read().unwrap(), PktLine::from_string("done\n"));
    }

    #[test]
    fn fetch_without_sideband_copies_raw_pack() {
        let mut input = advertisement(&[&format!("{} refs/heads/main\0multi_ack", sha('5'))]);
        {
            let mut writer = PktLineWriter::new(&mut input);
            writer.write_line("NAK").unwrap();
        }
        input.extend_from_slice(b"PACKrawbytes");

        let mut transport = MockTransport::new(input);
        let client = GitClient::new();
        let mut pack = Vec::new();
        client
            .fetch_pack(
                &mut transport,
                "/repo",
                |refs| refs.values().copied().collect(),
                &[],
                &mut pack,
                None,
            )
            .unwrap();
        assert_eq!(pack, b"PACKrawbytes");
    }

    #[test]
    fn fetch_surfaces_remote_sideband_error() {
        let mut input = advertisement(&[&format!("{} refs/heads/main\0side-band-64k", sha('5'))]);
        {
            let mut writer = PktLineWriter::new(&mut input);
            writer.write_line("NAK").unwrap();
            let mut pkt = vec![SIDE_BAND_ERROR];
            pkt.extend_from_slice(b"out of memory\n");
            writer.write_data(&pkt).unwrap();
        }

        let mut transport = MockTransport::new(input);
        let client = GitClient::new();
        let mut pack = Vec::new();
        let result = client.fetch_pack(
            &mut transport,
            "/repo",
            |refs| refs.values().copied().collect(),
            &[],
            &mut pack,
            None,
        );
        assert!(matches!(result, Err(ClientError::Protocol(_))));
    }

    #[test]
    fn fetch_from_empty_repository_placeholder() {
        let input = advertisement(&[&format!(
            "{} capabilities^{{}}\0multi_ack side-band-64k",
            Sha1Digest::ZERO
        )]);
        let mut transport = MockTransport::new(input);
        let client = GitClient::new();
        let mut pack = Vec::new();
        let refs = client
            .fetch_pack(&mut transport, "/repo", |_| Vec::new(), &[], &mut pack, None)
            .unwrap();
        assert!(refs.is_empty());
        assert_eq!(transport.written(), b"0000");
    }

    #[test]
    fn send_pack_streams_commands_and_pack() {
        let mut input = advertisement(&[&format!(
            "{} refs/heads/main\0report-status ofs-delta",
            sha('1')
        )]);
        {
            let mut writer = PktLineWriter::new(&mut input);
            writer.write_line("unpack ok").unwrap();
            writer.write_line("ok refs/heads/main").unwrap();
            writer.flush_pkt().unwrap();
        }

        let mut transport = MockTransport::new(input);
        let client = GitClient::new();
        let updates = [RefUpdate::update("refs/heads/main", sha('1'), sha('2'))];
        let old_refs = client
            .send_pack(&mut transport, "/repo", &updates, b"PACKpayload")
            .unwrap();
        assert_eq!(old_refs["refs/heads/main"], sha('1'));

        let written = transport.written();
        let mut reader = PktLineReader::new(Cursor::new(written.clone()));
        let command = reader.read().unwrap();
        let data = command.data().unwrap();
        let expected_prefix = format!("{} {} refs/heads/main\0", sha('1'), sha('2'));
        assert!(data.starts_with(expected_prefix.as_bytes()));
        assert!(data.ends_with(b"ofs-delta report-status"));
        assert_eq!(reader.read().unwrap(), PktLine::Flush);
        assert!(written.ends_with(b"PACKpayload"));
        assert_eq!(
            transport.connected.borrow().as_slice(),
            &["receive-pack /repo".to_string()]
        );
    }

    #[test]
    fn send_pack_surfaces_ref_rejection() {
        let mut input = advertisement(&[&format!("{} refs/heads/main\0report-status", sha('1'))]);
        {
            let mut writer = PktLineWriter::new(&mut input);
            writer.write_line("unpack ok").unwrap();
            writer.write_line("ng refs/heads/main need to pull").unwrap();
            writer.flush_pkt().unwrap();
        }

        let mut transport = MockTransport::new(input);
        let client = GitClient::new();
        let updates = [RefUpdate::update("refs/heads/main", sha('1'), sha('2'))];
        match client.send_pack(&mut transport, "/repo", &updates, b"PACK") {
            Err(ClientError::UpdateRefs { reasons }) => {
                assert_eq!(
                    reasons.get("refs/heads/main").map(String::as_str),
                    Some("need to pull")
                );
            }
            other => panic!("expected UpdateRefs, got {other:?}"),
        }
    }

    #[test]
    fn send_pack_surfaces_unpack_failure() {
        let mut input = advertisement(&[&format!("{} refs/heads/main\0report-status", sha('1'))]);
        {
            let mut writer = PktLineWriter::new(&mut input);
            writer.write_line("unpack error - foo bar").unwrap();
            writer.flush_pkt().unwrap();
        }

        let mut transport = MockTransport::new(input);
        let client = GitClient::new();
        let updates = [RefUpdate::create("refs/heads/new", sha('2'))];
        assert!(matches!(
            client.send_pack(&mut transport, "/repo", &updates, b"PACK"),
            Err(ClientError::SendPack(_))
        ));
    }

    #[test]
    fn send_pack_reads_sidebanded_report() {
        let mut input = advertisement(&[&format!(
            "{} refs/heads/main\0report-status side-band-64k",
            sha('1')
        )]);
        let mut report = Vec::new();
        {
            let mut writer = PktLineWriter::new(&mut report);
            writer.write_line("unpack ok").unwrap();
            writer.write_line("ok refs/heads/main").unwrap();
            writer.flush_pkt().unwrap();
        }
        {
            let mut writer = PktLineWriter::new(&mut input);
            let mut pkt = vec![SIDE_BAND_DATA];
            pkt.extend_from_slice(&report);
            writer.write_data(&pkt).unwrap();
            writer.flush_pkt().unwrap();
        }

        let mut transport = MockTransport::new(input);
        let client = GitClient::new();
        let updates = [RefUpdate::update("refs/heads/main", sha('1'), sha('2'))];
        client
            .send_pack(&mut transport, "/repo", &updates, b"PACK")
            .unwrap();
    }

    #[test]
    fn deletion_only_push_sends_no_pack() {
        let mut input = advertisement(&[&format!("{} refs/heads/gone\0report-status", sha('1'))]);
        {
            let mut writer = PktLineWriter::new(&mut input);
            writer.write_line("unpack ok").unwrap();
            writer.write_line("ok refs/heads/gone").unwrap();
            writer.flush_pkt().unwrap();
        }

        let mut transport = MockTransport::new(input);
        let client = GitClient::new();
        let updates = [RefUpdate::delete("refs/heads/gone", sha('1'))];
        client
            .send_pack(&mut transport, "/repo", &updates, b"PACKpayload")
            .unwrap();
        let written = transport.written();
        assert!(!written
            .windows(b"PACKpayload".len())
            .any(|w| w == b"PACKpayload"));
        assert!(written.ends_with(b"0000"));
    }

    #[test]
    fn push_without_report_status_assumes_success() {
        let input = advertisement(&[&format!("{} refs/heads/main\0ofs-delta", sha('1'))]);
        let mut transport = MockTransport::new(input);
        let client = GitClient::new();
        let updates = [RefUpdate::update("refs/heads/main", sha('1'), sha('2'))];
        client
            .send_pack(&mut transport, "/repo", &updates, b"PACK")
            .unwrap();
    }

    #[test]
    fn empty_update_list_sends_only_a_flush() {
        let input = advertisement(&[&format!("{} refs/heads/main\0report-status", sha('1'))]);
        let mut transport = MockTransport::new(input);
        let client = GitClient::new();
        client.send_pack(&mut transport, "/repo", &[], b"").unwrap();
        assert_eq!(transport.written(), b"0000");
    }

    #[test]
    fn truncated_advertisement_is_a_protocol_error() {
        // Advertisement cut off before its flush.
        let mut input = advertisement(&[&format!("{} refs/heads/main\0multi_ack", sha('5'))]);
        input.truncate(input.len() - 4);
        let mut transport = MockTransport::new(input);
        let client = GitClient::new();
        let mut pack = Vec::new();
        let result = client.fetch_pack(&mut transport, "/repo", |_| Vec::new(), &[], &mut pack, None);
        assert!(matches!(result, Err(ClientError::Protocol(_))));
    }
}
