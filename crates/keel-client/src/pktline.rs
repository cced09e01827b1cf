//! Git pkt-line framing.
//!
//! Every line of the smart protocol is prefixed with a 4-character hex
//! length counting the prefix itself, or "0000" for a flush marking the
//! end of a section.

use crate::{ClientError, Result};
use std::io::{Read, Write};

/// The largest payload a single pkt-line can carry.
pub const MAX_PAYLOAD: usize = 65516;

/// A pkt-line packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// Data line with content.
    Data(Vec<u8>),
    /// Flush packet (0000): end of section, no payload.
    Flush,
}

impl PktLine {
    /// Creates a data packet from a string slice.
    pub fn from_string(s: &str) -> Self {
        Self::Data(s.as_bytes().to_vec())
    }

    /// Creates a data packet from bytes.
    pub fn from_bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Data(b.into())
    }

    /// Encodes the packet to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] when the payload exceeds
    /// [`MAX_PAYLOAD`]; nothing is transmitted in that case.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Self::Data(data) => {
                if data.len() > MAX_PAYLOAD {
                    return Err(ClientError::Protocol(format!(
                        "pkt-line payload too large: {} > {}",
                        data.len(),
                        MAX_PAYLOAD
                    )));
                }
                let len = data.len() + 4;
                let mut result = format!("{len:04x}").into_bytes();
                result.extend_from_slice(data);
                Ok(result)
            }
            Self::Flush => Ok(b"0000".to_vec()),
        }
    }

    /// Returns true if this is a flush packet.
    pub fn is_flush(&self) -> bool {
        matches!(self, Self::Flush)
    }

    /// Returns the data content, or None for the flush marker.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(data) => Some(data),
            Self::Flush => None,
        }
    }

    /// Returns the data as a string, trimming any trailing newline.
    pub fn as_str(&self) -> Option<&str> {
        self.data()
            .and_then(|d| std::str::from_utf8(d).ok())
            .map(|s| s.trim_end_matches('\n'))
    }
}

/// Reader for pkt-line framed streams.
pub struct PktLineReader<R> {
    reader: R,
}

impl<R: Read> PktLineReader<R> {
    /// Creates a new pkt-line reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next packet.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] when the stream ends before a
    /// complete length prefix or payload arrives; only an explicit flush
    /// is a normal terminator.
    pub fn read(&mut self) -> Result<PktLine> {
        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ClientError::Protocol("stream ended before pkt-line length prefix".to_string())
            } else {
                ClientError::Io(e)
            }
        })?;

        let len_str = std::str::from_utf8(&len_buf)
            .map_err(|_| ClientError::Protocol("invalid pkt-line length prefix".to_string()))?;
        let len = usize::from_str_radix(len_str, 16)
            .map_err(|_| ClientError::Protocol(format!("invalid pkt-line length: {len_str}")))?;

        match len {
            0 => Ok(PktLine::Flush),
            1..=3 => Err(ClientError::Protocol(format!(
                "pkt-line length too small: {len}"
            ))),
            _ => {
                let mut data = vec![0u8; len - 4];
                self.reader.read_exact(&mut data).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::UnexpectedEof {
                        ClientError::Protocol("stream ended inside a pkt-line payload".to_string())
                    } else {
                        ClientError::Io(e)
                    }
                })?;
                Ok(PktLine::Data(data))
            }
        }
    }

    /// Reads data packets until the next flush, returning their payloads.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] on a framing error before the
    /// flush arrives.
    pub fn read_until_flush(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut packets = Vec::new();
        loop {
            match self.read()? {
                PktLine::Flush => return Ok(packets),
                PktLine::Data(data) => packets.push(data),
            }
        }
    }

    /// Returns a mutable reference to the inner reader.
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consumes the reader and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writer for pkt-line framed streams.
pub struct PktLineWriter<W> {
    writer: W,
}

impl<W: Write> PktLineWriter<W> {
    /// Creates a new pkt-line writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a packet.
    pub fn write(&mut self, pkt: &PktLine) -> Result<()> {
        self.writer.write_all(&pkt.encode()?)?;
        Ok(())
    }

    /// Writes a data line.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.write(&PktLine::Data(data.to_vec()))
    }

    /// Writes a string line, appending a newline when missing.
    pub fn write_line(&mut self, s: &str) -> Result<()> {
        let mut data = s.as_bytes().to_vec();
        if !s.ends_with('\n') {
            data.push(b'\n');
        }
        self.write(&PktLine::Data(data))
    }

    /// Writes a flush packet.
    pub fn flush_pkt(&mut self) -> Result<()> {
        self.write(&PktLine::Flush)
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Returns a mutable reference to the inner writer.
    pub fn inner_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consumes the writer and returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
