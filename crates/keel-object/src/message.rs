//! Shared header-block parsing for commit and tag bodies.

use crate::{ObjectError, Result};
use bytes::Bytes;

/// Splits a commit or tag body into its ordered `key value` headers and
/// the message bytes following the blank line.
///
/// A line beginning with a space continues the previous header's value
/// (multi-line values such as embedded signatures). A body without a blank
/// line has an empty message.
pub(crate) fn parse_message(data: &[u8]) -> Result<(Vec<(String, Vec<u8>)>, Bytes)> {
    let mut headers: Vec<(String, Vec<u8>)> = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let (line, next) = match data[pos..].iter().position(|&b| b == b'\n') {
            Some(i) => (&data[pos..pos + i], pos + i + 1),
            None => (&data[pos..], data.len()),
        };
        if line.is_empty() {
            return Ok((headers, Bytes::copy_from_slice(&data[next..])));
        }
        if line[0] == b' ' {
            let Some(last) = headers.last_mut() else {
                return Err(ObjectError::Format(
                    "continuation line without a header".to_string(),
                ));
            };
            last.1.push(b'\n');
            last.1.extend_from_slice(&line[1..]);
        } else {
            let sp = line
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| {
                    ObjectError::Format(format!(
                        "malformed header line: {}",
                        String::from_utf8_lossy(line)
                    ))
                })?;
            let name = std::str::from_utf8(&line[..sp])
                .map_err(|_| ObjectError::Format("header name is not valid text".to_string()))?
                .to_string();
            headers.push((name, line[sp + 1..].to_vec()));
        }
        pos = next;
    }
    Ok((headers, Bytes::new()))
}

/// Appends a `key value\n` header line, encoding embedded newlines as
/// continuation lines.
pub(crate) fn push_header(out: &mut Vec<u8>, name: &str, value: &[u8]) {
    out.extend_from_slice(name.as_bytes());
    out.push(b' ');
    for &b in value {
        out.push(b);
        if b == b'\n' {
            out.push(b' ');
        }
    }
    out.push(b'\n');
}
