//! Git timestamp and timezone encoding.

use crate::{ObjectError, Result};

/// Parses a `±HHMM` timezone field into offset seconds and the
/// negative-UTC flag.
///
/// `+0000` and `-0000` both parse to offset 0; the flag distinguishes them
/// so the sign round-trips.
///
/// # Errors
///
/// Returns [`ObjectError::Format`] when the field is not a sign followed by
/// four digits.
pub fn parse_timezone(tz: &[u8]) -> Result<(i32, bool)> {
    let malformed = || ObjectError::Format(format!("invalid timezone: {}", String::from_utf8_lossy(tz)));
    if tz.len() != 5 {
        return Err(malformed());
    }
    let sign = match tz[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return Err(malformed()),
    };
    if !tz[1..].iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }
    let hours = i32::from(tz[1] - b'0') * 10 + i32::from(tz[2] - b'0');
    let minutes = i32::from(tz[3] - b'0') * 10 + i32::from(tz[4] - b'0');
    let offset = sign * (hours * 3600 + minutes * 60);
    Ok((offset, offset == 0 && sign < 0))
}

/// Formats an offset in seconds as a `±HHMM` timezone field.
///
/// An offset of zero renders as `-0000` when `negative_utc` is set.
#[must_use]
pub fn format_timezone(offset: i32, negative_utc: bool) -> String {
    let sign = if offset < 0 || negative_utc { '-' } else { '+' };
    let offset = offset.abs();
    format!("{}{:02}{:02}", sign, offset / 3600, (offset / 60) % 60)
}
