//! Fuzz target for pkt-line decoding.
//!
//! Arbitrary input must never panic the reader, and every payload that
//! decodes must survive a canonical encode/decode round trip.

#![no_main]

use keel_client::{PktLine, PktLineReader};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut reader = PktLineReader::new(Cursor::new(data.to_vec()));
    for _ in 0..1024 {
        match reader.read() {
            Ok(PktLine::Data(payload)) => {
                if let Ok(encoded) = PktLine::Data(payload.clone()).encode() {
                    let mut roundtrip = PktLineReader::new(Cursor::new(encoded));
                    assert_eq!(roundtrip.read().unwrap(), PktLine::Data(payload));
                }
            }
            Ok(PktLine::Flush) => {}
            Err(_) => break,
        }
    }
});
