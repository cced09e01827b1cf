//! Fuzz target for loose-object parsing.
//!
//! Arbitrary framed records must never panic the parser; a record that
//! parses must serialize and validate without panicking, and its digest
//! must be computable.

#![no_main]

use keel_object::GitObject;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(object) = GitObject::parse_loose(data) {
        let _ = object.serialize();
        let _ = object.check();
        let _ = object.digest();
    }
});
