//! Fuzz target for tree body parsing.
//!
//! Lenient and strict parsing must never panic, and whatever parses
//! leniently must round-trip through a Tree without panicking in
//! serialization or validation.

#![no_main]

use keel_object::{parse_tree, Tree};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = parse_tree(data, true);
    if parse_tree(data, false).is_ok() {
        if let Ok(tree) = Tree::parse(data.to_vec()) {
            let _ = tree.serialize();
            let _ = tree.check();
        }
    }
});
