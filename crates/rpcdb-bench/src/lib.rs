//! Shared fixtures for the rpcdb benchmarks.

use std::fmt::Write as _;

/// Deterministic `/etc/rpc`-format content with `count` entries.
///
/// Entry `i` is `prog{i}` with number `100000 + i` and `i % 4` aliases.
pub fn synthetic_database(count: usize) -> Vec<u8> {
    let mut out = String::from("# synthetic rpc database\n");
    for i in 0..count {
        let _ = write!(out, "prog{i}\t{}", 100_000 + i);
        for a in 0..i % 4 {
            let _ = write!(out, " p{i}alias{a}");
        }
        if i % 16 == 0 {
            out.push_str("\t# comment");
        }
        out.push('\n');
    }
    out.into_bytes()
}
