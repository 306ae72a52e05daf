//! RPC program database functions.
//!
//! Implements a files backend for `<rpc/netdb.h>` functions: `getrpcbyname`,
//! `getrpcbynumber`, `getrpcent`. Parses `/etc/rpc` in the traditional
//! whitespace-delimited format:
//!
//! ```text
//! portmapper  100000  portmap sunrpc rpcbind
//! rstatd      100001  rstat rup perfmeter
//! # comment to end of line
//! ```

mod database;
mod error;
mod pack;

pub use database::{CacheMetrics, RpcCursor, RpcDatabase, RpcSource, Snapshot};
pub use error::RpcError;
pub use pack::RpcEntryView;

use std::fmt;

/// A parsed RPC program entry (analogous to `struct rpcent`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcEntry {
    /// Canonical name of the server for this program.
    pub r_name: Vec<u8>,
    /// Alternate names, in file order.
    pub r_aliases: Vec<Vec<u8>>,
    /// RPC program number.
    pub r_number: u32,
}

impl RpcEntry {
    /// True when `key` equals the canonical name or any alias (case-sensitive).
    pub fn matches_name(&self, key: &[u8]) -> bool {
        self.r_name == key || self.r_aliases.iter().any(|alias| alias == key)
    }

    /// Canonical name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &[u8]> {
        std::iter::once(self.r_name.as_slice()).chain(self.r_aliases.iter().map(Vec::as_slice))
    }
}

/// Renders the entry back in `/etc/rpc` line format.
impl fmt::Display for RpcEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}",
            String::from_utf8_lossy(&self.r_name),
            self.r_number
        )?;
        for alias in &self.r_aliases {
            write!(f, " {}", String::from_utf8_lossy(alias))?;
        }
        Ok(())
    }
}

/// Parse accounting for one pass over database content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Lines that produced an entry.
    pub parsed_entries: usize,
    /// Non-blank, non-comment lines that were rejected.
    pub malformed_lines: usize,
    /// Blank or comment-only lines.
    pub skipped_lines: usize,
}

enum Line {
    Blank,
    Entry(RpcEntry),
    Malformed,
}

fn is_field_sep(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | 0x0b | 0x0c)
}

/// Cut a raw line at the first NUL (C string end) and at the first `#`.
fn strip_line(line: &[u8]) -> &[u8] {
    let line = match line.iter().position(|&b| b == 0) {
        Some(pos) => &line[..pos],
        None => line,
    };
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    match line.iter().position(|&b| b == b'#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Parse a program number field: decimal, optional leading `+`, fits in `u32`.
fn parse_program_number(field: &[u8]) -> Option<u32> {
    core::str::from_utf8(field).ok()?.parse::<u32>().ok()
}

fn classify_line(line: &[u8]) -> Line {
    let mut fields = strip_line(line)
        .split(|&b| is_field_sep(b))
        .filter(|f| !f.is_empty());

    let Some(name) = fields.next() else {
        return Line::Blank;
    };
    let Some(number) = fields.next().and_then(parse_program_number) else {
        return Line::Malformed;
    };

    Line::Entry(RpcEntry {
        r_name: name.to_vec(),
        r_aliases: fields.map(<[u8]>::to_vec).collect(),
        r_number: number,
    })
}

/// Parse a single line from `/etc/rpc`.
///
/// Format: `name number [alias ...]`
/// Returns `None` for comments, blank lines, or malformed entries (missing or
/// non-numeric program number).
pub fn parse_rpc_line(line: &[u8]) -> Option<RpcEntry> {
    match classify_line(line) {
        Line::Entry(entry) => Some(entry),
        Line::Blank | Line::Malformed => None,
    }
}

/// Parse all valid entries from database content, in file order.
pub fn parse_all(content: &[u8]) -> Vec<RpcEntry> {
    content
        .split(|&b| b == b'\n')
        .filter_map(parse_rpc_line)
        .collect()
}

/// Parse all valid entries and account for every line that did not produce one.
pub fn parse_all_with_stats(content: &[u8]) -> (Vec<RpcEntry>, ParseStats) {
    let mut entries = Vec::new();
    let mut stats = ParseStats::default();
    if content.is_empty() {
        return (entries, stats);
    }
    for line in content.split(|&b| b == b'\n') {
        match classify_line(line) {
            Line::Entry(entry) => {
                stats.parsed_entries += 1;
                entries.push(entry);
            }
            Line::Blank => stats.skipped_lines += 1,
            Line::Malformed => stats.malformed_lines += 1,
        }
    }
    // A trailing newline yields one empty fragment that is not a real line.
    if content.last() == Some(&b'\n') {
        stats.skipped_lines -= 1;
    }
    (entries, stats)
}

/// First entry in `entries` whose name or alias equals `name`.
pub fn find_by_name<'a>(entries: &'a [RpcEntry], name: &[u8]) -> Option<&'a RpcEntry> {
    entries.iter().find(|entry| entry.matches_name(name))
}

/// First entry in `entries` with program number `number`.
pub fn find_by_number(entries: &[RpcEntry], number: u32) -> Option<&RpcEntry> {
    entries.iter().find(|entry| entry.r_number == number)
}

/// Look up an entry by canonical name or alias.
///
/// Scans `content` (expected to be the full `/etc/rpc` file) line by line.
/// Returns the first matching entry (case-sensitive, matching glibc behavior).
pub fn lookup_by_name(content: &[u8], name: &[u8]) -> Option<RpcEntry> {
    for line in content.split(|&b| b == b'\n') {
        if let Some(entry) = parse_rpc_line(line)
            && entry.matches_name(name)
        {
            return Some(entry);
        }
    }
    None
}

/// Look up an entry by program number.
///
/// Scans `content` line by line and returns the first matching entry.
pub fn lookup_by_number(content: &[u8], number: u32) -> Option<RpcEntry> {
    for line in content.split(|&b| b == b'\n') {
        if let Some(entry) = parse_rpc_line(line)
            && entry.r_number == number
        {
            return Some(entry);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RPC: &[u8] = b"\
# This file contains user readable names that can be used in place of rpc
# program numbers.

portmapper\t100000\tportmap sunrpc rpcbind
rstatd\t\t100001\trstat rup perfmeter rstat_svc
rusersd\t\t100002\trusers
nfs\t\t100003\tnfsprog
ypserv\t\t100004\typprog
mountd\t\t100005\tmount showmount
";

    fn names(entry: &RpcEntry) -> Vec<&[u8]> {
        entry.names().collect()
    }

    #[test]
    fn parse_line_with_aliases() {
        let entry = parse_rpc_line(b"portmapper 100000 portmap sunrpc").unwrap();
        assert_eq!(entry.r_name, b"portmapper");
        assert_eq!(entry.r_number, 100000);
        assert_eq!(
            entry.r_aliases,
            vec![b"portmap".to_vec(), b"sunrpc".to_vec()]
        );
    }

    #[test]
    fn parse_line_without_aliases() {
        let entry = parse_rpc_line(b"rusersd 100002").unwrap();
        assert_eq!(entry.r_name, b"rusersd");
        assert_eq!(entry.r_number, 100002);
        assert!(entry.r_aliases.is_empty());
    }

    #[test]
    fn parse_mixed_whitespace() {
        let entry = parse_rpc_line(b"  \tnfs \t 100003\t\tnfsprog  ").unwrap();
        assert_eq!(entry.r_name, b"nfs");
        assert_eq!(entry.r_number, 100003);
        assert_eq!(entry.r_aliases, vec![b"nfsprog".to_vec()]);
    }

    #[test]
    fn parse_inline_comment() {
        let entry = parse_rpc_line(b"mountd 100005 mount # legacy showmount").unwrap();
        assert_eq!(entry.r_aliases, vec![b"mount".to_vec()]);
    }

    #[test]
    fn comment_directly_after_number() {
        let entry = parse_rpc_line(b"mountd 100005#mount").unwrap();
        assert_eq!(entry.r_number, 100005);
        assert!(entry.r_aliases.is_empty());
    }

    #[test]
    fn parse_line_with_crlf() {
        let entry = parse_rpc_line(b"ypserv 100004 ypprog\r\n").unwrap();
        assert_eq!(entry.r_name, b"ypserv");
        assert_eq!(entry.r_aliases, vec![b"ypprog".to_vec()]);
    }

    #[test]
    fn nul_terminates_line() {
        let entry = parse_rpc_line(b"nfs 100003 nfsprog\0garbage").unwrap();
        assert_eq!(entry.r_aliases, vec![b"nfsprog".to_vec()]);
        assert!(parse_rpc_line(b"nfs\0 100003").is_none());
    }

    #[test]
    fn skip_comment_and_blank_lines() {
        assert!(parse_rpc_line(b"# comment").is_none());
        assert!(parse_rpc_line(b"").is_none());
        assert!(parse_rpc_line(b"   \t ").is_none());
        assert!(parse_rpc_line(b"\n").is_none());
    }

    #[test]
    fn reject_missing_number() {
        assert!(parse_rpc_line(b"portmapper").is_none());
        assert!(parse_rpc_line(b"portmapper # 100000").is_none());
    }

    #[test]
    fn reject_non_numeric_number() {
        assert!(parse_rpc_line(b"portmapper abc").is_none());
        assert!(parse_rpc_line(b"portmapper 100000x portmap").is_none());
        assert!(parse_rpc_line(b"portmapper 0x186a0").is_none());
    }

    #[test]
    fn reject_negative_and_oversized_numbers() {
        assert!(parse_rpc_line(b"neg -1").is_none());
        assert!(parse_rpc_line(b"big 4294967296").is_none());
        assert_eq!(
            parse_rpc_line(b"max 4294967295").unwrap().r_number,
            u32::MAX
        );
    }

    #[test]
    fn leading_plus_is_accepted() {
        assert_eq!(parse_rpc_line(b"plus +100000").unwrap().r_number, 100000);
    }

    #[test]
    fn number_in_alias_position_is_just_an_alias() {
        let entry = parse_rpc_line(b"odd 7 8 9").unwrap();
        assert_eq!(entry.r_number, 7);
        assert_eq!(entry.r_aliases, vec![b"8".to_vec(), b"9".to_vec()]);
    }

    #[test]
    fn duplicate_aliases_are_kept() {
        let entry = parse_rpc_line(b"dup 1 a a").unwrap();
        assert_eq!(entry.r_aliases.len(), 2);
    }

    #[test]
    fn parse_all_entries_in_file_order() {
        let entries = parse_all(SAMPLE_RPC);
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].r_name, b"portmapper");
        assert_eq!(entries[5].r_name, b"mountd");
        let numbers: Vec<u32> = entries.iter().map(|e| e.r_number).collect();
        assert_eq!(numbers, vec![100000, 100001, 100002, 100003, 100004, 100005]);
    }

    #[test]
    fn parse_stats_account_for_every_line() {
        let content = b"# header\n\nportmapper 100000\nbroken\nrusersd abc\nnfs 100003\n";
        let (entries, stats) = parse_all_with_stats(content);
        assert_eq!(entries.len(), 2);
        assert_eq!(stats.parsed_entries, 2);
        assert_eq!(stats.malformed_lines, 2);
        assert_eq!(stats.skipped_lines, 2);
    }

    #[test]
    fn parse_stats_without_trailing_newline() {
        let (_, stats) = parse_all_with_stats(b"a 1\nb 2");
        assert_eq!(stats.parsed_entries, 2);
        assert_eq!(stats.skipped_lines, 0);
    }

    #[test]
    fn parse_stats_on_empty_content() {
        let (entries, stats) = parse_all_with_stats(b"");
        assert!(entries.is_empty());
        assert_eq!(stats, ParseStats::default());

        let (_, stats) = parse_all_with_stats(b"\n");
        assert_eq!(stats.skipped_lines, 1);
    }

    #[test]
    fn lookup_by_name_canonical_and_every_alias() {
        let expected = lookup_by_name(SAMPLE_RPC, b"rstatd").unwrap();
        let keys: [&[u8]; 5] = [b"rstatd", b"rstat", b"rup", b"perfmeter", b"rstat_svc"];
        for key in keys {
            assert_eq!(lookup_by_name(SAMPLE_RPC, key).as_ref(), Some(&expected));
        }
    }

    #[test]
    fn lookup_by_alias_returns_owner() {
        let entry = lookup_by_name(SAMPLE_RPC, b"sunrpc").unwrap();
        assert_eq!(entry.r_name, b"portmapper");
        assert_eq!(entry.r_number, 100000);
    }

    #[test]
    fn lookup_by_name_not_found() {
        assert!(lookup_by_name(SAMPLE_RPC, b"walld").is_none());
        assert!(lookup_by_name(SAMPLE_RPC, b"").is_none());
    }

    #[test]
    fn lookup_by_name_case_sensitive() {
        assert!(lookup_by_name(SAMPLE_RPC, b"NFS").is_none());
        assert!(lookup_by_name(SAMPLE_RPC, b"nfs").is_some());
    }

    #[test]
    fn lookup_by_number_found() {
        let entry = lookup_by_number(SAMPLE_RPC, 100002).unwrap();
        assert_eq!(entry.r_name, b"rusersd");
    }

    #[test]
    fn lookup_by_number_not_found() {
        assert!(lookup_by_number(SAMPLE_RPC, 99).is_none());
    }

    #[test]
    fn first_match_wins_for_duplicate_numbers() {
        let content = b"alpha 500 a\nbeta 500 b\n";
        assert_eq!(lookup_by_number(content, 500).unwrap().r_name, b"alpha");
    }

    #[test]
    fn first_match_wins_when_alias_shadows_later_name() {
        let content = b"first 1 shared\nshared 2\n";
        assert_eq!(lookup_by_name(content, b"shared").unwrap().r_number, 1);
    }

    #[test]
    fn skip_malformed_lines_in_lookup() {
        let content = b"bad line\nportmapper 100000 sunrpc\n";
        assert_eq!(lookup_by_name(content, b"sunrpc").unwrap().r_number, 100000);
    }

    #[test]
    fn slice_finders_match_content_lookups() {
        let entries = parse_all(SAMPLE_RPC);
        assert_eq!(
            find_by_name(&entries, b"showmount"),
            lookup_by_name(SAMPLE_RPC, b"showmount").as_ref()
        );
        assert_eq!(
            find_by_number(&entries, 100004),
            lookup_by_number(SAMPLE_RPC, 100004).as_ref()
        );
        assert!(find_by_number(&entries, 1).is_none());
    }

    #[test]
    fn names_yields_canonical_first() {
        let entry = parse_rpc_line(b"mountd 100005 mount showmount").unwrap();
        assert_eq!(
            names(&entry),
            vec![&b"mountd"[..], &b"mount"[..], &b"showmount"[..]]
        );
    }

    #[test]
    fn display_renders_rpc_line() {
        let entry = parse_rpc_line(b"portmapper 100000 portmap sunrpc").unwrap();
        assert_eq!(entry.to_string(), "portmapper\t100000 portmap sunrpc");
        let bare = parse_rpc_line(b"rusersd 100002").unwrap();
        assert_eq!(bare.to_string(), "rusersd\t100002");
    }

    #[test]
    fn display_output_reparses_to_same_entry() {
        for entry in parse_all(SAMPLE_RPC) {
            let line = entry.to_string();
            assert_eq!(parse_rpc_line(line.as_bytes()), Some(entry));
        }
    }
}
