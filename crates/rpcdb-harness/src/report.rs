//! Verification report for an `/etc/rpc`-format database.
//!
//! Summarizes how a file parses (entries, malformed and skipped lines), which
//! names or numbers are registered more than once, and a SHA-256 digest so two
//! reports can be compared for identical input.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use rpcdb_core::rpc::{RpcEntry, RpcError, parse_all_with_stats};
use serde::{Deserialize, Serialize};
use sha2::Digest;

use crate::error::HarnessError;

/// Serializable form of one database entry (`dump --format json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub name: String,
    pub number: u32,
    pub aliases: Vec<String>,
}

impl From<&RpcEntry> for EntryRecord {
    fn from(entry: &RpcEntry) -> Self {
        Self {
            name: String::from_utf8_lossy(&entry.r_name).into_owned(),
            number: entry.r_number,
            aliases: entry
                .r_aliases
                .iter()
                .map(|alias| String::from_utf8_lossy(alias).into_owned())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseSummary {
    pub parsed_entries: usize,
    pub malformed_lines: usize,
    pub skipped_lines: usize,
}

/// A name (canonical or alias) claimed by more than one entry.
///
/// Only the first claimant is reachable through a name lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateName {
    pub name: String,
    /// Canonical names of the claiming entries, in file order.
    pub entries: Vec<String>,
}

/// A program number registered by more than one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateNumber {
    pub number: u32,
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub source: String,
    pub size_bytes: usize,
    pub sha256: String,
    pub summary: ParseSummary,
    pub duplicate_names: Vec<DuplicateName>,
    pub duplicate_numbers: Vec<DuplicateNumber>,
}

impl VerifyReport {
    /// Build a report over database content. `source` labels the input.
    pub fn from_content(source: impl Into<String>, content: &[u8]) -> Self {
        let (entries, stats) = parse_all_with_stats(content);

        // Claimants are keyed by entry index: two records may share a canonical name.
        let mut names: BTreeMap<&[u8], Vec<(usize, String)>> = BTreeMap::new();
        let mut numbers: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for (index, entry) in entries.iter().enumerate() {
            let owner = String::from_utf8_lossy(&entry.r_name).into_owned();
            for name in entry.names() {
                let claimants = names.entry(name).or_default();
                // An entry listing the same name twice is still one claimant.
                if claimants.last().map(|(claimant, _)| *claimant) != Some(index) {
                    claimants.push((index, owner.clone()));
                }
            }
            numbers.entry(entry.r_number).or_default().push(owner);
        }

        let duplicate_names = names
            .into_iter()
            .filter(|(_, claimants)| claimants.len() > 1)
            .map(|(name, claimants)| DuplicateName {
                name: String::from_utf8_lossy(name).into_owned(),
                entries: claimants.into_iter().map(|(_, owner)| owner).collect(),
            })
            .collect();
        let duplicate_numbers = numbers
            .into_iter()
            .filter(|(_, claimants)| claimants.len() > 1)
            .map(|(number, entries)| DuplicateNumber { number, entries })
            .collect();

        Self {
            source: source.into(),
            size_bytes: content.len(),
            sha256: sha256_hex(content),
            summary: ParseSummary {
                parsed_entries: stats.parsed_entries,
                malformed_lines: stats.malformed_lines,
                skipped_lines: stats.skipped_lines,
            },
            duplicate_names,
            duplicate_numbers,
        }
    }

    /// Read and verify a database file.
    pub fn from_path(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read(path).map_err(|source| RpcError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_content(path.display().to_string(), &content))
    }

    /// True when every line parsed and no name or number is shadowed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.summary.malformed_lines == 0
            && self.duplicate_names.is_empty()
            && self.duplicate_numbers.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn sha256_hex(data: &[u8]) -> String {
    hex_lower(&sha2::Sha256::digest(data))
}
