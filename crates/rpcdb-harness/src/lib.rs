//! Operator tooling for the rpcdb program database.
//!
//! This crate provides:
//! - Database verification: parse accounting, duplicate detection and a
//!   content digest for an `/etc/rpc`-format file ([`report`]).
//! - Structured JSONL logging for CLI lookups ([`structured_log`]).
//! - The `rpcdb-harness` binary (`lookup`, `dump`, `verify`, `validate-log`).

#![forbid(unsafe_code)]

pub mod error;
pub mod report;
pub mod structured_log;

pub use error::HarnessError;
pub use report::{EntryRecord, VerifyReport};
