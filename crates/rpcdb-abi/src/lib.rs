// All extern "C" ABI exports accept raw pointers from C callers and check them
// at runtime, so per-function safety docs would be redundant boilerplate.
#![allow(clippy::missing_safety_doc)]
//! # rpcdb-abi
//!
//! ABI-compatible extern "C" boundary for the `<rpc/netdb.h>` program-number
//! database.
//!
//! This crate produces a `cdylib` exposing `setrpcent`, `endrpcent`,
//! `getrpcbyname`, `getrpcbynumber`, `getrpcent` and their `_r` variants.
//! Each function records its outcome with the membrane counters before
//! returning.
//!
//! # Architecture
//!
//! ```text
//! C caller -> ABI entry (this crate) -> rpcdb-core RpcDatabase -> return
//!                    \-> runtime_policy -> rpcdb-membrane metrics
//! ```

mod runtime_policy;

pub mod rpc_abi;

pub use rpc_abi::rpcent;
