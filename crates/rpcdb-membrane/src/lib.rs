//! # rpcdb-membrane
//!
//! Thin runtime layer shared by every rpcdb entry point.
//!
//! - [`config`]: environment-driven configuration (database location).
//! - [`metrics`]: relaxed atomic counters describing lookup traffic.
//!
//! The ABI crate consults this layer on every call; the core crate stays
//! free of process-global state.

#![deny(unsafe_code)]

pub mod config;
pub mod metrics;

pub use config::{DEFAULT_RPC_PATH, RPC_PATH_ENV, RpcdbConfig};
pub use metrics::{LookupMetrics, LookupOp, LookupOutcome, MetricsSnapshot, global_metrics};
