//! # rpcdb-core
//!
//! Safe Rust implementation of the Sun RPC program database behind
//! `<rpc/netdb.h>`: parsing `/etc/rpc`, lookups by name, alias or program
//! number, and sequential iteration. No `unsafe` code is permitted at the
//! crate level; the C boundary lives in `rpcdb-abi`.

#![deny(unsafe_code)]

pub mod errno;
pub mod rpc;
