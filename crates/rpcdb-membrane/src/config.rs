//! Runtime configuration.
//!
//! The database location is set via the `RPCDB_RPC_PATH` environment variable:
//! - unset or empty: `/etc/rpc`, the traditional Sun RPC program database.
//! - anything else: used verbatim as a filesystem path.
//!
//! The variable is resolved on every call, never cached.

use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable naming the RPC program database.
pub const RPC_PATH_ENV: &str = "RPCDB_RPC_PATH";

/// Location used when [`RPC_PATH_ENV`] is unset or empty.
pub const DEFAULT_RPC_PATH: &str = "/etc/rpc";

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcdbConfig {
    /// Path of the `/etc/rpc`-format database backing every lookup.
    pub db_path: PathBuf,
}

impl Default for RpcdbConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_RPC_PATH),
        }
    }
}

impl RpcdbConfig {
    /// Resolve configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Resolve configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let db_path = lookup(RPC_PATH_ENV)
            .filter(|raw| !raw.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_RPC_PATH), PathBuf::from);
        Self { db_path }
    }

    /// Replace the database path (command-line overrides).
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }
}

/// Shorthand for `RpcdbConfig::from_env().db_path`.
#[must_use]
pub fn rpc_db_path() -> PathBuf {
    RpcdbConfig::from_env().db_path
}
