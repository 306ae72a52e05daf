use std::path::PathBuf;

use crate::errno;

/// Failure of an RPC database operation.
///
/// "Not found" is not an error: lookups report it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The database source could not be read.
    #[error("cannot read RPC database {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A reentrant lookup's caller buffer cannot hold the entry.
    #[error("buffer too small for RPC entry: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

impl RpcError {
    /// The errno value a C caller sees for this failure.
    pub fn errno(&self) -> i32 {
        match self {
            Self::Io { source, .. } => source.raw_os_error().unwrap_or(errno::EIO),
            Self::BufferTooSmall { .. } => errno::ERANGE,
        }
    }

    pub fn is_buffer_too_small(&self) -> bool {
        matches!(self, Self::BufferTooSmall { .. })
    }
}
