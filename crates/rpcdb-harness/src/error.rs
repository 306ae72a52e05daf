use rpcdb_core::rpc::RpcError;
use thiserror::Error;

/// Failure of a harness command.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{count} invalid structured log line(s)")]
    InvalidLog { count: usize },
}

impl HarnessError {
    /// errno a C caller would have seen for the same failure, if any.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Rpc(err) => Some(err.errno()),
            Self::Io(err) => err.raw_os_error(),
            Self::Json(_) | Self::InvalidLog { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn rpc_errors_keep_their_errno() {
        let err = HarnessError::from(RpcError::Io {
            path: PathBuf::from("/nonexistent/rpc"),
            source: std::io::Error::from_raw_os_error(rpcdb_core::errno::ENOENT),
        });
        assert_eq!(err.errno(), Some(rpcdb_core::errno::ENOENT));
        assert!(err.to_string().contains("/nonexistent/rpc"));
    }

    #[test]
    fn json_errors_have_no_errno() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = HarnessError::from(json_err);
        assert_eq!(err.errno(), None);
        assert!(err.to_string().starts_with("json: "));
    }
}
