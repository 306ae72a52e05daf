//! Runtime policy bridge for ABI entrypoints.
//!
//! Every exported function classifies its outcome here so the process-wide
//! lookup counters stay in one place instead of being bumped ad hoc.

use rpcdb_core::rpc::RpcError;
use rpcdb_membrane::{LookupOp, LookupOutcome, global_metrics};

/// Publish one completed call.
pub(crate) fn observe(op: LookupOp, outcome: LookupOutcome) {
    global_metrics().record(op, outcome);
}

/// Outcome of a non-reentrant call from its returned pointer.
pub(crate) fn pointer_outcome<T>(result: *const T) -> LookupOutcome {
    if result.is_null() {
        LookupOutcome::Miss
    } else {
        LookupOutcome::Hit
    }
}

/// Outcome of a failed core operation.
pub(crate) fn error_outcome(err: &RpcError) -> LookupOutcome {
    if err.is_buffer_too_small() {
        LookupOutcome::BufferTooSmall
    } else {
        LookupOutcome::IoError
    }
}
