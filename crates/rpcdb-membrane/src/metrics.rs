//! Atomic counters for lookup observability.
//!
//! All counters use relaxed ordering: they are advisory/diagnostic,
//! not synchronization primitives.

use std::sync::atomic::{AtomicU64, Ordering};

/// Which entry point produced an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupOp {
    /// `getrpcbyname` / `getrpcbyname_r`.
    ByName,
    /// `getrpcbynumber` / `getrpcbynumber_r`.
    ByNumber,
    /// `getrpcent` / `getrpcent_r`.
    Iterate,
}

/// Result class of one lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupOutcome {
    /// An entry was produced.
    Hit,
    /// Normal "not found" (or end of iteration).
    Miss,
    /// Caller buffer too small for a reentrant result.
    BufferTooSmall,
    /// The database could not be read.
    IoError,
    /// Invalid caller arguments (NULL pointers, negative numbers).
    Rejected,
}

/// Process-wide lookup counters.
pub struct LookupMetrics {
    /// Name lookups attempted.
    pub by_name: AtomicU64,
    /// Number lookups attempted.
    pub by_number: AtomicU64,
    /// Iteration steps attempted.
    pub iterations: AtomicU64,
    /// Calls that produced an entry.
    pub hits: AtomicU64,
    /// Calls that legitimately found nothing.
    pub misses: AtomicU64,
    /// Reentrant calls rejected with `ERANGE`.
    pub buffer_too_small: AtomicU64,
    /// Calls that failed to read the database.
    pub io_errors: AtomicU64,
    /// Calls refused because of invalid arguments.
    pub rejected: AtomicU64,
}

impl LookupMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            by_name: AtomicU64::new(0),
            by_number: AtomicU64::new(0),
            iterations: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            buffer_too_small: AtomicU64::new(0),
            io_errors: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Record one completed call.
    pub fn record(&self, op: LookupOp, outcome: LookupOutcome) {
        Self::inc(match op {
            LookupOp::ByName => &self.by_name,
            LookupOp::ByNumber => &self.by_number,
            LookupOp::Iterate => &self.iterations,
        });
        Self::inc(match outcome {
            LookupOutcome::Hit => &self.hits,
            LookupOutcome::Miss => &self.misses,
            LookupOutcome::BufferTooSmall => &self.buffer_too_small,
            LookupOutcome::IoError => &self.io_errors,
            LookupOutcome::Rejected => &self.rejected,
        });
    }

    /// Snapshot all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            by_name: Self::get(&self.by_name),
            by_number: Self::get(&self.by_number),
            iterations: Self::get(&self.iterations),
            hits: Self::get(&self.hits),
            misses: Self::get(&self.misses),
            buffer_too_small: Self::get(&self.buffer_too_small),
            io_errors: Self::get(&self.io_errors),
            rejected: Self::get(&self.rejected),
        }
    }
}

impl Default for LookupMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of all lookup counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub by_name: u64,
    pub by_number: u64,
    pub iterations: u64,
    pub hits: u64,
    pub misses: u64,
    pub buffer_too_small: u64,
    pub io_errors: u64,
    pub rejected: u64,
}

impl MetricsSnapshot {
    /// Total calls across all operations.
    #[must_use]
    pub const fn total_calls(&self) -> u64 {
        self.by_name + self.by_number + self.iterations
    }

    /// Counter-wise difference `self - earlier`, saturating at zero.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            by_name: self.by_name.saturating_sub(earlier.by_name),
            by_number: self.by_number.saturating_sub(earlier.by_number),
            iterations: self.iterations.saturating_sub(earlier.iterations),
            hits: self.hits.saturating_sub(earlier.hits),
            misses: self.misses.saturating_sub(earlier.misses),
            buffer_too_small: self.buffer_too_small.saturating_sub(earlier.buffer_too_small),
            io_errors: self.io_errors.saturating_sub(earlier.io_errors),
            rejected: self.rejected.saturating_sub(earlier.rejected),
        }
    }
}

/// Global metrics instance.
static GLOBAL_METRICS: LookupMetrics = LookupMetrics::new();

/// Access the process-wide metrics.
#[must_use]
pub fn global_metrics() -> &'static LookupMetrics {
    &GLOBAL_METRICS
}
