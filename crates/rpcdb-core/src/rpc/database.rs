//! Registry handle over an `/etc/rpc`-format source.
//!
//! [`RpcDatabase`] owns the source, the stay-open flag and the current parsed
//! [`Snapshot`]. Invalidation policy:
//! - stay-open: the first successful load is pinned until [`RpcDatabase::close`].
//! - otherwise: every operation compares the file fingerprint (length + mtime);
//!   unchanged keeps the snapshot, changed re-reads the file, a read failure
//!   drops the snapshot.
//!
//! Cursors hold their own `Arc` of the snapshot they started on, so a reload
//! never disturbs an iteration in flight.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use rpcdb_membrane::RpcdbConfig;

use super::{ParseStats, RpcEntry, RpcEntryView, RpcError, find_by_name, find_by_number};

/// Where database content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcSource {
    /// A file in `/etc/rpc` format, re-read according to the stay-open policy.
    File(PathBuf),
    /// Immutable in-memory content.
    Bytes(Vec<u8>),
}

impl RpcSource {
    /// The file path, if this is a file source.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Bytes(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileFingerprint {
    len: u64,
    modified_ns: u128,
}

fn file_fingerprint(path: &Path) -> Option<FileFingerprint> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified_ns = metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |duration| duration.as_nanos());

    Some(FileFingerprint {
        len: metadata.len(),
        modified_ns,
    })
}

/// One immutable parse of the database source.
#[derive(Debug)]
pub struct Snapshot {
    entries: Vec<RpcEntry>,
    stats: ParseStats,
    fingerprint: Option<FileFingerprint>,
    generation: u64,
}

impl Snapshot {
    /// Entries in file order.
    pub fn entries(&self) -> &[RpcEntry] {
        &self.entries
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Load counter of the owning handle when this snapshot was built.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Cache hit/miss/reload/invalidation counters of one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub reloads: u64,
    pub invalidations: u64,
}

/// Handle to an RPC program database.
#[derive(Debug)]
pub struct RpcDatabase {
    source: RpcSource,
    stay_open: bool,
    snapshot: Option<Arc<Snapshot>>,
    generation: u64,
    metrics: CacheMetrics,
}

impl RpcDatabase {
    /// Create a handle. Nothing is read until the first operation.
    pub fn open(source: RpcSource) -> Self {
        Self {
            source,
            stay_open: false,
            snapshot: None,
            generation: 0,
            metrics: CacheMetrics::default(),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::open(RpcSource::File(path.into()))
    }

    pub fn from_bytes(content: impl Into<Vec<u8>>) -> Self {
        Self::open(RpcSource::Bytes(content.into()))
    }

    /// Handle over the configured database file.
    pub fn from_config(config: &RpcdbConfig) -> Self {
        Self::from_path(config.db_path.clone())
    }

    pub fn source(&self) -> &RpcSource {
        &self.source
    }

    /// Point the handle at a different source, closing it if the source changed.
    pub fn set_source(&mut self, source: RpcSource) {
        if self.source != source {
            self.close();
            self.source = source;
        }
    }

    pub fn stay_open(&self) -> bool {
        self.stay_open
    }

    /// Select stay-open mode (`setrpcent(stayopen)`).
    pub fn set_stay_open(&mut self, stay_open: bool) {
        self.stay_open = stay_open;
    }

    /// True while a parsed snapshot is held.
    pub fn is_open(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.metrics
    }

    /// Parse accounting of the currently held snapshot.
    pub fn last_parse_stats(&self) -> Option<ParseStats> {
        self.snapshot.as_ref().map(|snapshot| snapshot.stats)
    }

    fn snapshot_is_current(&self, snapshot: &Snapshot) -> bool {
        if self.stay_open {
            return true;
        }
        match &self.source {
            RpcSource::Bytes(_) => true,
            RpcSource::File(path) => match (snapshot.fingerprint, file_fingerprint(path)) {
                (Some(cached), Some(now)) => cached == now,
                _ => false,
            },
        }
    }

    fn read_source(&self) -> Result<(Vec<u8>, Option<FileFingerprint>), RpcError> {
        match &self.source {
            RpcSource::Bytes(content) => Ok((content.clone(), None)),
            RpcSource::File(path) => {
                let before = file_fingerprint(path);
                let bytes = std::fs::read(path).map_err(|source| RpcError::Io {
                    path: path.clone(),
                    source,
                })?;
                // A write racing the read leaves no trustworthy fingerprint;
                // the next operation then reloads.
                let after = file_fingerprint(path);
                let fingerprint = if before == after { after } else { None };
                Ok((bytes, fingerprint))
            }
        }
    }

    /// Return the current snapshot, loading or reloading the source as the
    /// stay-open policy requires.
    pub fn snapshot(&mut self) -> Result<Arc<Snapshot>, RpcError> {
        if let Some(snapshot) = &self.snapshot
            && self.snapshot_is_current(snapshot)
        {
            self.metrics.hits += 1;
            return Ok(Arc::clone(snapshot));
        }

        self.metrics.misses += 1;
        match self.read_source() {
            Ok((bytes, fingerprint)) => {
                let (entries, stats) = super::parse_all_with_stats(&bytes);
                self.generation = self.generation.wrapping_add(1);
                self.metrics.reloads += 1;
                if self.snapshot.is_some() {
                    self.metrics.invalidations += 1;
                }
                let snapshot = Arc::new(Snapshot {
                    entries,
                    stats,
                    fingerprint,
                    generation: self.generation,
                });
                self.snapshot = Some(Arc::clone(&snapshot));
                Ok(snapshot)
            }
            Err(err) => {
                if self.snapshot.take().is_some() {
                    self.metrics.invalidations += 1;
                }
                Err(err)
            }
        }
    }

    /// Find the first entry whose name or alias equals `name`.
    pub fn lookup_by_name(&mut self, name: &[u8]) -> Result<Option<RpcEntry>, RpcError> {
        let snapshot = self.snapshot()?;
        Ok(find_by_name(snapshot.entries(), name).cloned())
    }

    /// Find the first entry with program number `number`.
    pub fn lookup_by_number(&mut self, number: u32) -> Result<Option<RpcEntry>, RpcError> {
        let snapshot = self.snapshot()?;
        Ok(find_by_number(snapshot.entries(), number).cloned())
    }

    /// Reentrant form of [`RpcDatabase::lookup_by_name`]: the result's strings
    /// are written into `buf`.
    pub fn lookup_by_name_into<'b>(
        &mut self,
        name: &[u8],
        buf: &'b mut [u8],
    ) -> Result<Option<RpcEntryView<'b>>, RpcError> {
        let snapshot = self.snapshot()?;
        match find_by_name(snapshot.entries(), name) {
            Some(entry) => entry.pack_into(buf).map(Some),
            None => Ok(None),
        }
    }

    /// Reentrant form of [`RpcDatabase::lookup_by_number`].
    pub fn lookup_by_number_into<'b>(
        &mut self,
        number: u32,
        buf: &'b mut [u8],
    ) -> Result<Option<RpcEntryView<'b>>, RpcError> {
        let snapshot = self.snapshot()?;
        match find_by_number(snapshot.entries(), number) {
            Some(entry) => entry.pack_into(buf).map(Some),
            None => Ok(None),
        }
    }

    /// Start a fresh pass over the database from its first entry.
    pub fn begin_iteration(&mut self) -> Result<RpcCursor, RpcError> {
        let snapshot = self.snapshot()?;
        Ok(RpcCursor {
            snapshot,
            position: 0,
        })
    }

    /// Finish a pass. Without stay-open the handle releases its snapshot too.
    pub fn end_iteration(&mut self, cursor: RpcCursor) {
        drop(cursor);
        if !self.stay_open {
            self.close();
        }
    }

    /// Release the held snapshot (`endrpcent`).
    pub fn close(&mut self) {
        if self.snapshot.take().is_some() {
            self.metrics.invalidations += 1;
        }
    }
}

/// Caller-owned position in one snapshot.
#[derive(Debug, Clone)]
pub struct RpcCursor {
    snapshot: Arc<Snapshot>,
    position: usize,
}

impl RpcCursor {
    /// Index of the next entry to be returned.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Generation of the snapshot being iterated.
    pub fn generation(&self) -> u64 {
        self.snapshot.generation
    }

    pub fn remaining(&self) -> usize {
        self.snapshot.entries.len().saturating_sub(self.position)
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Borrow the next entry without advancing.
    pub fn peek(&self) -> Option<&RpcEntry> {
        self.snapshot.entries.get(self.position)
    }

    /// Advance and borrow the next entry; `None` at the end of the sequence.
    pub fn next_entry(&mut self) -> Option<&RpcEntry> {
        let entry = self.snapshot.entries.get(self.position)?;
        self.position += 1;
        Some(entry)
    }

    /// Reentrant step: pack the next entry into `buf`.
    ///
    /// On [`RpcError::BufferTooSmall`] the cursor does not advance, so a retry
    /// with a larger buffer returns the same entry.
    pub fn next_into<'b>(
        &mut self,
        buf: &'b mut [u8],
    ) -> Result<Option<RpcEntryView<'b>>, RpcError> {
        let Some(entry) = self.snapshot.entries.get(self.position) else {
            return Ok(None);
        };
        let view = entry.pack_into(buf)?;
        self.position += 1;
        Ok(Some(view))
    }
}

impl Iterator for RpcCursor {
    type Item = RpcEntry;

    fn next(&mut self) -> Option<RpcEntry> {
        self.next_entry().cloned()
    }
}
