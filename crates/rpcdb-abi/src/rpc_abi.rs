//! ABI layer for `<rpc/netdb.h>` functions.
//!
//! Implements `setrpcent`, `endrpcent`, `getrpcbyname`, `getrpcbynumber`,
//! `getrpcent` and the `_r` variants using a files backend (`/etc/rpc`, or the
//! path named by `RPCDB_RPC_PATH`).
//!
//! The non-reentrant functions return pointers to thread-local storage. A
//! keyed lookup overwrites the previous keyed result of the same thread, and
//! `getrpcent` overwrites only the previous `getrpcent` result.

use std::cell::RefCell;
use std::ffi::{CStr, c_char, c_int, c_long};
use std::ptr;

use parking_lot::Mutex;
use rpcdb_core::rpc::{RpcCursor, RpcDatabase, RpcEntry, RpcError, RpcSource};
use rpcdb_membrane::config::rpc_db_path;
use rpcdb_membrane::{LookupOp, LookupOutcome};

use crate::runtime_policy;

/// C `struct rpcent`.
#[repr(C)]
#[allow(non_camel_case_types)]
#[derive(Debug)]
pub struct rpcent {
    pub r_name: *mut c_char,
    pub r_aliases: *mut *mut c_char,
    pub r_number: c_long,
}

impl rpcent {
    const fn empty() -> Self {
        Self {
            r_name: ptr::null_mut(),
            r_aliases: ptr::null_mut(),
            r_number: 0,
        }
    }
}

/// Offsets of the packed strings: canonical name, then each alias.
struct PackedOffsets {
    name: usize,
    aliases: Vec<usize>,
}

/// Pack `entry`'s strings into `bytes` (`name\0alias0\0...`).
fn pack_offsets(entry: &RpcEntry, bytes: &mut [u8]) -> Result<PackedOffsets, RpcError> {
    let base = bytes.as_ptr() as usize;
    let view = entry.pack_into(bytes)?;
    Ok(PackedOffsets {
        name: view.name.as_ptr() as usize - base,
        aliases: view
            .aliases
            .iter()
            .map(|alias| alias.as_ptr() as usize - base)
            .collect(),
    })
}

/// One C result: the `rpcent` plus the memory its pointers refer to.
struct RpcResult {
    ent: rpcent,
    /// Concatenated NUL-terminated strings backing `ent`.
    buf: Vec<u8>,
    /// NULL-terminated pointer array for `r_aliases`.
    alias_ptrs: Vec<*mut c_char>,
}

impl RpcResult {
    const fn new() -> Self {
        Self {
            ent: rpcent::empty(),
            buf: Vec::new(),
            alias_ptrs: Vec::new(),
        }
    }

    /// Populate the C struct from a parsed entry.
    fn fill_from(&mut self, entry: &RpcEntry) -> *mut rpcent {
        self.buf.clear();
        self.buf.resize(entry.packed_len(), 0);
        let Ok(offsets) = pack_offsets(entry, &mut self.buf) else {
            return ptr::null_mut();
        };

        let base = self.buf.as_mut_ptr().cast::<c_char>();
        self.alias_ptrs.clear();
        for off in &offsets.aliases {
            // SAFETY: offsets are within buf allocation.
            self.alias_ptrs.push(unsafe { base.add(*off) });
        }
        self.alias_ptrs.push(ptr::null_mut());

        // SAFETY: offsets are within buf allocation. Pointers stay valid until
        // the next fill_from call on this slot.
        self.ent = rpcent {
            r_name: unsafe { base.add(offsets.name) },
            r_aliases: self.alias_ptrs.as_mut_ptr(),
            r_number: entry.r_number as c_long,
        };
        &mut self.ent as *mut rpcent
    }

    fn finish(
        &mut self,
        found: Result<Option<RpcEntry>, RpcError>,
    ) -> (*mut rpcent, LookupOutcome) {
        match found {
            Ok(Some(entry)) => {
                let result = self.fill_from(&entry);
                (result, runtime_policy::pointer_outcome(result))
            }
            Ok(None) => (ptr::null_mut(), LookupOutcome::Miss),
            Err(err) => (ptr::null_mut(), runtime_policy::error_outcome(&err)),
        }
    }
}

/// Thread-local storage for the non-reentrant results and the iteration.
///
/// Keyed lookups and `getrpcent` own separate result slots, so a
/// `getrpcbyname` call in the middle of a pass leaves the last `getrpcent`
/// result intact.
struct RpcStorage {
    /// Result of `getrpcbyname`/`getrpcbynumber`.
    keyed: RpcResult,
    /// Result of `getrpcent`.
    iter: RpcResult,
    db: RpcDatabase,
    /// Position of `getrpcent`/`getrpcent_r`; `None` until iteration starts.
    cursor: Option<RpcCursor>,
}

impl RpcStorage {
    fn new() -> Self {
        Self::with_source(RpcSource::File(rpc_db_path()))
    }

    fn with_source(source: RpcSource) -> Self {
        Self {
            keyed: RpcResult::new(),
            iter: RpcResult::new(),
            db: RpcDatabase::open(source),
            cursor: None,
        }
    }

    /// Follow `RPCDB_RPC_PATH`; a different file abandons the iteration.
    fn sync_source(&mut self) {
        let source = RpcSource::File(rpc_db_path());
        if *self.db.source() != source {
            self.cursor = None;
            self.db.set_source(source);
        }
    }

    fn lookup_by_name(&mut self, name: &[u8]) -> (*mut rpcent, LookupOutcome) {
        let found = self.db.lookup_by_name(name);
        self.keyed.finish(found)
    }

    fn lookup_by_number(&mut self, number: u32) -> (*mut rpcent, LookupOutcome) {
        let found = self.db.lookup_by_number(number);
        self.keyed.finish(found)
    }

    /// `setrpcent`: select stay-open mode and restart iteration.
    fn rewind(&mut self, stay_open: bool) {
        self.db.set_stay_open(stay_open);
        self.cursor = self.db.begin_iteration().ok();
    }

    /// `endrpcent`: drop the cursor and the snapshot, leave stay-open mode.
    fn close(&mut self) {
        self.cursor = None;
        self.db.set_stay_open(false);
        self.db.close();
    }

    /// The thread's cursor; `getrpcent` without `setrpcent` starts one.
    fn cursor(&mut self) -> Result<&mut RpcCursor, RpcError> {
        let cursor = match self.cursor.take() {
            Some(cursor) => cursor,
            None => self.db.begin_iteration()?,
        };
        Ok(self.cursor.insert(cursor))
    }

    fn next_entry(&mut self) -> (*mut rpcent, LookupOutcome) {
        let found = self.cursor().map(|cursor| cursor.next_entry().cloned());
        self.iter.finish(found)
    }

    #[cfg(test)]
    fn cache_metrics(&self) -> rpcdb_core::rpc::CacheMetrics {
        self.db.cache_metrics()
    }
}

thread_local! {
    static RPC_TLS: RefCell<RpcStorage> = RefCell::new(RpcStorage::new());
}

/// Database handle shared by `getrpcbyname_r` and `getrpcbynumber_r`.
static SHARED_DB: Mutex<Option<RpcDatabase>> = Mutex::new(None);

fn shared_lookup<F>(lookup: F) -> Result<Option<RpcEntry>, RpcError>
where
    F: FnOnce(&mut RpcDatabase) -> Result<Option<RpcEntry>, RpcError>,
{
    let path = rpc_db_path();
    let mut guard = SHARED_DB.lock();
    let db = guard.get_or_insert_with(|| RpcDatabase::from_path(path.clone()));
    db.set_source(RpcSource::File(path));
    lookup(db)
}

/// `getrpcbyname`: look up an RPC program by name or alias.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn getrpcbyname(name: *const c_char) -> *mut rpcent {
    if name.is_null() {
        runtime_policy::observe(LookupOp::ByName, LookupOutcome::Rejected);
        return ptr::null_mut();
    }

    // SAFETY: name is non-null.
    let name = unsafe { CStr::from_ptr(name) };
    let (result, outcome) = RPC_TLS.with(|cell| {
        let mut storage = cell.borrow_mut();
        storage.sync_source();
        storage.lookup_by_name(name.to_bytes())
    });
    runtime_policy::observe(LookupOp::ByName, outcome);
    result
}

/// `getrpcbynumber`: look up an RPC program by number.
///
/// Negative numbers never match.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn getrpcbynumber(number: c_int) -> *mut rpcent {
    let Ok(number) = u32::try_from(number) else {
        runtime_policy::observe(LookupOp::ByNumber, LookupOutcome::Rejected);
        return ptr::null_mut();
    };

    let (result, outcome) = RPC_TLS.with(|cell| {
        let mut storage = cell.borrow_mut();
        storage.sync_source();
        storage.lookup_by_number(number)
    });
    runtime_policy::observe(LookupOp::ByNumber, outcome);
    result
}

/// `setrpcent`: rewind the iteration cursor; a non-zero `stayopen` pins the
/// database snapshot until `endrpcent`.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn setrpcent(stayopen: c_int) {
    RPC_TLS.with(|cell| {
        let mut storage = cell.borrow_mut();
        storage.sync_source();
        storage.rewind(stayopen != 0);
    });
}

/// `endrpcent`: close enumeration and release cached data.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn endrpcent() {
    RPC_TLS.with(|cell| cell.borrow_mut().close());
}

/// `getrpcent`: return the next entry in file order, NULL at the end.
///
/// The result stays valid across `getrpcbyname`/`getrpcbynumber` calls on the
/// same thread.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn getrpcent() -> *mut rpcent {
    let (result, outcome) = RPC_TLS.with(|cell| {
        let mut storage = cell.borrow_mut();
        storage.sync_source();
        storage.next_entry()
    });
    runtime_policy::observe(LookupOp::Iterate, outcome);
    result
}

/// `getrpcbyname_r`: reentrant version of `getrpcbyname`.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn getrpcbyname_r(
    name: *const c_char,
    result_buf: *mut rpcent,
    buf: *mut c_char,
    buflen: libc::size_t,
    result: *mut *mut rpcent,
) -> c_int {
    if name.is_null() || result_buf.is_null() || buf.is_null() || result.is_null() {
        runtime_policy::observe(LookupOp::ByName, LookupOutcome::Rejected);
        return libc::EINVAL;
    }

    // SAFETY: result is non-null.
    unsafe { *result = ptr::null_mut() };

    // SAFETY: name is non-null.
    let name = unsafe { CStr::from_ptr(name) };
    let found = shared_lookup(|db| db.lookup_by_name(name.to_bytes()));
    // SAFETY: pointers are non-null and caller-owned for the duration of the call.
    unsafe { complete_lookup_r(LookupOp::ByName, found, result_buf, buf, buflen, result) }
}

/// `getrpcbynumber_r`: reentrant version of `getrpcbynumber`.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn getrpcbynumber_r(
    number: c_int,
    result_buf: *mut rpcent,
    buf: *mut c_char,
    buflen: libc::size_t,
    result: *mut *mut rpcent,
) -> c_int {
    if result_buf.is_null() || buf.is_null() || result.is_null() {
        runtime_policy::observe(LookupOp::ByNumber, LookupOutcome::Rejected);
        return libc::EINVAL;
    }

    // SAFETY: result is non-null.
    unsafe { *result = ptr::null_mut() };

    let Ok(number) = u32::try_from(number) else {
        runtime_policy::observe(LookupOp::ByNumber, LookupOutcome::Rejected);
        return 0;
    };

    let found = shared_lookup(|db| db.lookup_by_number(number));
    // SAFETY: pointers are non-null and caller-owned for the duration of the call.
    unsafe { complete_lookup_r(LookupOp::ByNumber, found, result_buf, buf, buflen, result) }
}

/// `getrpcent_r`: reentrant version of `getrpcent`.
///
/// Shares the calling thread's cursor with `getrpcent`. Returns `ENOENT` at
/// the end of the database; on `ERANGE` the cursor stays on the same entry.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn getrpcent_r(
    result_buf: *mut rpcent,
    buf: *mut c_char,
    buflen: libc::size_t,
    result: *mut *mut rpcent,
) -> c_int {
    if result_buf.is_null() || buf.is_null() || result.is_null() {
        runtime_policy::observe(LookupOp::Iterate, LookupOutcome::Rejected);
        return libc::EINVAL;
    }

    // SAFETY: result is non-null.
    unsafe { *result = ptr::null_mut() };

    let (rc, outcome) = RPC_TLS.with(|cell| {
        let mut storage = cell.borrow_mut();
        storage.sync_source();
        let cursor = match storage.cursor() {
            Ok(cursor) => cursor,
            Err(err) => return (err.errno(), runtime_policy::error_outcome(&err)),
        };
        let Some(entry) = cursor.peek() else {
            return (libc::ENOENT, LookupOutcome::Miss);
        };

        // SAFETY: pointers are non-null and caller-owned for the duration of the call.
        let rc = unsafe { fill_rpcent_r(entry, result_buf, buf, buflen, result) };
        match rc {
            0 => {
                cursor.next_entry();
                (0, LookupOutcome::Hit)
            }
            libc::ERANGE => (rc, LookupOutcome::BufferTooSmall),
            _ => (rc, LookupOutcome::IoError),
        }
    });
    runtime_policy::observe(LookupOp::Iterate, outcome);
    rc
}

/// Shared tail of the keyed `_r` lookups.
///
/// # Safety
///
/// Same contract as [`fill_rpcent_r`].
unsafe fn complete_lookup_r(
    op: LookupOp,
    found: Result<Option<RpcEntry>, RpcError>,
    result_buf: *mut rpcent,
    buf: *mut c_char,
    buflen: libc::size_t,
    result: *mut *mut rpcent,
) -> c_int {
    let entry = match found {
        Ok(Some(entry)) => entry,
        Ok(None) => {
            runtime_policy::observe(op, LookupOutcome::Miss);
            return 0;
        }
        Err(err) => {
            runtime_policy::observe(op, runtime_policy::error_outcome(&err));
            return err.errno();
        }
    };

    let rc = unsafe { fill_rpcent_r(&entry, result_buf, buf, buflen, result) };
    let outcome = match rc {
        0 => LookupOutcome::Hit,
        libc::ERANGE => LookupOutcome::BufferTooSmall,
        _ => LookupOutcome::IoError,
    };
    runtime_policy::observe(op, outcome);
    rc
}

/// Bytes `fill_rpcent_r` needs for `entry` when `buf` starts at `buf_addr`.
fn required_len(entry: &RpcEntry, buf_addr: usize) -> (usize, usize) {
    let str_needed = entry.packed_len();
    let ptr_size = std::mem::size_of::<*mut c_char>();
    let ptr_align = std::mem::align_of::<*mut c_char>();

    let misalign = buf_addr.wrapping_add(str_needed) % ptr_align;
    let ptr_start = str_needed + (ptr_align - misalign) % ptr_align;
    let total_needed = ptr_start + (entry.r_aliases.len() + 1) * ptr_size;
    (ptr_start, total_needed)
}

/// Fill a caller-provided `rpcent` and string buffer for `_r` variants.
///
/// Buffer layout: name\0alias0\0alias1\0... [padding] [alias ptr array]
///
/// # Safety
///
/// `rpc`, `buf`, `result` must be valid writable pointers. `buflen` must
/// reflect the actual size of the `buf` allocation.
unsafe fn fill_rpcent_r(
    entry: &RpcEntry,
    rpc: *mut rpcent,
    buf: *mut c_char,
    buflen: libc::size_t,
    result: *mut *mut rpcent,
) -> c_int {
    let (ptr_start, total_needed) = required_len(entry, buf as usize);
    if buflen < total_needed {
        return libc::ERANGE;
    }

    // SAFETY: the string region [buf, buf+packed_len) lies within buflen.
    let bytes = unsafe { std::slice::from_raw_parts_mut(buf.cast::<u8>(), entry.packed_len()) };
    let offsets = match pack_offsets(entry, bytes) {
        Ok(offsets) => offsets,
        Err(err) => return err.errno(),
    };

    // SAFETY: all writes are within [buf, buf+buflen) since total_needed <= buflen,
    // and ptr_start is pointer-aligned.
    unsafe {
        let ptr_array = buf.add(ptr_start).cast::<*mut c_char>();
        for (i, off) in offsets.aliases.iter().enumerate() {
            *ptr_array.add(i) = buf.add(*off);
        }
        *ptr_array.add(offsets.aliases.len()) = ptr::null_mut();

        *rpc = rpcent {
            r_name: buf.add(offsets.name),
            r_aliases: ptr_array,
            r_number: entry.r_number as c_long,
        };
        *result = rpc;
    }

    0
}
