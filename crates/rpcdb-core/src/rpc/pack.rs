//! Packing entries into caller-supplied storage for the reentrant lookups.
//!
//! Buffer layout: `name\0alias0\0alias1\0...`. Nothing is written unless the
//! whole entry fits, so a too-small buffer never holds a truncated result.

use super::{RpcEntry, RpcError};

/// An entry whose strings borrow from a caller buffer.
///
/// Every slice excludes its NUL terminator, which is present in the buffer
/// immediately after the slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcEntryView<'b> {
    pub name: &'b [u8],
    pub aliases: Vec<&'b [u8]>,
    pub number: u32,
}

impl RpcEntryView<'_> {
    /// Copy the view back into an owned entry.
    pub fn to_entry(&self) -> RpcEntry {
        RpcEntry {
            r_name: self.name.to_vec(),
            r_aliases: self.aliases.iter().map(|alias| alias.to_vec()).collect(),
            r_number: self.number,
        }
    }
}

impl RpcEntry {
    /// Exact number of bytes [`RpcEntry::pack_into`] needs.
    pub fn packed_len(&self) -> usize {
        self.r_name.len() + 1 + self.r_aliases.iter().map(|a| a.len() + 1).sum::<usize>()
    }

    /// Copy the entry's strings into `buf` and return a view over them.
    ///
    /// Fails with [`RpcError::BufferTooSmall`] before writing anything when
    /// `buf` is shorter than [`RpcEntry::packed_len`].
    pub fn pack_into<'b>(&self, buf: &'b mut [u8]) -> Result<RpcEntryView<'b>, RpcError> {
        let needed = self.packed_len();
        if buf.len() < needed {
            return Err(RpcError::BufferTooSmall {
                needed,
                available: buf.len(),
            });
        }

        let mut spans = Vec::with_capacity(self.r_aliases.len() + 1);
        let mut off = 0usize;
        for field in self.names() {
            buf[off..off + field.len()].copy_from_slice(field);
            buf[off + field.len()] = 0;
            spans.push((off, field.len()));
            off += field.len() + 1;
        }

        let buf: &'b [u8] = buf;
        let mut slices = spans.into_iter().map(|(start, len)| &buf[start..start + len]);
        let name = slices.next().unwrap_or_default();
        Ok(RpcEntryView {
            name,
            aliases: slices.collect(),
            number: self.r_number,
        })
    }
}
