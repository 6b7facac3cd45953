//! Memory-mapped offset index
//!
//! Maps a segment-relative offset to the byte position of its record in the
//! store file. Entries are fixed-width so lookup is a single multiply:
//!
//! ```text
//! ┌──────────────────────┬──────────────────────┐
//! │ relative offset (4)  │ store position (8)   │  big-endian
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! The file is grown to its configured maximum before mapping, because the
//! mapping cannot be resized afterwards. That leaves a zeroed tail past the
//! live entries, so close truncates the file back to the live size; the next
//! open then finds the last entry at the end of the file again.

use crate::{LogError, Result};
use bytes::{Buf, BufMut};
use memmap2::MmapMut;
use std::fs::File;

/// Width of the relative-offset field.
const OFF_WIDTH: u64 = 4;
/// Width of the store-position field.
const POS_WIDTH: u64 = 8;
/// Total width of one index entry.
pub(crate) const ENTRY_WIDTH: u64 = OFF_WIDTH + POS_WIDTH;

/// Fixed-width, memory-mapped offset index of one segment.
///
/// Not internally locked: writes only ever come from the active segment,
/// which the log serializes under its write lock.
pub struct Index {
    file: File,
    mmap: MmapMut,
    /// Bytes of live entries; also the write cursor for the next entry
    size: u64,
}

impl Index {
    /// Map `file`, growing it to `max_index_bytes` first.
    ///
    /// The current file length is remembered as the live size, so reopening
    /// a cleanly closed index resumes exactly after its last entry. The
    /// file is never shrunk here.
    pub fn new(file: File, max_index_bytes: u64) -> Result<Self> {
        let size = file.metadata()?.len();
        if size < max_index_bytes {
            file.set_len(max_index_bytes)?;
        }

        // Safety: the engine treats the data directory as exclusively its
        // own; segment files are not resized or rewritten externally while
        // mapped.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self { file, mmap, size })
    }

    /// Append the next entry.
    pub fn write(&mut self, rel_offset: u32, pos: u64) -> Result<()> {
        if (self.mmap.len() as u64) < self.size + ENTRY_WIDTH {
            return Err(LogError::IndexFull);
        }

        let at = self.size as usize;
        let mut entry = &mut self.mmap[at..at + ENTRY_WIDTH as usize];
        entry.put_u32(rel_offset);
        entry.put_u64(pos);

        self.size += ENTRY_WIDTH;
        Ok(())
    }

    /// Read entry `rel`; `-1` reads the last live entry.
    ///
    /// The relative offset comes back as stored on disk rather than being
    /// recomputed from the entry number.
    pub fn read(&self, rel: i64) -> Result<(u32, u64)> {
        if self.size == 0 {
            return Err(LogError::EndOfIndex);
        }

        let entry = if rel == -1 {
            self.size / ENTRY_WIDTH - 1
        } else {
            rel as u64
        };

        let at = entry.checked_mul(ENTRY_WIDTH).ok_or(LogError::EndOfIndex)?;
        if self.size < at + ENTRY_WIDTH {
            return Err(LogError::EndOfIndex);
        }

        let mut buf = &self.mmap[at as usize..(at + ENTRY_WIDTH) as usize];
        let rel_offset = buf.get_u32();
        let pos = buf.get_u64();
        Ok((rel_offset, pos))
    }

    /// Bytes of live entries.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Flush the mapping, fsync, and truncate the file to the live size.
    ///
    /// The truncation removes the pre-grown zero tail; skipping it would
    /// leave the next open unable to find the last entry.
    pub fn close(self) -> Result<()> {
        self.mmap.flush()?;
        self.file.sync_all()?;
        self.file.set_len(self.size)?;
        Ok(())
    }
}
