//! Segment: one store and one index under a shared base offset
//!
//! A segment's two files are siblings named after the global offset of the
//! segment's first record: `<base>.store` and `<base>.index`. The segment
//! translates global offsets to segment-relative ones and reports when
//! either file has hit its configured cap so the log can roll a new one.

use crate::index::Index;
use crate::store::Store;
use crate::types::Record;
use crate::{LogError, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File extension of the record data file.
const STORE_EXT: &str = "store";
/// File extension of the offset index file.
const INDEX_EXT: &str = "index";

/// Per-segment tunables.
#[derive(Debug, Clone, Copy)]
pub struct SegmentConfig {
    /// Maximum bytes in the store file before the segment is full
    pub max_store_bytes: u64,
    /// Maximum bytes in the index file before the segment is full
    pub max_index_bytes: u64,
    /// Base offset of the first segment of a fresh log
    pub initial_offset: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: crate::defaults::MAX_STORE_BYTES,
            max_index_bytes: crate::defaults::MAX_INDEX_BYTES,
            initial_offset: 0,
        }
    }
}

/// A contiguous slice of the log.
pub struct Segment {
    store: Arc<Store>,
    index: Index,
    store_path: PathBuf,
    index_path: PathBuf,
    base_offset: u64,
    next_offset: u64,
    config: SegmentConfig,
}

impl Segment {
    /// Open or create the segment starting at `base_offset` in `dir`.
    ///
    /// A reopened segment resumes after its last indexed record; a fresh
    /// one starts at the base offset.
    pub fn new(dir: &Path, base_offset: u64, config: SegmentConfig) -> Result<Self> {
        let store_path = dir.join(format!("{}.{}", base_offset, STORE_EXT));
        let store_file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&store_path)?;
        let store = Arc::new(Store::new(store_file)?);

        let index_path = dir.join(format!("{}.{}", base_offset, INDEX_EXT));
        let index_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&index_path)?;
        let index = Index::new(index_file, config.max_index_bytes)?;

        let next_offset = match index.read(-1) {
            Ok((rel, _)) => base_offset + u64::from(rel) + 1,
            Err(LogError::EndOfIndex) => base_offset,
            Err(e) => return Err(e),
        };

        Ok(Self {
            store,
            index,
            store_path,
            index_path,
            base_offset,
            next_offset,
            config,
        })
    }

    /// Append a record, stamping it with the segment's next offset.
    ///
    /// Returns the offset assigned to the record.
    pub fn append(&mut self, mut record: Record) -> Result<u64> {
        let offset = self.next_offset;
        record.offset = offset;

        let (_, pos) = self.store.append(&record.encode())?;
        self.index.write((offset - self.base_offset) as u32, pos)?;

        self.next_offset += 1;
        Ok(offset)
    }

    /// Read the record at a global offset.
    ///
    /// The log guarantees `base_offset <= offset < next_offset` before
    /// calling.
    pub fn read(&self, offset: u64) -> Result<Record> {
        let rel = (offset - self.base_offset) as i64;
        let (_, pos) = self.index.read(rel)?;
        let data = self.store.read(pos)?;
        Record::decode(&data)
    }

    /// Whether the store or the index has reached its cap.
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes
            || self.index.size() >= self.config.max_index_bytes
    }

    /// Global offset of the segment's first record.
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Global offset the next appended record will receive.
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Shared handle onto the store file, for the sequential reader.
    pub(crate) fn store(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }

    /// Close the index (truncating its pre-grown tail), then the store.
    pub fn close(self) -> Result<()> {
        self.index.close()?;
        self.store.close()?;
        Ok(())
    }

    /// Close the segment and unlink both of its files.
    pub fn remove(self) -> Result<()> {
        let store_path = self.store_path.clone();
        let index_path = self.index_path.clone();

        self.close()?;
        std::fs::remove_file(index_path)?;
        std::fs::remove_file(store_path)?;
        Ok(())
    }
}
