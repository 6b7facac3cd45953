//! Append-only store file
//!
//! Holds the raw record data of one segment. Every record is written as an
//! 8-byte big-endian length prefix followed by the payload bytes; the byte
//! position of the prefix is what the segment persists in its index.
//! Appends go through a buffered writer to amortize syscall cost, so the
//! read paths flush that buffer before touching the file.

use crate::Result;
use bytes::Bytes;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::os::unix::fs::FileExt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Width of the length prefix preceding every stored record.
pub(crate) const LEN_WIDTH: u64 = 8;

/// Append-only, length-prefixed record file.
///
/// ## Concurrency:
/// - Appends and flushes are serialized by the writer mutex
/// - Reads are positional (`pread`) on an independent handle and run in
///   parallel once the flush is done
/// - `size` is only mutated under the writer mutex
pub struct Store {
    /// Append side; also serializes flushes issued by the read paths
    writer: Mutex<BufWriter<File>>,

    /// Handle for positional reads; never disturbs the append position
    reader: File,

    /// Logical size in bytes, counting data still in the write buffer
    size: AtomicU64,
}

impl Store {
    /// Adopt an open file, picking up any bytes it already holds.
    pub fn new(file: File) -> Result<Self> {
        let size = file.metadata()?.len();
        let reader = file.try_clone()?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            reader,
            size: AtomicU64::new(size),
        })
    }

    /// Append a length-prefixed record.
    ///
    /// Returns the number of bytes written (prefix included) and the byte
    /// position of the record's length prefix.
    pub fn append(&self, p: &[u8]) -> Result<(u64, u64)> {
        let mut writer = self.writer.lock();

        let pos = self.size.load(Ordering::Acquire);
        writer.write_all(&(p.len() as u64).to_be_bytes())?;
        writer.write_all(p)?;

        let written = LEN_WIDTH + p.len() as u64;
        self.size.store(pos + written, Ordering::Release);

        Ok((written, pos))
    }

    /// Read the record whose length prefix starts at `pos`.
    pub fn read(&self, pos: u64) -> Result<Bytes> {
        self.flush()?;

        let mut len_buf = [0u8; LEN_WIDTH as usize];
        self.reader.read_exact_at(&mut len_buf, pos)?;

        let len = u64::from_be_bytes(len_buf);
        let mut data = vec![0u8; len as usize];
        self.reader.read_exact_at(&mut data, pos + LEN_WIDTH)?;

        Ok(Bytes::from(data))
    }

    /// Positional read into a caller-supplied buffer.
    ///
    /// Returns the number of bytes read; 0 past the end of the file.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.flush()?;
        Ok(self.reader.read_at(buf, offset)?)
    }

    /// Logical size, including buffered but unflushed bytes.
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    /// Flush buffered appends down to the file.
    pub fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    /// Flush and fsync. The descriptors themselves close on drop.
    pub fn close(&self) -> Result<()> {
        self.flush()?;
        self.reader.sync_all()?;
        Ok(())
    }
}
