//! Sequential reader over the whole log

use crate::store::Store;
use std::io::{self, Read};
use std::sync::Arc;

/// Reads the concatenated store files of every segment, oldest first,
/// starting at byte 0 of each.
///
/// The stream is the log's on-disk representation: a run of length-prefixed
/// records. Snapshot and replication callers consume it as-is. The reader
/// holds shared handles onto the stores it captured, so it keeps working
/// even if a concurrent truncation unlinks the files underneath it; records
/// appended after construction may or may not be observed.
pub struct LogReader {
    stores: Vec<Arc<Store>>,
    current: usize,
    pos: u64,
}

impl LogReader {
    pub(crate) fn new(stores: Vec<Arc<Store>>) -> Self {
        Self {
            stores,
            current: 0,
            pos: 0,
        }
    }
}

impl Read for LogReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while let Some(store) = self.stores.get(self.current) {
            let n = store
                .read_at(buf, self.pos)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            if n > 0 {
                self.pos += n as u64;
                return Ok(n);
            }

            // Exhausted this store; move to the next segment
            self.current += 1;
            self.pos = 0;
        }

        Ok(0)
    }
}
