//! The log: an ordered collection of segments
//!
//! Appends always land in the active (newest) segment; once an append fills
//! that segment, a fresh one is rolled with the next offset as its base, so
//! segments stay contiguous. Reads locate the covering segment by a linear
//! scan, which is deliberate: segment counts stay in the tens to low
//! hundreds, and the sorted list already supports a binary search if that
//! ever changes.

mod reader;

pub use reader::LogReader;

use crate::segment::{Segment, SegmentConfig};
use crate::types::Record;
use crate::{LogError, Result};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Log configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory holding the segment files
    pub data_dir: PathBuf,
    /// Per-segment tunables
    pub segment: SegmentConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            segment: SegmentConfig::default(),
        }
    }
}

/// An append-only commit log made of contiguous segments.
///
/// ## Concurrency:
/// - `append`, `truncate`, `close`, `remove`, `reset` take the write lock
/// - `read`, `reader`, `lowest_offset`, `highest_offset` take the read lock
/// - The engine spawns no threads of its own; all parallelism is the
///   caller's
pub struct Log {
    config: LogConfig,
    segments: RwLock<Vec<Segment>>,
}

impl Log {
    /// Open the log in `config.data_dir`, rehydrating any segments already
    /// on disk. Size caps left at zero fall back to small test defaults.
    pub fn open(mut config: LogConfig) -> Result<Self> {
        if config.segment.max_store_bytes == 0 {
            config.segment.max_store_bytes = crate::defaults::MAX_STORE_BYTES;
        }
        if config.segment.max_index_bytes == 0 {
            config.segment.max_index_bytes = crate::defaults::MAX_INDEX_BYTES;
        }

        fs::create_dir_all(&config.data_dir)?;
        let segments = Self::load_segments(&config.data_dir, config.segment)?;

        info!(
            dir = %config.data_dir.display(),
            segments = segments.len(),
            "log opened"
        );

        Ok(Self {
            config,
            segments: RwLock::new(segments),
        })
    }

    /// Scan `dir` for segment files and rebuild the segment list, oldest
    /// first. An empty directory gets one segment at the initial offset.
    fn load_segments(dir: &Path, config: SegmentConfig) -> Result<Vec<Segment>> {
        let mut base_offsets = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            // Each segment contributes a store and an index file with the
            // same numeric stem; anything else in the directory is not ours
            if let Some(base) = entry
                .path()
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u64>().ok())
            {
                base_offsets.push(base);
            }
        }
        base_offsets.sort_unstable();
        base_offsets.dedup();

        let mut segments = Vec::with_capacity(base_offsets.len().max(1));
        for base in base_offsets {
            segments.push(Segment::new(dir, base, config)?);
        }
        if segments.is_empty() {
            segments.push(Segment::new(dir, config.initial_offset, config)?);
        }

        Ok(segments)
    }

    /// Append a record to the active segment.
    ///
    /// Returns the offset assigned to the record. If the append filled the
    /// segment, a fresh one is rolled immediately with `offset + 1` as its
    /// base, keeping segments contiguous even when the tipping record was
    /// the last that fit.
    pub fn append(&self, record: Record) -> Result<u64> {
        let mut segments = self.segments.write();
        let active = segments.last_mut().ok_or(LogError::Closed)?;

        let offset = active.append(record)?;
        if active.is_maxed() {
            debug!(base_offset = offset + 1, "rolling new segment");
            let segment = Segment::new(&self.config.data_dir, offset + 1, self.config.segment)?;
            segments.push(segment);
        }

        Ok(offset)
    }

    /// Read the record stored at `offset`.
    pub fn read(&self, offset: u64) -> Result<Record> {
        let segments = self.segments.read();
        if segments.is_empty() {
            return Err(LogError::Closed);
        }

        let segment = segments
            .iter()
            .find(|s| s.base_offset() <= offset && offset < s.next_offset())
            .ok_or(LogError::OffsetOutOfRange { offset })?;

        segment.read(offset)
    }

    /// Offset of the oldest record still in the log.
    pub fn lowest_offset(&self) -> u64 {
        let segments = self.segments.read();
        segments
            .first()
            .map(Segment::base_offset)
            .unwrap_or(self.config.segment.initial_offset)
    }

    /// Offset of the most recently appended record, or 0 for an empty log.
    pub fn highest_offset(&self) -> u64 {
        let segments = self.segments.read();
        let next = segments.last().map(Segment::next_offset).unwrap_or(0);
        next.saturating_sub(1)
    }

    /// Remove every segment whose records all lie below `lowest`.
    ///
    /// Called periodically by retention to reclaim disk from records that
    /// every consumer has moved past.
    pub fn truncate(&self, lowest: u64) -> Result<()> {
        let mut segments = self.segments.write();
        if segments.is_empty() {
            return Err(LogError::Closed);
        }

        let mut retained = Vec::with_capacity(segments.len());
        for segment in segments.drain(..) {
            if segment.next_offset() <= lowest {
                segment.remove()?;
            } else {
                retained.push(segment);
            }
        }

        // Truncating past the newest record leaves the log writable again
        // at the requested offset
        if retained.is_empty() {
            retained.push(Segment::new(
                &self.config.data_dir,
                lowest,
                self.config.segment,
            )?);
        }

        *segments = retained;
        info!(lowest, segments = segments.len(), "log truncated");
        Ok(())
    }

    /// Sequential reader over the raw store files of every segment.
    ///
    /// The concatenation is the log's full on-disk representation of
    /// length-prefixed records, in segment order, and is what snapshot and
    /// replication callers consume. The segment set is captured here;
    /// appends that land afterwards may or may not be observed.
    pub fn reader(&self) -> LogReader {
        let segments = self.segments.read();
        LogReader::new(segments.iter().map(|s| s.store()).collect())
    }

    /// Close every segment, flushing stores and truncating index files.
    ///
    /// Operations after close fail with `LogError::Closed`.
    pub fn close(&self) -> Result<()> {
        let mut segments = self.segments.write();
        for segment in segments.drain(..) {
            segment.close()?;
        }
        Ok(())
    }

    /// Close the log and delete its directory tree.
    pub fn remove(&self) -> Result<()> {
        let mut segments = self.segments.write();
        for segment in segments.drain(..) {
            segment.close()?;
        }
        fs::remove_dir_all(&self.config.data_dir)?;

        info!(dir = %self.config.data_dir.display(), "log removed");
        Ok(())
    }

    /// Remove the log, then set it up again from an empty directory.
    pub fn reset(&self) -> Result<()> {
        let mut segments = self.segments.write();
        for segment in segments.drain(..) {
            segment.close()?;
        }
        fs::remove_dir_all(&self.config.data_dir)?;
        fs::create_dir_all(&self.config.data_dir)?;

        *segments = Self::load_segments(&self.config.data_dir, self.config.segment)?;

        info!(dir = %self.config.data_dir.display(), "log reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ENTRY_WIDTH;
    use std::io::Read;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> LogConfig {
        LogConfig {
            data_dir: dir.path().to_path_buf(),
            segment: SegmentConfig::default(),
        }
    }

    /// Config sized so a segment holds exactly three index entries.
    fn three_entry_config(dir: &TempDir) -> LogConfig {
        LogConfig {
            data_dir: dir.path().to_path_buf(),
            segment: SegmentConfig {
                max_store_bytes: 1024,
                max_index_bytes: 3 * ENTRY_WIDTH,
                initial_offset: 0,
            },
        }
    }

    #[test]
    fn test_append_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(test_config(&dir)).unwrap();

        assert_eq!(log.append(Record::new("hello world")).unwrap(), 0);
        assert_eq!(log.append(Record::new("foo")).unwrap(), 1);
        assert_eq!(log.append(Record::new("")).unwrap(), 2);

        let record = log.read(1).unwrap();
        assert_eq!(record.value.as_ref(), b"foo");
        assert_eq!(record.offset, 1);

        assert_eq!(log.lowest_offset(), 0);
        assert_eq!(log.highest_offset(), 2);
    }

    #[test]
    fn test_read_out_of_range() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(test_config(&dir)).unwrap();

        let err = log.read(0).unwrap_err();
        assert!(err.is_out_of_range());
        match err {
            LogError::OffsetOutOfRange { offset } => assert_eq!(offset, 0),
            other => panic!("unexpected error: {other}"),
        }

        log.append(Record::new("only")).unwrap();
        assert!(log.read(1).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_segment_roll() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(three_entry_config(&dir)).unwrap();

        for i in 0..4 {
            assert_eq!(log.append(Record::new("hello world")).unwrap(), i);
        }

        // The fourth append landed in a freshly rolled segment
        assert_eq!(log.read(0).unwrap().offset, 0);
        assert_eq!(log.read(3).unwrap().offset, 3);

        for base in [0, 3] {
            assert!(dir.path().join(format!("{base}.store")).exists());
            assert!(dir.path().join(format!("{base}.index")).exists());
        }
    }

    #[test]
    fn test_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let log = Log::open(test_config(&dir)).unwrap();
            log.append(Record::new("hello world")).unwrap();
            log.append(Record::new("foo")).unwrap();
            log.append(Record::new("")).unwrap();
            log.close().unwrap();
        }

        let log = Log::open(test_config(&dir)).unwrap();
        assert_eq!(log.lowest_offset(), 0);
        assert_eq!(log.highest_offset(), 2);
        assert_eq!(log.read(0).unwrap().value.as_ref(), b"hello world");

        // Appends continue from the recovered next offset
        assert_eq!(log.append(Record::new("bar")).unwrap(), 3);
    }

    #[test]
    fn test_truncate() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(three_entry_config(&dir)).unwrap();

        for _ in 0..4 {
            log.append(Record::new("hello world")).unwrap();
        }

        log.truncate(3).unwrap();

        assert!(log.read(2).unwrap_err().is_out_of_range());
        assert_eq!(log.read(3).unwrap().offset, 3);
        assert_eq!(log.lowest_offset(), 3);
        assert!(!dir.path().join("0.store").exists());
    }

    #[test]
    fn test_truncate_everything_restarts_log() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(three_entry_config(&dir)).unwrap();

        for _ in 0..4 {
            log.append(Record::new("hello world")).unwrap();
        }

        log.truncate(100).unwrap();

        assert_eq!(log.lowest_offset(), 100);
        assert_eq!(log.append(Record::new("fresh")).unwrap(), 100);
    }

    #[test]
    fn test_sequential_reader() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(test_config(&dir)).unwrap();

        let payloads: [&[u8]; 3] = [b"hello world", b"foo", b""];
        let mut expected = Vec::new();
        for (i, payload) in payloads.iter().enumerate() {
            log.append(Record::new(*payload)).unwrap();

            let mut record = Record::new(*payload);
            record.offset = i as u64;
            let encoded = record.encode();
            expected.extend_from_slice(&(encoded.len() as u64).to_be_bytes());
            expected.extend_from_slice(&encoded);
        }

        let mut data = Vec::new();
        log.reader().read_to_end(&mut data).unwrap();
        assert_eq!(data, expected);

        // Byte-for-byte the single store file
        log.close().unwrap();
        assert_eq!(std::fs::read(dir.path().join("0.store")).unwrap(), expected);
    }

    #[test]
    fn test_reader_spans_segments() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(three_entry_config(&dir)).unwrap();

        for _ in 0..7 {
            log.append(Record::new("hello world")).unwrap();
        }

        let mut data = Vec::new();
        log.reader().read_to_end(&mut data).unwrap();

        // 7 records of 8 (prefix) + 12 (header) + 11 (payload) bytes each
        assert_eq!(data.len(), 7 * 31);
    }

    #[test]
    fn test_dense_offsets_across_rolls() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(three_entry_config(&dir)).unwrap();

        for i in 0..20u64 {
            let offset = log.append(Record::new(format!("record-{i}"))).unwrap();
            assert_eq!(offset, i);
        }

        for i in 0..20u64 {
            let record = log.read(i).unwrap();
            assert_eq!(record.offset, i);
            assert_eq!(record.value.as_ref(), format!("record-{i}").as_bytes());
        }
        assert_eq!(log.highest_offset(), 19);
    }

    #[test]
    fn test_initial_offset() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.segment.initial_offset = 10;

        let log = Log::open(config).unwrap();
        assert_eq!(log.append(Record::new("first")).unwrap(), 10);
        assert_eq!(log.lowest_offset(), 10);
        assert_eq!(log.highest_offset(), 10);
        assert_eq!(log.read(10).unwrap().value.as_ref(), b"first");
    }

    #[test]
    fn test_operations_after_close_fail() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(test_config(&dir)).unwrap();
        log.append(Record::new("data")).unwrap();
        log.close().unwrap();

        assert!(matches!(
            log.append(Record::new("late")),
            Err(LogError::Closed)
        ));
        assert!(matches!(log.read(0), Err(LogError::Closed)));
    }

    #[test]
    fn test_reset() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(test_config(&dir)).unwrap();

        for _ in 0..3 {
            log.append(Record::new("stale")).unwrap();
        }

        log.reset().unwrap();
        assert_eq!(log.highest_offset(), 0);
        assert!(log.read(0).unwrap_err().is_out_of_range());
        assert_eq!(log.append(Record::new("fresh")).unwrap(), 0);
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("log");
        let config = LogConfig {
            data_dir: data_dir.clone(),
            segment: SegmentConfig::default(),
        };

        let log = Log::open(config).unwrap();
        log.append(Record::new("doomed")).unwrap();

        log.remove().unwrap();
        assert!(!data_dir.exists());
    }
}
