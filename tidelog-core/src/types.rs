//! Record type and its wire encoding

use crate::{LogError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Width of the record header: offset plus value length.
const HEADER_LEN: usize = 12;

/// A single log record: an opaque payload plus its offset in the log.
///
/// The offset is assigned by the engine when the record is appended; any
/// value set by the caller is overwritten. Payload bytes are never
/// inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Opaque payload
    pub value: Bytes,
    /// Position of the record in the log, assigned at append time
    pub offset: u64,
}

impl Record {
    /// Create a record from a payload. The offset is stamped on append.
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self {
            value: value.into(),
            offset: 0,
        }
    }

    /// Serialize the record.
    ///
    /// Format:
    /// - 8 bytes: offset (big-endian)
    /// - 4 bytes: value length (big-endian)
    /// - N bytes: value
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.value.len());
        buf.put_u64(self.offset);
        buf.put_u32(self.value.len() as u32);
        buf.put_slice(&self.value);
        buf.freeze()
    }

    /// Deserialize a record, validating its framing.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(LogError::InvalidFormat("record too short".into()));
        }

        let mut cursor = data;
        let offset = cursor.get_u64();
        let len = cursor.get_u32() as usize;

        if cursor.remaining() != len {
            return Err(LogError::InvalidFormat(format!(
                "value length mismatch: header says {}, got {}",
                len,
                cursor.remaining()
            )));
        }

        Ok(Self {
            value: Bytes::copy_from_slice(cursor),
            offset,
        })
    }
}
