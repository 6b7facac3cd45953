//! Tidelog Core - Append-Only Commit Log Storage Engine
//!
//! A disk-backed commit log that persists an ordered sequence of opaque
//! binary records, assigns each record a monotonically increasing 64-bit
//! offset, and serves random-access reads by offset.
//!
//! # Architecture
//!
//! The log is built from four layers, leaves first:
//!
//! - **Store**: length-prefixed record file with buffered appends
//! - **Index**: memory-mapped, fixed-width map from a segment-relative
//!   offset to a byte position in the store
//! - **Segment**: one store plus one index sharing a base offset
//! - **Log**: ordered segments; appends go to the active (newest) segment,
//!   reads go to the covering one, and full segments roll over into new ones

pub mod index;
pub mod log;
pub mod segment;
pub mod store;

mod error;
mod types;

pub use error::{LogError, Result};
pub use log::{Log, LogConfig, LogReader};
pub use segment::SegmentConfig;
pub use types::Record;

/// Tidelog version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Store size cap substituted when the config leaves it at zero.
    /// Sized for tests; production deployments configure their own.
    pub const MAX_STORE_BYTES: u64 = 1024;

    /// Index size cap substituted when the config leaves it at zero.
    pub const MAX_INDEX_BYTES: u64 = 1024;
}
