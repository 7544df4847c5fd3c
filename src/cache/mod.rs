//! Cache Module
//!
//! Provides bounded in-memory blob storage with idle-TTL expiration and LRU eviction.

mod entry;
mod lru;
mod mime;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use mime::{content_type_of, DEFAULT_CONTENT_TYPE};
pub use stats::{CacheCounters, CacheStats};
pub use store::{CacheStore, PutReceipt};

// == Public Constants ==
/// Default maximum number of entries
pub const DEFAULT_MAX_ENTRIES: usize = 1_000;

/// Default idle TTL in seconds (10 minutes)
pub const DEFAULT_ENTRY_TTL_SECS: u64 = 600;

/// Default per-item byte ceiling
pub const DEFAULT_MAX_BLOB_SIZE: usize = 10_000;

/// Timestamp reported for keys that are absent or expired
pub const MISSING_TIMESTAMP: i64 = -1;
