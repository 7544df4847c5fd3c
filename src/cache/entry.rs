//! Cache Entry Module
//!
//! Defines the structure for individual blob entries with access tracking.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

// == Cache Entry ==
/// Represents a single stored blob with its metadata.
///
/// `content`, `size` and `written_at` are fixed at creation. The access
/// stamps are atomics so a read can refresh them while only holding a shared
/// reference to the entry.
#[derive(Debug)]
pub struct CacheEntry {
    /// The stored bytes
    content: Bytes,
    /// Byte length of `content`
    size: usize,
    /// Write timestamp (Unix milliseconds)
    written_at: i64,
    /// Monotonic milliseconds of the last access, relative to the store epoch
    last_accessed_ms: AtomicU64,
    /// Logical access tick, strictly increasing across the store
    access_tick: AtomicU64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry. A write counts as an access.
    ///
    /// # Arguments
    /// * `content` - The blob payload
    /// * `now_ms` - Current store-relative monotonic time
    /// * `tick` - Logical access tick for LRU ordering
    pub fn new(content: Bytes, now_ms: u64, tick: u64) -> Self {
        Self {
            size: content.len(),
            content,
            written_at: current_timestamp_ms(),
            last_accessed_ms: AtomicU64::new(now_ms),
            access_tick: AtomicU64::new(tick),
        }
    }

    /// Returns a cheap immutable view of the stored bytes.
    pub fn content(&self) -> Bytes {
        self.content.clone()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn written_at(&self) -> i64 {
        self.written_at
    }

    pub fn access_tick(&self) -> u64 {
        self.access_tick.load(Ordering::Acquire)
    }

    // == Touch ==
    /// Records a full access (read or write).
    pub fn touch(&self, now_ms: u64, tick: u64) {
        self.last_accessed_ms.fetch_max(now_ms, Ordering::AcqRel);
        self.access_tick.fetch_max(tick, Ordering::AcqRel);
    }

    // == Is Expired ==
    /// Checks whether the entry has been idle for at least `ttl_ms`.
    ///
    /// Boundary condition: once the full TTL has elapsed since the last
    /// access, the entry is expired.
    pub fn is_expired(&self, now_ms: u64, ttl_ms: u64) -> bool {
        let last = self.last_accessed_ms.load(Ordering::Acquire);
        now_ms.saturating_sub(last) >= ttl_ms
    }

    /// Milliseconds left before the entry expires, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64, ttl_ms: u64) -> u64 {
        let idle = now_ms.saturating_sub(self.last_accessed_ms.load(Ordering::Acquire));
        ttl_ms.saturating_sub(idle)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
