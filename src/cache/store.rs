//! Cache Store Module
//!
//! Main cache engine combining sharded storage with LRU eviction and idle-TTL expiration.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::lru::{self, AccessClock, Recency};
use crate::cache::{CacheCounters, CacheEntry, CacheStats, DEFAULT_MAX_BLOB_SIZE, MISSING_TIMESTAMP};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Put Receipt ==
/// Result of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutReceipt {
    /// Stored byte count
    pub size: usize,
    /// Write timestamp (Unix milliseconds)
    pub written_at: i64,
}

// == Cache Store ==
/// Bounded blob storage with LRU eviction and idle-TTL support.
///
/// All operations take `&self`. Keys are spread over the shards of a
/// [`DashMap`], so operations on distinct keys do not serialize, while any
/// two operations on the same key are ordered by its shard lock. A brand-new
/// key first reserves one of `max_entries` slots with a compare-and-swap, so
/// the capacity bound stays exact under concurrency; only when no slot is free
/// does the insert take the admission lock and evict.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: DashMap<String, CacheEntry>,
    /// Logical clock ordering accesses for LRU
    clock: AccessClock,
    /// Performance statistics
    counters: CacheCounters,
    /// Slots held by present entries and by inserts in flight
    occupancy: AtomicUsize,
    /// Serializes eviction when the cache is full
    admission: Mutex<()>,
    /// Origin of the monotonic millisecond clock used for TTL
    epoch: Instant,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Idle time after which an entry is treated as absent
    ttl: Duration,
    /// Per-item byte ceiling (inclusive)
    max_blob_size: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and idle TTL.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold (at least 1)
    /// * `ttl` - Idle duration after which an entry expires
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            clock: AccessClock::new(),
            counters: CacheCounters::new(),
            occupancy: AtomicUsize::new(0),
            admission: Mutex::new(()),
            epoch: Instant::now(),
            max_entries: max_entries.max(1),
            ttl,
            max_blob_size: DEFAULT_MAX_BLOB_SIZE,
        }
    }

    /// Creates a CacheStore from the server configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_entries, Duration::from_secs(config.entry_ttl))
            .with_max_blob_size(config.max_blob_size)
    }

    /// Overrides the per-item byte ceiling.
    pub fn with_max_blob_size(mut self, max_blob_size: usize) -> Self {
        self.max_blob_size = max_blob_size;
        self
    }

    // == Put ==
    /// Stores or overwrites the blob for `key`.
    ///
    /// A write counts as an access. If `key` is new and the cache is at
    /// capacity, the least recently accessed entry is evicted first.
    ///
    /// # Errors
    /// * `InvalidArgument` - `key` is empty
    /// * `PayloadTooLarge` - `content` is longer than the per-item ceiling
    pub fn put(&self, key: &str, content: impl Into<Bytes>) -> Result<PutReceipt> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument(
                "Key cannot be empty".to_string(),
            ));
        }

        let content = content.into();
        if content.len() > self.max_blob_size {
            return Err(CacheError::PayloadTooLarge {
                limit: self.max_blob_size,
            });
        }

        let entry = CacheEntry::new(content, self.now_ms(), self.clock.tick());
        let receipt = PutReceipt {
            size: entry.size(),
            written_at: entry.written_at(),
        };

        if let Some(mut slot) = self.entries.get_mut(key) {
            *slot = entry;
        } else {
            self.admit(key.to_owned(), entry);
        }

        debug!(key, size = receipt.size, "blob stored");
        Ok(receipt)
    }

    // == Get ==
    /// Retrieves the blob stored under `key`.
    ///
    /// Returns None when the key was never set, was evicted, or has been idle
    /// past the TTL. A hit refreshes the entry's access time; an expired entry
    /// is purged on the spot.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let now = self.now_ms();
        let ttl_ms = self.ttl_ms();

        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now, ttl_ms) => {
                entry.touch(now, self.clock.tick());
                self.counters.record_hit();
                return Some(entry.content());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.purge_if_expired(key, now);
        }
        self.counters.record_miss();
        None
    }

    // == Timestamp ==
    /// Returns the write timestamp of `key`, or [`MISSING_TIMESTAMP`] when absent.
    ///
    /// This is a metadata probe: it never refreshes the entry's access time,
    /// so polling timestamps does not keep an idle entry alive.
    pub fn timestamp(&self, key: &str) -> i64 {
        let now = self.now_ms();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now, self.ttl_ms()) => entry.written_at(),
            _ => MISSING_TIMESTAMP,
        }
    }

    /// Batch form of [`CacheStore::timestamp`]. Repeated keys collapse.
    pub fn timestamps<I, K>(&self, keys: I) -> BTreeMap<String, i64>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter()
            .map(|key| {
                let key = key.as_ref();
                (key.to_owned(), self.timestamp(key))
            })
            .collect()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.now_ms();
        let ttl_ms = self.ttl_ms();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now, ttl_ms);
            if !keep {
                removed += 1;
            }
            keep
        });

        self.release_slots(removed);
        self.counters.record_expirations(removed as u64);
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entries.len())
    }

    // == Length ==
    /// Returns the number of physically present entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn max_blob_size(&self) -> usize {
        self.max_blob_size
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Admission ==
    /// Inserts a key that was absent.
    ///
    /// While the cache has room a slot is reserved without locking, so new
    /// keys are admitted in parallel. A full cache takes the admission lock
    /// and evicts least recently used entries until a slot is won.
    fn admit(&self, key: String, entry: CacheEntry) {
        if !self.try_reserve_slot() {
            let _admission = self.admission.lock();
            while !self.try_reserve_slot() {
                if !self.evict_least_recently_used() {
                    // Every slot belongs to an insert still in flight
                    std::thread::yield_now();
                }
            }
        }

        match self.entries.entry(key) {
            Entry::Occupied(mut slot) => {
                // Another first write of the same key got in before us
                slot.insert(entry);
                self.release_slots(1);
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
    }

    fn try_reserve_slot(&self) -> bool {
        self.occupancy
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.max_entries).then_some(used + 1)
            })
            .is_ok()
    }

    fn release_slots(&self, count: usize) {
        if count > 0 {
            self.occupancy.fetch_sub(count, Ordering::AcqRel);
        }
    }

    /// Returns false when there was nothing to evict.
    fn evict_least_recently_used(&self) -> bool {
        let Some(victim) = self.least_recently_used() else {
            return false;
        };
        if self.entries.remove(&victim).is_some() {
            self.release_slots(1);
            self.counters.record_eviction();
            debug!(key = %victim, "evicted least recently used entry");
        }
        true
    }

    fn least_recently_used(&self) -> Option<String> {
        lru::least_recently_used(self.entries.iter().map(|item| {
            let recency = Recency {
                access_tick: item.value().access_tick(),
                written_at: item.value().written_at(),
            };
            (item.key().clone(), recency)
        }))
    }

    fn purge_if_expired(&self, key: &str, now: u64) {
        let ttl_ms = self.ttl_ms();
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now, ttl_ms))
            .is_some()
        {
            self.release_slots(1);
            self.counters.record_expirations(1);
            debug!(key, "purged expired entry");
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn ttl_ms(&self) -> u64 {
        self.ttl.as_millis() as u64
    }
}
