//! LRU Module
//!
//! Logical access clock and victim selection for least-recently-used eviction.

use std::sync::atomic::{AtomicU64, Ordering};

// == Access Clock ==
/// Hands out strictly increasing access ticks.
///
/// Wall-clock milliseconds are too coarse to order accesses that land in the
/// same millisecond, so recency is ordered by these ticks instead.
#[derive(Debug)]
pub struct AccessClock {
    next: AtomicU64,
}

impl AccessClock {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    // == Tick ==
    /// Returns a tick greater than every tick returned before.
    pub fn tick(&self) -> u64 {
        self.next.fetch_add(1, Ordering::AcqRel)
    }
}

impl Default for AccessClock {
    fn default() -> Self {
        Self::new()
    }
}

// == Recency ==
/// Ordering key of an entry for eviction: least recently accessed first,
/// earliest write first among ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Recency {
    pub access_tick: u64,
    pub written_at: i64,
}

// == Least Recently Used ==
/// Picks the eviction victim among `(key, recency)` candidates.
///
/// Returns None if there are no candidates.
pub fn least_recently_used<I, K>(candidates: I) -> Option<K>
where
    I: IntoIterator<Item = (K, Recency)>,
{
    candidates
        .into_iter()
        .min_by_key(|(_, recency)| *recency)
        .map(|(key, _)| key)
}
