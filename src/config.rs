//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::cache::{DEFAULT_ENTRY_TTL_SECS, DEFAULT_MAX_BLOB_SIZE, DEFAULT_MAX_ENTRIES};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Idle TTL in seconds after which an entry is treated as absent
    pub entry_ttl: u64,
    /// Per-item upload ceiling in bytes (inclusive)
    pub max_blob_size: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Delay between produced events in milliseconds
    pub event_interval_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `ENTRY_TTL` - Idle TTL in seconds (default: 600)
    /// - `MAX_BLOB_SIZE` - Per-item byte ceiling (default: 10000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    /// - `EVENT_INTERVAL_MS` - Event producer period in milliseconds (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            entry_ttl: env_or("ENTRY_TTL", defaults.entry_ttl),
            max_blob_size: env_or("MAX_BLOB_SIZE", defaults.max_blob_size),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            event_interval_ms: env_or("EVENT_INTERVAL_MS", defaults.event_interval_ms),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            entry_ttl: DEFAULT_ENTRY_TTL_SECS,
            max_blob_size: DEFAULT_MAX_BLOB_SIZE,
            server_port: 3000,
            cleanup_interval: 60,
            event_interval_ms: 1000,
        }
    }
}
