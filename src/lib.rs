//! EZ Cache - A small blob cache server with a live event stream
//!
//! Stores named blobs in a bounded in-memory cache with idle-TTL expiration
//! and LRU eviction, and pushes periodic server-sent events to subscribers.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::{spawn_cleanup_task, spawn_event_producer};
