//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals
//! - Event Producer: Publishes one event per interval to the event stream

mod cleanup;
mod producer;

pub use cleanup::spawn_cleanup_task;
pub use producer::spawn_event_producer;
