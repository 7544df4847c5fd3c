//! Event Producer Task
//!
//! Process-scoped loop that emits one event per interval onto the shared stream.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::current_timestamp_ms;
use crate::events::{EventIdGenerator, EventStream, SseEvent, UPDATE_EVENT};

/// Spawns the single producer of the event stream.
///
/// Every `interval` it publishes `event: update` with a `demo data <epoch ms>`
/// payload and a fresh id. Subscribers never slow it down; the only
/// suspension point is the sleep between events.
pub fn spawn_event_producer(events: EventStream, interval: Duration) -> JoinHandle<()> {
    let mut ids = EventIdGenerator::new();

    tokio::spawn(async move {
        info!(
            launch_tag = ids.tag(),
            "Starting event producer with interval of {:?}", interval
        );

        loop {
            tokio::time::sleep(interval).await;

            let event = SseEvent::new(format!("demo data {}", current_timestamp_ms()))
                .with_event(UPDATE_EVENT)
                .with_id(ids.next_id());

            if events.publish(event) {
                debug!(
                    subscribers = events.subscriber_count(),
                    "event published"
                );
            } else {
                debug!("duplicate event suppressed");
            }
        }
    })
}
