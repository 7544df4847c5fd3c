//! Event Stream Module
//!
//! Single-producer broadcast of [`SseEvent`]s to any number of subscribers.
//!
//! Backed by a `tokio::sync::watch` channel: only the latest event is held,
//! so publishing never waits on a subscriber, and a subscriber that falls
//! behind skips straight to the newest event instead of queueing a backlog.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::SseEvent;

// == Subscriber State ==
/// Why a subscriber connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The subscriber went away
    Normal,
    /// The event source disappeared underneath the subscriber
    Error,
}

/// Lifecycle of one subscriber connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Connecting,
    Open,
    Closed(CloseReason),
}

/// Value held by the watch channel.
#[derive(Debug, Default)]
struct Broadcast {
    latest: Option<Arc<SseEvent>>,
    closed: bool,
}

struct Shared {
    sender: watch::Sender<Broadcast>,
    next_subscriber: AtomicU64,
}

// == Event Stream ==
/// Shared broadcast point. Cloning yields another handle to the same stream.
#[derive(Clone)]
pub struct EventStream {
    shared: Arc<Shared>,
}

impl EventStream {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Broadcast::default());
        Self {
            shared: Arc::new(Shared {
                sender,
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    // == Publish ==
    /// Broadcasts `event` to every current subscriber.
    ///
    /// An event equal to the immediately preceding one is suppressed and
    /// `false` is returned, as it is after [`EventStream::close`]. Never blocks.
    pub fn publish(&self, event: SseEvent) -> bool {
        self.shared.sender.send_if_modified(|current| {
            if current.closed || current.latest.as_deref() == Some(&event) {
                return false;
            }
            current.latest = Some(Arc::new(event));
            true
        })
    }

    // == Close ==
    /// Ends every subscription, current and future. Used on shutdown so that
    /// open connections finish instead of holding the server up.
    pub fn close(&self) {
        self.shared.sender.send_if_modified(|current| {
            let was_open = !current.closed;
            current.closed = true;
            was_open
        });
    }

    pub fn is_closed(&self) -> bool {
        self.shared.sender.borrow().closed
    }

    // == Subscribe ==
    /// Registers a subscriber that receives events published from now on.
    pub fn subscribe(&self) -> Subscription {
        let id = self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let mut subscription = Subscription {
            id,
            state: SubscriberState::Connecting,
            receiver: self.shared.sender.subscribe(),
        };
        if self.is_closed() {
            subscription.close(CloseReason::Normal);
        } else {
            subscription.state = SubscriberState::Open;
            info!(subscriber = id, "event subscriber connected");
        }
        subscription
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.sender.receiver_count()
    }
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new()
    }
}

// == Subscription ==
/// Receiving end of one subscriber. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    state: SubscriberState,
    receiver: watch::Receiver<Broadcast>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SubscriberState {
        self.state
    }

    // == Receive ==
    /// Waits for the next event.
    ///
    /// If several events were published since the last call, only the newest
    /// is returned. Returns None once the subscription is closed, either
    /// because the stream was closed or because its source is gone.
    pub async fn recv(&mut self) -> Option<Arc<SseEvent>> {
        loop {
            if self.state != SubscriberState::Open {
                return None;
            }

            if self.receiver.changed().await.is_err() {
                self.close(CloseReason::Error);
                return None;
            }

            let (latest, closed) = {
                let current = self.receiver.borrow_and_update();
                (current.latest.clone(), current.closed)
            };
            if closed {
                self.close(CloseReason::Normal);
                return None;
            }
            if let Some(event) = latest {
                return Some(event);
            }
        }
    }

    /// Converts the subscription into a stream of events.
    pub fn into_stream(self) -> impl Stream<Item = Arc<SseEvent>> + Send + 'static {
        stream::unfold(self, |mut subscription| async move {
            let event = subscription.recv().await?;
            Some((event, subscription))
        })
    }

    fn close(&mut self, reason: CloseReason) {
        if let SubscriberState::Closed(_) = self.state {
            return;
        }
        self.state = SubscriberState::Closed(reason);
        match reason {
            CloseReason::Normal => info!(subscriber = self.id, "event subscriber disconnected"),
            CloseReason::Error => {
                warn!(subscriber = self.id, "event source closed, dropping subscriber")
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close(CloseReason::Normal);
        debug!(subscriber = self.id, "subscription released");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}
