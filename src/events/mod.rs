//! Events Module
//!
//! Live server-sent event stream: the event value and its framing, id
//! generation, and the broadcast point subscribers attach to.

mod event;
mod id;
mod stream;

pub use event::SseEvent;
pub use id::EventIdGenerator;
pub use stream::{CloseReason, EventStream, SubscriberState, Subscription};

/// `event:` tag carried by the periodic producer
pub const UPDATE_EVENT: &str = "update";
