//! Server-sent event value and the field values it puts on the wire.

use std::borrow::Cow;

// == SSE Event ==
/// One event pushed to subscribers.
///
/// Equality covers all three fields, so two events only compare equal when
/// data, type and id (or the absence of one) all match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Payload, may span several lines
    pub data: String,
    /// Optional `event:` tag
    pub event: Option<String>,
    /// Optional `id:` used by clients for resumption
    pub id: Option<String>,
}

impl SseEvent {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            event: None,
            id: None,
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    // == Wire Fields ==
    /// Payload with `\r\n` and lone `\r` line breaks turned into `\n`, so
    /// that every line becomes its own `data:` field.
    pub fn normalized_data(&self) -> Cow<'_, str> {
        if self.data.contains('\r') {
            Cow::Owned(self.data.replace("\r\n", "\n").replace('\r', "\n"))
        } else {
            Cow::Borrowed(&self.data)
        }
    }

    /// `event:` value, reduced to a single line.
    pub fn event_type(&self) -> Option<Cow<'_, str>> {
        self.event.as_deref().map(single_line)
    }

    /// `id:` value, reduced to a single line.
    pub fn event_id(&self) -> Option<Cow<'_, str>> {
        self.id.as_deref().map(single_line)
    }
}

/// Drops line breaks, which would end the field early and let the value
/// smuggle in fields of its own, and NUL, which ids may not carry.
fn single_line(value: &str) -> Cow<'_, str> {
    let is_forbidden = |c: char| matches!(c, '\r' | '\n' | '\0');
    if value.contains(is_forbidden) {
        Cow::Owned(value.chars().filter(|c| !is_forbidden(*c)).collect())
    } else {
        Cow::Borrowed(value)
    }
}
