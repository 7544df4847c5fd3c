//! Event id generation.

use std::time::Instant;

use rand::{distributions::Alphanumeric, Rng};

/// Length of the random per-launch tag
const LAUNCH_TAG_LEN: usize = 10;

// == Event Id Generator ==
/// Produces ids of the form `id_<tag>_<micros>`.
///
/// `tag` is random per launch so ids stay unique across restarts that share a
/// clock; `micros` is the time since launch and strictly increases between
/// calls on the same generator.
#[derive(Debug)]
pub struct EventIdGenerator {
    launched: Instant,
    tag: String,
    last_micros: Option<u128>,
}

impl EventIdGenerator {
    pub fn new() -> Self {
        let tag = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(LAUNCH_TAG_LEN)
            .map(char::from)
            .collect();

        Self {
            launched: Instant::now(),
            tag,
            last_micros: None,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn next_id(&mut self) -> String {
        let elapsed = self.launched.elapsed().as_micros();
        let micros = match self.last_micros {
            Some(last) if elapsed <= last => last + 1,
            _ => elapsed,
        };
        self.last_micros = Some(micros);

        format!("id_{}_{}", self.tag, micros)
    }
}

impl Default for EventIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
