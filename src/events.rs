//! Inbound event queue.
//!
//! The MQTT receive thread and the console reader thread produce events;
//! the main loop consumes them one at a time, in arrival order. A full
//! queue stalls the producer until the loop catches up; nothing is dropped.
//!
//! ```text
//! ┌──────────────┐
//! │ MQTT thread  │────▶┌──────────────┐     ┌──────────────┐
//! │              │     │ EVENT_CHANNEL│────▶│  Main Loop   │
//! │ Console      │────▶│ (bounded)    │     │  (consumer)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use heapless::{String, Vec};
use log::debug;

use crate::config::set_truncated;

/// Inbound payloads are cut to this many bytes.
pub const MAX_PAYLOAD_LEN: usize = 99;

/// Longest topic accepted from the broker. Longer ones are dropped, never
/// truncated.
pub const MAX_TOPIC_LEN: usize = 128;

/// Longest console line kept.
pub const MAX_LINE_LEN: usize = 200;

pub const EVENT_QUEUE_DEPTH: usize = 8;

/// Producer back-off while the queue is full.
const QUEUE_RETRY_MS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A message arrived on a subscribed topic.
    MessageReceived {
        topic: String<MAX_TOPIC_LEN>,
        payload: Vec<u8, MAX_PAYLOAD_LEN>,
    },
    /// A complete line was typed on the serial console.
    ConsoleLine(String<MAX_LINE_LEN>),
    /// The broker session is up and subscriptions were sent.
    BrokerConnected,
    BrokerDisconnected,
}

impl Event {
    /// Copy an inbound MQTT message into a bounded event. `None` if the
    /// topic is too long.
    pub fn message(topic: &str, payload: &[u8]) -> Option<Self> {
        let topic = String::try_from(topic).ok()?;
        let end = payload.len().min(MAX_PAYLOAD_LEN);
        let payload = Vec::from_slice(&payload[..end]).ok()?;
        Some(Self::MessageReceived { topic, payload })
    }

    pub fn console_line(line: &str) -> Self {
        let mut s = String::new();
        set_truncated(&mut s, line);
        Self::ConsoleLine(s)
    }
}

/// Producer threads → main loop.
pub static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_DEPTH> =
    Channel::new();

/// Queue an event, waiting for room if the loop is behind. Producer
/// threads only; the loop itself must never call this.
pub fn push_event(mut event: Event) {
    let mut stalled = false;
    loop {
        match EVENT_CHANNEL.try_send(event) {
            Ok(()) => return,
            Err(TrySendError::Full(back)) => {
                if !stalled {
                    debug!("Event queue full, waiting");
                    stalled = true;
                }
                event = back;
                std::thread::sleep(std::time::Duration::from_millis(QUEUE_RETRY_MS));
            }
        }
    }
}

/// Pop the next event, if any. Main loop only.
pub fn next_event() -> Option<Event> {
    EVENT_CHANNEL.try_receive().ok()
}

/// Discard everything pending.
pub fn clear_events() {
    EVENT_CHANNEL.clear();
}
