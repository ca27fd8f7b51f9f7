//! Device configuration record.
//!
//! Everything the device needs to join the network and decide what to do
//! with an inbound message. The record is persisted as one blob and owned by
//! [`SettingsStore`](crate::settings::SettingsStore); nothing else mutates it.

use serde::{Deserialize, Serialize};

// --- Field bounds (bytes) ---
pub const SSID_SIZE: usize = 100;
pub const PASSWORD_SIZE: usize = 50;
pub const ADDRESS_SIZE: usize = 30;
pub const USERNAME_SIZE: usize = 50;
pub const CLIENT_ID_SIZE: usize = 25;
pub const TOPIC_SIZE: usize = 50;
pub const MESSAGE_SIZE: usize = 15;
/// One line of the 16x2 status display.
pub const DESCRIPTION_SIZE: usize = 16;
pub const PATTERN_SIZE: usize = 8;

/// Sentinel stored in `valid_config` once the record is complete.
pub const VALID_SETTINGS_FLAG: u16 = 0xDAB0;

pub const SLOT_COUNT: usize = 4;

pub const DEFAULT_BROKER_PORT: i32 = 1883;
pub const DEFAULT_TOPIC: &str = "esp8266/mqttListener/";
pub const DEFAULT_LWT_MESSAGE: &str = "stopped";
pub const CLIENT_ID_ROOT: &str = "mqttListener";
pub const DEFAULT_VOLUME: i32 = 5;
pub const DEFAULT_GMT_OFFSET: i32 = 0;
pub const DEFAULT_NOTE_LENGTH_MS: i32 = 250;
pub const DEFAULT_OCTAVE: i32 = 4;

pub const MAX_VOLUME: i32 = 10;
pub const MAX_OCTAVE: i32 = 8;
pub const MAX_NOTE_LENGTH_MS: i32 = 2000;

pub type Ssid = heapless::String<SSID_SIZE>;
pub type Secret = heapless::String<PASSWORD_SIZE>;
pub type Topic = heapless::String<TOPIC_SIZE>;
pub type Message = heapless::String<MESSAGE_SIZE>;
pub type ClientId = heapless::String<CLIENT_ID_SIZE>;

/// Replace the contents of `field` with the longest prefix of `value` that
/// fits. Never fails; the cut lands on a char boundary.
pub fn set_truncated<const N: usize>(field: &mut heapless::String<N>, value: &str) {
    field.clear();
    let mut end = value.len().min(N);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    // `end <= N`, so this cannot overflow.
    let _ = field.push_str(&value[..end]);
}

/// Build a bounded string from `value`, truncating if needed.
pub fn bounded<const N: usize>(value: &str) -> heapless::String<N> {
    let mut s = heapless::String::new();
    set_truncated(&mut s, value);
    s
}

// ───────────────────────────────────────────────────────────────
// Trigger slots
// ───────────────────────────────────────────────────────────────

/// 1-based trigger slot number as users see it (`topic1` … `topic4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(u8);

impl SlotId {
    /// `None` unless `number` is in `1..=SLOT_COUNT`.
    pub const fn new(number: u8) -> Option<Self> {
        if number >= 1 && number as usize <= SLOT_COUNT {
            Some(Self(number))
        } else {
            None
        }
    }

    pub const fn number(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Slots in evaluation order.
    pub fn all() -> impl Iterator<Item = SlotId> {
        (1..=SLOT_COUNT as u8).map(SlotId)
    }
}

impl core::fmt::Display for SlotId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One (pattern, expected payload, action) triple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSlot {
    /// Subscription pattern; may contain `+` and `#`.
    pub topic: Topic,
    /// Expected payload. `"*"` matches any payload.
    pub message: Message,
    /// Text shown on the display when the slot fires.
    pub description: heapless::String<DESCRIPTION_SIZE>,
    /// Hex tone pattern for the buzzer and speaker variants.
    pub pattern: heapless::String<PATTERN_SIZE>,
}

impl TriggerSlot {
    /// Payload value that matches anything on the slot's topic.
    pub const ANY_PAYLOAD: &'static str = "*";

    /// A slot missing either its pattern or its payload never matches.
    pub fn is_active(&self) -> bool {
        !self.topic.is_empty() && !self.message.is_empty()
    }

    pub fn accepts_payload(&self, payload: &str) -> bool {
        self.message.as_str() == payload || self.message.as_str() == Self::ANY_PAYLOAD
    }
}

// ───────────────────────────────────────────────────────────────
// Device configuration
// ───────────────────────────────────────────────────────────────

/// The persisted configuration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// `0` (incomplete) or [`VALID_SETTINGS_FLAG`]. Recomputed on every save.
    pub valid_config: u16,

    // --- Network ---
    pub ssid: Ssid,
    pub wifi_password: Secret,

    // --- Broker ---
    pub broker_address: heapless::String<ADDRESS_SIZE>,
    /// Kept as parsed; range is judged by the completeness check.
    pub broker_port: i32,
    pub mqtt_username: heapless::String<USERNAME_SIZE>,
    pub mqtt_password: Secret,
    pub client_id: ClientId,
    pub lwt_message: Message,
    pub command_topic: Topic,

    // --- Triggers ---
    pub slots: [TriggerSlot; SLOT_COUNT],

    // --- Live-adjustable ---
    pub debug: bool,
    /// Hours from GMT for displayed timestamps.
    pub gmt_offset: i32,
    /// Player volume 0-10.
    pub volume: i32,
    pub note_length_ms: i32,
    pub octave: i32,
}

impl Default for DeviceConfig {
    /// Compiled-in factory defaults. The client id is left empty; the
    /// settings store generates one before the record is first saved.
    fn default() -> Self {
        let mut slots: [TriggerSlot; SLOT_COUNT] = Default::default();
        slots[0].topic = bounded(DEFAULT_TOPIC);

        Self {
            valid_config: 0,
            ssid: Ssid::new(),
            wifi_password: Secret::new(),
            broker_address: heapless::String::new(),
            broker_port: DEFAULT_BROKER_PORT,
            mqtt_username: heapless::String::new(),
            mqtt_password: Secret::new(),
            client_id: ClientId::new(),
            lwt_message: bounded(DEFAULT_LWT_MESSAGE),
            command_topic: bounded(DEFAULT_TOPIC),
            slots,
            debug: false,
            gmt_offset: DEFAULT_GMT_OFFSET,
            volume: DEFAULT_VOLUME,
            note_length_ms: DEFAULT_NOTE_LENGTH_MS,
            octave: DEFAULT_OCTAVE,
        }
    }
}

impl DeviceConfig {
    pub fn slot(&self, id: SlotId) -> &TriggerSlot {
        &self.slots[id.index()]
    }

    pub fn slot_mut(&mut self, id: SlotId) -> &mut TriggerSlot {
        &mut self.slots[id.index()]
    }

    pub fn is_marked_valid(&self) -> bool {
        self.valid_config == VALID_SETTINGS_FLAG
    }

    /// Actuator tuning derived from the live fields, forced into range.
    pub fn tuning(&self) -> Tuning {
        Tuning {
            volume: self.volume.clamp(0, MAX_VOLUME) as u8,
            note_length_ms: self.note_length_ms.clamp(1, MAX_NOTE_LENGTH_MS) as u32,
            octave: self.octave.clamp(0, MAX_OCTAVE) as u8,
        }
    }

    /// Topics to subscribe to: the command topic, then each distinct
    /// non-empty slot topic.
    pub fn subscription_topics(&self) -> heapless::Vec<&str, { SLOT_COUNT + 1 }> {
        let mut topics: heapless::Vec<&str, { SLOT_COUNT + 1 }> = heapless::Vec::new();
        let _ = topics.push(self.command_topic.as_str());
        for slot in &self.slots {
            let t = slot.topic.as_str();
            if !t.is_empty() && !topics.contains(&t) {
                let _ = topics.push(t);
            }
        }
        topics
    }

    /// Retained topic the broker publishes the last will to.
    pub fn will_topic(&self) -> String {
        format!("{}/status", self.command_topic)
    }
}

/// Actuator parameters that can change without a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    pub volume: u8,
    pub note_length_ms: u32,
    pub octave: u8,
}

// ───────────────────────────────────────────────────────────────
// Variant profile
// ───────────────────────────────────────────────────────────────

/// Which actuator the firmware was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// DFPlayer Mini MP3 module plus 16x2 display.
    Mp3Display,
    /// Piezo buzzer playing on/off bit patterns.
    Buzzer,
    /// Speaker playing short melodies.
    Speaker,
}

/// Per-variant dispatch behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchProfile {
    /// Minimum gap between two accepted firings of one slot.
    pub cooldown_ms: u64,
    /// Keep a history ring and answer the `history` command.
    pub keep_history: bool,
    /// Answer a matched trigger with `"OK"`.
    pub ack_triggers: bool,
}

impl Variant {
    pub const fn profile(self) -> DispatchProfile {
        match self {
            Self::Mp3Display => DispatchProfile {
                cooldown_ms: 5_000,
                keep_history: true,
                ack_triggers: false,
            },
            Self::Buzzer => DispatchProfile {
                cooldown_ms: 10_000,
                keep_history: false,
                ack_triggers: true,
            },
            Self::Speaker => DispatchProfile {
                cooldown_ms: 4_000,
                keep_history: false,
                ack_triggers: false,
            },
        }
    }
}
