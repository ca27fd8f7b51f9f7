//! `key=value` configuration commands.
//!
//! One line arrives from the serial console or as a payload on the command
//! topic. [`CommandProcessor::apply`] parses it, writes the value into the
//! settings record (truncated or clamped to fit) and reports whether a
//! restart is needed for the change to take effect.

use log::{debug, info};

use crate::app::ports::ConfigPort;
use crate::config::{MAX_NOTE_LENGTH_MS, MAX_OCTAVE, MAX_VOLUME, SlotId, set_truncated};
use crate::settings::{SaveOutcome, SettingsStore};

/// Value the pseudo-commands insist on.
const CONFIRM: &str = "yes";

// ───────────────────────────────────────────────────────────────
// Keys
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Ssid,
    WifiPass,
    Broker,
    BrokerPort,
    UserName,
    UserPass,
    LwtMessage,
    Topic(SlotId),
    Message(SlotId),
    Description(SlotId),
    Pattern(SlotId),
    CommandTopic,
    GmtOffset,
    Volume,
    Debug,
    NoteLength,
    Octave,
    ResetMqttId,
    FactoryDefaults,
    Reset,
}

impl Key {
    /// Exact, case-sensitive match.
    pub fn parse(name: &str) -> Option<Self> {
        let key = match name {
            "ssid" => Self::Ssid,
            "wifipass" => Self::WifiPass,
            "broker" => Self::Broker,
            "brokerPort" => Self::BrokerPort,
            "userName" => Self::UserName,
            "userPass" => Self::UserPass,
            "lwtMessage" => Self::LwtMessage,
            "commandTopic" => Self::CommandTopic,
            "gmtOffset" => Self::GmtOffset,
            "volume" => Self::Volume,
            "debug" => Self::Debug,
            "noteLength" => Self::NoteLength,
            "octave" => Self::Octave,
            "resetmqttid" => Self::ResetMqttId,
            "factorydefaults" => Self::FactoryDefaults,
            "reset" => Self::Reset,
            other => return Self::parse_slot_key(other),
        };
        Some(key)
    }

    /// `topic1` … `pattern4`.
    fn parse_slot_key(name: &str) -> Option<Self> {
        let split = name.len().checked_sub(1)?;
        if !name.is_char_boundary(split) {
            return None;
        }
        let (stem, digit) = name.split_at(split);
        let number = digit.parse::<u8>().ok()?;
        let slot = SlotId::new(number)?;
        match stem {
            "topic" => Some(Self::Topic(slot)),
            "message" => Some(Self::Message(slot)),
            "description" => Some(Self::Description(slot)),
            "pattern" => Some(Self::Pattern(slot)),
            _ => None,
        }
    }

    /// Applied at once, no restart needed.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            Self::GmtOffset | Self::Volume | Self::Debug | Self::NoteLength | Self::Octave
        )
    }

    fn is_pseudo(self) -> bool {
        matches!(self, Self::ResetMqttId | Self::FactoryDefaults | Self::Reset)
    }
}

// ───────────────────────────────────────────────────────────────
// Outcome
// ───────────────────────────────────────────────────────────────

/// A live setting that the caller has to push to its collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveChange {
    Debug(bool),
    GmtOffset(i32),
    Volume(i32),
    NoteLength(i32),
    Octave(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    pub key: Option<Key>,
    pub recognized: bool,
    pub restart_needed: bool,
    pub live_change: Option<LiveChange>,
    /// Set when the command went through a save.
    pub save: Option<SaveOutcome>,
    /// `factorydefaults=yes` wiped the record.
    pub factory_reset: bool,
}

impl CommandOutcome {
    fn unrecognized() -> Self {
        Self::default()
    }
}

// ───────────────────────────────────────────────────────────────
// Parsing helpers
// ───────────────────────────────────────────────────────────────

/// Drop up to two trailing CR/LF characters.
fn trim_line_end(s: &str) -> &str {
    let mut s = s;
    for _ in 0..2 {
        s = s.strip_suffix(|c: char| c == '\r' || c == '\n').unwrap_or(s);
    }
    s
}

/// Split `key=value` at the first `=`. `None` without an `=` or with an
/// empty key.
pub fn split_command(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = trim_line_end(key);
    let value = trim_line_end(value);
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Lenient integer parse: leading whitespace, optional sign, then as many
/// digits as there are. Anything unparseable is `0`; overflow saturates.
pub fn parse_int_lenient(s: &str) -> i32 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

// ───────────────────────────────────────────────────────────────
// Processor
// ───────────────────────────────────────────────────────────────

pub struct CommandProcessor;

impl CommandProcessor {
    /// Parse and apply one command line.
    ///
    /// An unrecognized line leaves the settings untouched; the caller shows
    /// the help text.
    pub fn apply<C: ConfigPort>(store: &mut SettingsStore<C>, line: &str) -> CommandOutcome {
        let Some((name, value)) = split_command(line) else {
            debug!("Command: no key=value in {:?}", line);
            return CommandOutcome::unrecognized();
        };
        let Some(key) = Key::parse(name) else {
            debug!("Command: unknown key {:?}", name);
            return CommandOutcome::unrecognized();
        };
        if key.is_pseudo() && value != CONFIRM {
            debug!("Command: {} needs \"{}\"", name, CONFIRM);
            return CommandOutcome::unrecognized();
        }

        info!("Command: {}={}", name, if is_secret(key) { "***" } else { value });

        let mut outcome = CommandOutcome {
            key: Some(key),
            recognized: true,
            restart_needed: !key.is_live(),
            ..Default::default()
        };

        match key {
            Key::Reset => return outcome,
            Key::FactoryDefaults => {
                outcome.save = Some(store.factory_reset());
                outcome.factory_reset = true;
                return outcome;
            }
            Key::ResetMqttId => store.regenerate_client_id(),
            _ => outcome.live_change = set_field(store, key, value),
        }

        let saved = store.save();
        outcome.restart_needed |= saved.reboot_required;
        outcome.save = Some(saved);
        outcome
    }
}

fn is_secret(key: Key) -> bool {
    matches!(key, Key::WifiPass | Key::UserPass)
}

/// Write `value` into the field named by `key`.
fn set_field<C: ConfigPort>(
    store: &mut SettingsStore<C>,
    key: Key,
    value: &str,
) -> Option<LiveChange> {
    let cfg = store.config_mut();
    match key {
        Key::Ssid => set_truncated(&mut cfg.ssid, value),
        Key::WifiPass => set_truncated(&mut cfg.wifi_password, value),
        Key::Broker => set_truncated(&mut cfg.broker_address, value),
        Key::BrokerPort => cfg.broker_port = parse_int_lenient(value),
        Key::UserName => set_truncated(&mut cfg.mqtt_username, value),
        Key::UserPass => set_truncated(&mut cfg.mqtt_password, value),
        Key::LwtMessage => set_truncated(&mut cfg.lwt_message, value),
        Key::CommandTopic => set_truncated(&mut cfg.command_topic, value),
        Key::Topic(id) => set_truncated(&mut cfg.slot_mut(id).topic, value),
        Key::Message(id) => set_truncated(&mut cfg.slot_mut(id).message, value),
        Key::Description(id) => set_truncated(&mut cfg.slot_mut(id).description, value),
        Key::Pattern(id) => set_truncated(&mut cfg.slot_mut(id).pattern, value),
        Key::GmtOffset => {
            cfg.gmt_offset = parse_int_lenient(value);
            return Some(LiveChange::GmtOffset(cfg.gmt_offset));
        }
        Key::Volume => {
            cfg.volume = parse_int_lenient(value).clamp(0, MAX_VOLUME);
            return Some(LiveChange::Volume(cfg.volume));
        }
        Key::NoteLength => {
            cfg.note_length_ms = parse_int_lenient(value).clamp(1, MAX_NOTE_LENGTH_MS);
            return Some(LiveChange::NoteLength(cfg.note_length_ms));
        }
        Key::Octave => {
            cfg.octave = parse_int_lenient(value).clamp(0, MAX_OCTAVE);
            return Some(LiveChange::Octave(cfg.octave));
        }
        Key::Debug => {
            cfg.debug = value != "false";
            return Some(LiveChange::Debug(cfg.debug));
        }
        Key::ResetMqttId | Key::FactoryDefaults | Key::Reset => {}
    }
    None
}
