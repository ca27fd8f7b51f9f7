//! Settings store: owns the [`DeviceConfig`] record and its persistence.
//!
//! Every mutation ends in [`SettingsStore::save`], which recomputes the
//! validity sentinel and reports whether the record just became usable.
//!
//! ```text
//!   INCOMPLETE ──save (now complete)──▶ COMPLETE   reboot_required = true
//!   COMPLETE   ──save (still complete)─▶ COMPLETE   reboot_required = false
//!   COMPLETE   ──save (broken field)───▶ INCOMPLETE reboot_required = false
//! ```

use core::fmt::Write;
use core::net::Ipv4Addr;

use log::{info, warn};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::{
    CLIENT_ID_ROOT, ClientId, DeviceConfig, MAX_NOTE_LENGTH_MS, MAX_OCTAVE, MAX_VOLUME, SlotId,
    VALID_SETTINGS_FLAG, set_truncated,
};
use crate::tone;

/// Result of one [`SettingsStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    /// The record passed the completeness check and carries the sentinel.
    pub valid_config: bool,
    /// The record went from incomplete to complete with this save.
    pub reboot_required: bool,
    /// The storage backend accepted the write.
    pub persisted: bool,
}

/// First reason `cfg` is not usable, or `None` if it is complete.
pub fn incomplete_reason(cfg: &DeviceConfig) -> Option<&'static str> {
    let slot1 = &cfg.slots[0];
    if cfg.ssid.is_empty() {
        return Some("ssid missing");
    }
    if cfg.wifi_password.is_empty() {
        return Some("wifi password missing");
    }
    if cfg.broker_address.is_empty() {
        return Some("broker address missing");
    }
    if cfg.lwt_message.is_empty() {
        return Some("LWT message missing");
    }
    if slot1.topic.is_empty() || slot1.message.is_empty() {
        return Some("topic1/message1 missing");
    }
    if cfg.command_topic.is_empty() {
        return Some("command topic missing");
    }
    if !(1..65535).contains(&cfg.broker_port) {
        return Some("broker port out of range");
    }
    if !(-23..=23).contains(&cfg.gmt_offset) {
        return Some("GMT offset out of range");
    }
    if !(0..=MAX_VOLUME).contains(&cfg.volume) {
        return Some("volume out of range");
    }
    if !(0..=MAX_OCTAVE).contains(&cfg.octave) {
        return Some("octave out of range");
    }
    if !(1..=MAX_NOTE_LENGTH_MS).contains(&cfg.note_length_ms) {
        return Some("note length out of range");
    }
    let bad_pattern = cfg
        .slots
        .iter()
        .any(|s| !s.pattern.is_empty() && tone::validate(&s.pattern).is_err());
    if bad_pattern {
        return Some("unparseable tone pattern");
    }
    None
}

/// `true` when every required field is present and in range.
///
/// Field length bounds hold by construction: every string is a bounded
/// `heapless::String`.
pub fn is_complete(cfg: &DeviceConfig) -> bool {
    incomplete_reason(cfg).is_none()
}

/// A stored record is only trusted when its sentinel and port are sane.
fn passes_sanity_check(cfg: &DeviceConfig) -> bool {
    (cfg.valid_config == 0 || cfg.valid_config == VALID_SETTINGS_FLAG)
        && (0..=65535).contains(&cfg.broker_port)
}

pub struct SettingsStore<C: ConfigPort> {
    config: DeviceConfig,
    port: C,
    /// Completeness at the last save (or at load).
    was_complete: bool,
    rng: SmallRng,
}

impl<C: ConfigPort> SettingsStore<C> {
    /// Load the stored record, falling back to factory defaults when none
    /// exists or it fails the sanity check. `seed` feeds client id
    /// generation.
    pub fn load(port: C, seed: u64) -> Self {
        let mut store = Self {
            config: DeviceConfig::default(),
            port,
            was_complete: false,
            rng: SmallRng::seed_from_u64(seed),
        };

        match store.port.load() {
            Ok(cfg) if passes_sanity_check(&cfg) => {
                info!("Settings: loaded stored record");
                store.was_complete = cfg.is_marked_valid();
                store.config = cfg;
                if store.config.client_id.is_empty() {
                    store.regenerate_client_id();
                    store.save();
                }
            }
            Ok(_) => {
                warn!("Settings: stored record failed sanity check, using defaults");
                store.factory_reset();
            }
            Err(ConfigError::NotFound) => {
                info!("Settings: nothing stored, initialising defaults");
                store.factory_reset();
            }
            Err(e) => {
                warn!("Settings: load failed ({}), using defaults", e);
                store.factory_reset();
            }
        }
        store
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Mutable access for [`CommandProcessor`](crate::app::commands::CommandProcessor).
    /// Changes are not persisted until [`save`](Self::save).
    pub fn config_mut(&mut self) -> &mut DeviceConfig {
        &mut self.config
    }

    pub fn port(&self) -> &C {
        &self.port
    }

    pub fn is_valid(&self) -> bool {
        self.config.is_marked_valid()
    }

    /// Recompute the sentinel and persist.
    pub fn save(&mut self) -> SaveOutcome {
        if self.config.client_id.is_empty() {
            self.regenerate_client_id();
        }

        let reason = incomplete_reason(&self.config);
        let complete = reason.is_none();
        self.config.valid_config = if complete { VALID_SETTINGS_FLAG } else { 0 };
        if let Some(r) = reason {
            info!("Settings: incomplete ({})", r);
        }

        let reboot_required = complete && !self.was_complete;
        self.was_complete = complete;

        let persisted = match self.port.save(&self.config) {
            Ok(()) => true,
            Err(e) => {
                warn!("Settings: persist failed: {}", e);
                false
            }
        };

        SaveOutcome {
            valid_config: complete,
            reboot_required,
            persisted,
        }
    }

    /// Restore compiled-in defaults with a fresh client id and persist.
    pub fn factory_reset(&mut self) -> SaveOutcome {
        self.config = DeviceConfig::default();
        self.regenerate_client_id();
        self.save()
    }

    /// `mqttListener` followed by up to four random hex digits.
    pub fn regenerate_client_id(&mut self) {
        let mut id = ClientId::new();
        let suffix = self.rng.next_u32() & 0xffff;
        let _ = write!(id, "{}{:X}", CLIENT_ID_ROOT, suffix);
        set_truncated(&mut self.config.client_id, &id);
        info!("Settings: client id is now {}", self.config.client_id);
    }

    /// `key=value` lines of every setting, answered to the `settings`
    /// command. Pure; two calls return the same text.
    pub fn render_dump(&self, ip: Ipv4Addr) -> String {
        let c = &self.config;
        let mut out = String::with_capacity(768);
        let _ = writeln!(out, "\nssid={}", c.ssid);
        let _ = writeln!(out, "wifipass={}", c.wifi_password);
        let _ = writeln!(out, "broker={}", c.broker_address);
        let _ = writeln!(out, "brokerPort={}", c.broker_port);
        let _ = writeln!(out, "userName={}", c.mqtt_username);
        let _ = writeln!(out, "userPass={}", c.mqtt_password);
        for id in SlotId::all() {
            let _ = writeln!(out, "topic{}={}", id, c.slot(id).topic);
        }
        let _ = writeln!(out, "lwtMessage={}", c.lwt_message);
        for id in SlotId::all() {
            let _ = writeln!(out, "message{}={}", id, c.slot(id).message);
        }
        for id in SlotId::all() {
            let _ = writeln!(out, "description{}={}", id, c.slot(id).description);
        }
        for id in SlotId::all() {
            let _ = writeln!(out, "pattern{}={}", id, c.slot(id).pattern);
        }
        let _ = writeln!(out, "gmtOffset={}", c.gmt_offset);
        let _ = writeln!(out, "volume={}", c.volume);
        let _ = writeln!(out, "noteLength={}", c.note_length_ms);
        let _ = writeln!(out, "octave={}", c.octave);
        let _ = writeln!(out, "debug={}", c.debug);
        let _ = writeln!(out, "commandTopic={}", c.command_topic);
        let _ = writeln!(out, "MQTT client ID={}", c.client_id);
        let _ = write!(out, "IP Address={}", ip);
        out
    }

    /// Console help: every command with its current value.
    pub fn render_help(&self, ip: Ipv4Addr) -> String {
        let c = &self.config;
        let mut out = String::with_capacity(2048);
        let _ = writeln!(out, "ssid=<wifi ssid> ({})", c.ssid);
        let _ = writeln!(out, "wifipass=<wifi password> ({})", c.wifi_password);
        let _ = writeln!(out, "broker=<address of MQTT broker> ({})", c.broker_address);
        let _ = writeln!(out, "brokerPort=<port number MQTT broker> ({})", c.broker_port);
        let _ = writeln!(out, "userName=<user ID for MQTT broker> ({})", c.mqtt_username);
        let _ = writeln!(out, "userPass=<user password for MQTT broker> ({})", c.mqtt_password);
        for id in SlotId::all() {
            let s = c.slot(id);
            let _ = writeln!(out, "topic{id}=<MQTT topic for which to subscribe> ({})", s.topic);
            let _ = writeln!(out, "message{id}=<a message for topic {id}> ({})", s.message);
            let _ = writeln!(
                out,
                "description{id}=<what to display when message{id} is received> ({})",
                s.description
            );
            let _ = writeln!(out, "pattern{id}=<hex tone pattern for message{id}> ({})", s.pattern);
        }
        let _ = writeln!(
            out,
            "lwtMessage=<status message to send when power is removed> ({})",
            c.lwt_message
        );
        let _ = writeln!(
            out,
            "commandTopic=<mqtt topic for commands to this device> ({})",
            c.command_topic
        );
        let _ = writeln!(out, "gmtOffset=<Time offset from GMT> ({})", c.gmt_offset);
        let _ = writeln!(out, "volume=<Speaker volume 0-10> ({})", c.volume);
        let _ = writeln!(out, "noteLength=<tone length in ms 1-2000> ({})", c.note_length_ms);
        let _ = writeln!(out, "octave=<melody octave 0-8> ({})", c.octave);
        let _ = writeln!(out, "debug=<print debug messages to serial port> ({})", c.debug);
        let _ = writeln!(
            out,
            "MQTT client ID=<automatically generated client ID> ({}) **Use \"resetmqttid=yes\" to regenerate",
            c.client_id
        );
        let _ = writeln!(out, "\n*** Use \"factorydefaults=yes\" to reset all settings ***");
        let _ = write!(out, "\nIP Address={}", ip);
        out
    }
}
