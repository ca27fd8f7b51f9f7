//! Mock adapters for integration tests.
//!
//! Records every actuator call, publish and event so tests can assert on
//! the full history without touching real peripherals or a broker.

use std::cell::{Cell, RefCell};
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard};

use embedded_hal::delay::DelayNs;
use mqttlistener::app::events::AppEvent;
use mqttlistener::app::ports::{
    ActuatorPort, ClockPort, ConfigError, ConfigPort, EventSink, LinkPort, PublishPort,
};
use mqttlistener::app::service::ListenerService;
use mqttlistener::config::{
    DeviceConfig, DispatchProfile, SlotId, TriggerSlot, Tuning, VALID_SETTINGS_FLAG, Variant,
    bounded,
};
use mqttlistener::error::{ActuatorError, CommsError};
use mqttlistener::settings::SettingsStore;

// ── Actuator ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    Init,
    Perform { slot: u8, description: String },
    Tuning(Tuning),
}

#[derive(Default)]
pub struct MockActuator {
    pub calls: Vec<ActuatorCall>,
    /// Number of `init` calls that fail before one succeeds.
    pub failing_inits: u32,
    pub fail_perform: bool,
}

#[allow(dead_code)]
impl MockActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn performed(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::Perform { slot, .. } => Some(*slot),
                _ => None,
            })
            .collect()
    }

    pub fn last_tuning(&self) -> Option<Tuning> {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Tuning(t) => Some(*t),
            _ => None,
        })
    }
}

impl ActuatorPort for MockActuator {
    fn init(&mut self) -> Result<(), ActuatorError> {
        self.calls.push(ActuatorCall::Init);
        if self.failing_inits > 0 {
            self.failing_inits -= 1;
            return Err(ActuatorError::NotResponding);
        }
        Ok(())
    }

    fn perform(
        &mut self,
        slot: SlotId,
        trigger: &TriggerSlot,
        _tuning: &Tuning,
    ) -> Result<(), ActuatorError> {
        self.calls.push(ActuatorCall::Perform {
            slot: slot.number(),
            description: trigger.description.to_string(),
        });
        if self.fail_perform {
            return Err(ActuatorError::SerialWriteFailed);
        }
        Ok(())
    }

    fn apply_tuning(&mut self, tuning: &Tuning) -> Result<(), ActuatorError> {
        self.calls.push(ActuatorCall::Tuning(*tuning));
        Ok(())
    }
}

// ── Publisher ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockPublisher {
    pub published: Vec<(String, String, bool)>,
    pub offline: bool,
}

impl PublishPort for MockPublisher {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError> {
        if self.offline {
            return Err(CommsError::MqttPublishFailed);
        }
        self.published
            .push((topic.to_string(), payload.to_string(), retain));
        Ok(())
    }
}

// ── Clock ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockClock {
    pub uptime: Cell<u64>,
    pub epoch: Cell<u64>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn at(uptime_ms: u64) -> Self {
        let c = Self::default();
        c.uptime.set(uptime_ms);
        c
    }

    pub fn set(&self, uptime_ms: u64) {
        self.uptime.set(uptime_ms);
    }
}

impl ClockPort for MockClock {
    fn uptime_ms(&self) -> u64 {
        self.uptime.get()
    }

    fn epoch_secs(&self) -> u64 {
        self.epoch.get()
    }
}

// ── Link ──────────────────────────────────────────────────────

pub struct MockLink {
    pub ip: Ipv4Addr,
    pub rssi: Option<i8>,
}

impl Default for MockLink {
    fn default() -> Self {
        Self {
            ip: Ipv4Addr::new(10, 0, 0, 42),
            rssi: Some(-61),
        }
    }
}

impl LinkPort for MockLink {
    fn local_ip(&self) -> Ipv4Addr {
        self.ip
    }

    fn rssi(&self) -> Option<i8> {
        self.rssi
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn help_shown(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, AppEvent::SettingsHelp(_)))
    }

    pub fn suppressed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::TriggerSuppressed { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Config storage ────────────────────────────────────────────

#[derive(Default)]
pub struct MemConfig {
    pub stored: RefCell<Option<DeviceConfig>>,
    pub saves: Cell<u32>,
}

#[allow(dead_code)]
impl MemConfig {
    pub fn holding(cfg: DeviceConfig) -> Self {
        Self {
            stored: RefCell::new(Some(cfg)),
            saves: Cell::new(0),
        }
    }
}

impl ConfigPort for MemConfig {
    fn load(&self) -> Result<DeviceConfig, ConfigError> {
        self.stored.borrow().clone().ok_or(ConfigError::NotFound)
    }

    fn save(&self, config: &DeviceConfig) -> Result<(), ConfigError> {
        self.saves.set(self.saves.get() + 1);
        *self.stored.borrow_mut() = Some(config.clone());
        Ok(())
    }
}

// ── Delay ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingDelay {
    pub total_ms: u64,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ms += u64::from(ns) / 1_000_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ms += u64::from(ms);
    }
}

// ── Fixtures ──────────────────────────────────────────────────

pub const CMD_TOPIC: &str = "dev/cmd";

static QUEUE_LOCK: Mutex<()> = Mutex::new(());

/// Serialize tests that use the global event queue.
pub fn queue_lock() -> MutexGuard<'static, ()> {
    QUEUE_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// A complete record: command topic `dev/cmd`, slot 1 fires on
/// (`sensor/front`, `OPEN`), slot 2 on anything under `garage/+/door`.
pub fn complete_config() -> DeviceConfig {
    let mut c = DeviceConfig::default();
    c.ssid = bounded("HomeNet");
    c.wifi_password = bounded("hunter22");
    c.broker_address = bounded("10.0.0.2");
    c.client_id = bounded("mqttListenerBEEF");
    c.command_topic = bounded(CMD_TOPIC);
    c.slots[0].topic = bounded("sensor/front");
    c.slots[0].message = bounded("OPEN");
    c.slots[0].description = bounded("Front door");
    c.slots[1].topic = bounded("garage/+/door");
    c.slots[1].message = bounded("*");
    c.slots[1].description = bounded("Garage");
    c.valid_config = VALID_SETTINGS_FLAG;
    c
}

pub struct Rig {
    pub app: ListenerService<MemConfig>,
    pub hw: MockActuator,
    pub publisher: MockPublisher,
    pub clock: MockClock,
    pub link: MockLink,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn with(cfg: Option<DeviceConfig>, profile: DispatchProfile) -> Self {
        let port = match cfg {
            Some(c) => MemConfig::holding(c),
            None => MemConfig::default(),
        };
        let settings = SettingsStore::load(port, 42);
        Self {
            app: ListenerService::new(settings, profile, 0),
            hw: MockActuator::new(),
            publisher: MockPublisher::default(),
            clock: MockClock::at(0),
            link: MockLink::default(),
            sink: RecordingSink::default(),
        }
    }

    /// Complete settings, MP3 + display profile (5 s cooldown, history).
    pub fn configured() -> Self {
        Self::with(Some(complete_config()), Variant::Mp3Display.profile())
    }

    pub fn send(&mut self, topic: &str, payload: &str) -> Option<mqttlistener::app::events::RestartReason> {
        self.app.handle_message(
            topic,
            payload.as_bytes(),
            &mut self.hw,
            &mut self.publisher,
            &self.clock,
            &self.link,
            &mut self.sink,
        )
    }

    pub fn console(&mut self, line: &str) -> Option<mqttlistener::app::events::RestartReason> {
        self.app
            .on_console_line(line, &mut self.hw, &self.link, &mut self.sink)
    }

    pub fn last_publish(&self) -> Option<&(String, String, bool)> {
        self.publisher.published.last()
    }
}
