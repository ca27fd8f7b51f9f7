//! Port traits: the hexagonal boundary between the listener core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ListenerService (domain)
//! ```
//!
//! Driven adapters (actuator, broker session, storage, clock, event sink)
//! implement these traits. The [`ListenerService`](super::service::ListenerService)
//! consumes them via generics, so the domain core never touches hardware.

use core::net::Ipv4Addr;

use crate::config::{DeviceConfig, SlotId, TriggerSlot, Tuning};
use crate::error::{ActuatorError, CommsError};

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The physical thing a trigger makes happen: an MP3 track, a beep
/// pattern, a short melody.
pub trait ActuatorPort {
    /// Bring the device up. Called once at startup, possibly retried.
    fn init(&mut self) -> Result<(), ActuatorError>;

    /// Carry out the action for `slot`. Blocks until the action is done.
    fn perform(
        &mut self,
        slot: SlotId,
        trigger: &TriggerSlot,
        tuning: &Tuning,
    ) -> Result<(), ActuatorError>;

    /// Apply volume / tempo changes that take effect without a restart.
    fn apply_tuning(&mut self, tuning: &Tuning) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Publish port (driven adapter: domain → broker)
// ───────────────────────────────────────────────────────────────

/// Outbound half of the broker session.
pub trait PublishPort {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the device configuration record.
///
/// Implementations store the record as-is. Deciding whether it is complete
/// is the job of [`SettingsStore`](crate::settings::SettingsStore).
pub trait ConfigPort {
    /// Returns [`ConfigError::NotFound`] on first boot.
    fn load(&self) -> Result<DeviceConfig, ConfigError>;

    fn save(&self, config: &DeviceConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Monotonic milliseconds since boot.
    fn uptime_ms(&self) -> u64;

    /// Wall-clock seconds since the Unix epoch, UTC. `0` until synced.
    fn epoch_secs(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Link port (network status)
// ───────────────────────────────────────────────────────────────

pub trait LinkPort {
    fn local_ip(&self) -> Ipv4Addr;

    /// Received signal strength of the current association, in dBm.
    fn rssi(&self) -> Option<i8>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / console)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored blob failed to decode.
    Corrupted,
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound => Self::Config("not found"),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::StorageFull => Self::Config("storage full"),
            ConfigError::IoError => Self::Config("I/O error"),
        }
    }
}
