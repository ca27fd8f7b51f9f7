//! Outbound application events.
//!
//! The [`ListenerService`](super::service::ListenerService) emits these
//! through the [`EventSink`](super::ports::EventSink) port. Adapters on the
//! other side decide what to do with them: log to serial, draw on the
//! display, and so on.

use crate::config::SlotId;
use crate::error::{ActuatorError, CommsError};

/// Why the service wants the device restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// A setting that only takes effect at boot was changed.
    SettingsChanged,
    /// `factorydefaults=yes`.
    FactoryReset,
    /// `reset=yes`.
    UserRequested,
    /// The actuator did not come up at boot, even after a retry.
    ActuatorUnavailable,
    /// WiFi association ran out of attempts.
    WifiUnavailable,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service is up. `valid_config` is false until the settings are
    /// complete, in which case only the console is serviced.
    Started {
        valid_config: bool,
        client_id: heapless::String<{ crate::config::CLIENT_ID_SIZE }>,
    },

    /// A trigger slot fired and its action ran.
    TriggerFired {
        slot: SlotId,
        description: heapless::String<{ crate::config::DESCRIPTION_SIZE }>,
    },

    /// A matching message arrived inside the slot's cooldown window.
    TriggerSuppressed { slot: SlotId, remaining_ms: u64 },

    /// A recognized `key=value` command changed a setting.
    SettingChanged { key: String, restart_needed: bool },

    /// An unrecognized command; carries the console help text.
    SettingsHelp(String),

    /// The actuator failed to carry out an action.
    ActuatorFailed(ActuatorError),

    /// A response could not be published.
    PublishFailed { topic: String, error: CommsError },

    RestartRequested(RestartReason),
}
