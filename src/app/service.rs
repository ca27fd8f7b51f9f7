//! Listener service: the hexagonal core.
//!
//! [`ListenerService`] owns the settings store, the per-slot repeat guard
//! and the trigger history. Every inbound message goes through
//! [`on_message`](ListenerService::on_message), which decides between
//! introspection, a trigger, a configuration command or nothing. All I/O
//! flows through port traits injected at call sites, so the whole service
//! runs against mock adapters in tests.
//!
//! ```text
//!  (topic, payload) ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                       │     ListenerService      │
//!  console line ──────▶ │ Settings · Guard · Hist. │ ──▶ ActuatorPort
//!                       └──────────────────────────┘ ──▶ PublishPort
//! ```

use embedded_hal::delay::DelayNs;
use log::{LevelFilter, debug, info, warn};

use crate::config::{DispatchProfile, SlotId};
use crate::history::History;
use crate::repeat_guard::{GuardState, RepeatGuard};
use crate::settings::SettingsStore;

use super::commands::{CommandOutcome, CommandProcessor, Key, LiveChange};
use super::events::{AppEvent, RestartReason};
use super::ports::{ActuatorPort, ClockPort, ConfigPort, EventSink, LinkPort, PublishPort};

/// Payload sent back when a restart is about to happen.
pub const RESTARTING_RESPONSE: &str = "OK, restarting";
pub const ACK_RESPONSE: &str = "OK";

/// Pause before the single actuator bring-up retry.
pub const ACTUATOR_RETRY_DELAY_MS: u32 = 2_000;

/// Inbound payload as text: cut at the first NUL, then at
/// [`MAX_PAYLOAD_LEN`](crate::events::MAX_PAYLOAD_LEN) bytes.
pub fn payload_text(payload: &[u8]) -> String {
    let end = payload
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(payload.len())
        .min(crate::events::MAX_PAYLOAD_LEN);
    String::from_utf8_lossy(&payload[..end]).into_owned()
}

/// Responses go to `<topic>/<payload>`.
pub fn response_topic(topic: &str, payload: &str) -> String {
    format!("{}/{}", topic, payload)
}

/// What one inbound message produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Text to publish to [`response_topic`].
    pub response: Option<String>,
    pub restart: Option<RestartReason>,
}

impl Dispatch {
    fn reply(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            restart: None,
        }
    }

    fn ignored() -> Self {
        Self::default()
    }
}

// ───────────────────────────────────────────────────────────────
// ListenerService
// ───────────────────────────────────────────────────────────────

pub struct ListenerService<C: ConfigPort> {
    settings: SettingsStore<C>,
    guard: RepeatGuard,
    history: History,
    profile: DispatchProfile,
}

impl<C: ConfigPort> ListenerService<C> {
    /// `now_ms` is the current uptime; every slot is ready from then on.
    pub fn new(settings: SettingsStore<C>, profile: DispatchProfile, now_ms: u64) -> Self {
        Self {
            settings,
            guard: RepeatGuard::new(now_ms, profile.cooldown_ms),
            history: History::new(),
            profile,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Apply the stored log level and bring the actuator up.
    ///
    /// A failed init is retried once after [`ACTUATOR_RETRY_DELAY_MS`];
    /// a second failure asks for a restart.
    pub fn start(
        &mut self,
        hw: &mut impl ActuatorPort,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) -> Result<(), RestartReason> {
        apply_log_level(self.settings.config().debug);

        if let Err(e) = hw.init() {
            warn!("Actuator init failed ({}), retrying", e);
            sink.emit(&AppEvent::ActuatorFailed(e));
            delay.delay_ms(ACTUATOR_RETRY_DELAY_MS);
            if let Err(e) = hw.init() {
                warn!("Actuator still not responding ({})", e);
                sink.emit(&AppEvent::ActuatorFailed(e));
                sink.emit(&AppEvent::RestartRequested(RestartReason::ActuatorUnavailable));
                return Err(RestartReason::ActuatorUnavailable);
            }
        }
        if let Err(e) = hw.apply_tuning(&self.settings.config().tuning()) {
            warn!("Actuator tuning failed: {}", e);
        }

        let cfg = self.settings.config();
        sink.emit(&AppEvent::Started {
            valid_config: cfg.is_marked_valid(),
            client_id: cfg.client_id.clone(),
        });
        info!(
            "ListenerService started (config {})",
            if cfg.is_marked_valid() { "valid" } else { "incomplete" }
        );
        Ok(())
    }

    // ── Message dispatch ──────────────────────────────────────

    /// Decide what one inbound message means and act on it.
    pub fn on_message(
        &mut self,
        topic: &str,
        payload: &[u8],
        hw: &mut impl ActuatorPort,
        clock: &impl ClockPort,
        link: &impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Dispatch {
        let text = payload_text(payload);
        debug!("Message on {:?}: {:?}", topic, text);

        let on_command_topic = topic == self.settings.config().command_topic.as_str();

        if on_command_topic {
            match text.as_str() {
                "settings" => {
                    debug!("Sending settings");
                    return Dispatch::reply(self.settings.render_dump(link.local_ip()));
                }
                "history" if self.profile.keep_history => {
                    debug!("Sending history");
                    return Dispatch::reply(self.history.render(self.settings.config()));
                }
                "status" => {
                    return Dispatch::reply(format!("Ready at {}", link.local_ip()));
                }
                _ => {}
            }
        }

        if let Some(slot) = self.matching_slot(topic, &text) {
            self.trigger(slot, hw, clock, sink);
            return if self.profile.ack_triggers {
                Dispatch::reply(ACK_RESPONSE)
            } else {
                Dispatch::ignored()
            };
        }

        if on_command_topic {
            let outcome = self.run_command(&text, hw, link, sink);
            if outcome.restart_needed {
                let reason = restart_reason(&outcome);
                sink.emit(&AppEvent::RestartRequested(reason));
                return Dispatch {
                    response: Some(RESTARTING_RESPONSE.into()),
                    restart: Some(reason),
                };
            }
            return Dispatch::ignored();
        }

        Dispatch::ignored()
    }

    /// [`on_message`](Self::on_message), then publish any response
    /// (non-retained). A failed publish is logged and not retried.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_message(
        &mut self,
        topic: &str,
        payload: &[u8],
        hw: &mut impl ActuatorPort,
        publisher: &mut impl PublishPort,
        clock: &impl ClockPort,
        link: &impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Option<RestartReason> {
        let dispatch = self.on_message(topic, payload, hw, clock, link, sink);
        if let Some(response) = &dispatch.response {
            let reply_topic = response_topic(topic, &payload_text(payload));
            if let Err(e) = publisher.publish(&reply_topic, response, false) {
                warn!("Publish to {} failed: {}", reply_topic, e);
                sink.emit(&AppEvent::PublishFailed {
                    topic: reply_topic,
                    error: e,
                });
            }
        }
        dispatch.restart
    }

    /// A line typed on the serial console. Same command set as the
    /// command topic, but no introspection and no response. Field edits
    /// only restart on the incomplete → complete edge, so a setup can be
    /// typed line by line.
    pub fn on_console_line(
        &mut self,
        line: &str,
        hw: &mut impl ActuatorPort,
        link: &impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Option<RestartReason> {
        let outcome = self.run_command(line, hw, link, sink);
        let restart = outcome.factory_reset
            || outcome.key == Some(Key::Reset)
            || outcome.save.is_some_and(|s| s.reboot_required);
        restart.then(|| {
            let reason = restart_reason(&outcome);
            sink.emit(&AppEvent::RestartRequested(reason));
            reason
        })
    }

    /// Retained signal-strength report to `<commandTopic>/rssi`.
    pub fn publish_rssi(&self, link: &impl LinkPort, publisher: &mut impl PublishPort) {
        let Some(rssi) = link.rssi() else {
            return;
        };
        let topic = format!("{}/rssi", self.settings.config().command_topic);
        if let Err(e) = publisher.publish(&topic, &rssi.to_string(), true) {
            warn!("RSSI publish failed: {}", e);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn settings(&self) -> &SettingsStore<C> {
        &self.settings
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn profile(&self) -> DispatchProfile {
        self.profile
    }

    /// Settings are complete; WiFi and broker may be brought up.
    pub fn is_configured(&self) -> bool {
        self.settings.is_valid()
    }

    // ── Internal ──────────────────────────────────────────────

    /// First active slot whose pattern covers `topic` and whose expected
    /// payload accepts `payload`.
    fn matching_slot(&self, topic: &str, payload: &str) -> Option<SlotId> {
        let cfg = self.settings.config();
        SlotId::all().find(|&id| {
            let slot = cfg.slot(id);
            slot.is_active() && crate::topic::matches(topic, &slot.topic) && slot.accepts_payload(payload)
        })
    }

    fn trigger(
        &mut self,
        slot: SlotId,
        hw: &mut impl ActuatorPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        let now = clock.uptime_ms();
        let state = self.guard.state(slot, now);
        // Re-arm whether or not it fires.
        self.guard.arm(slot, now);

        if let GuardState::Cooling { remaining_ms } = state {
            debug!("Slot {} suppressed, {} ms left", slot, remaining_ms);
            sink.emit(&AppEvent::TriggerSuppressed { slot, remaining_ms });
            return;
        }

        if self.profile.keep_history {
            self.history.record(slot, clock.epoch_secs());
        }

        let cfg = self.settings.config();
        let trigger = cfg.slot(slot);
        sink.emit(&AppEvent::TriggerFired {
            slot,
            description: trigger.description.clone(),
        });
        if let Err(e) = hw.perform(slot, trigger, &cfg.tuning()) {
            warn!("Slot {} action failed: {}", slot, e);
            sink.emit(&AppEvent::ActuatorFailed(e));
        }
    }

    fn run_command(
        &mut self,
        line: &str,
        hw: &mut impl ActuatorPort,
        link: &impl LinkPort,
        sink: &mut impl EventSink,
    ) -> CommandOutcome {
        let outcome = CommandProcessor::apply(&mut self.settings, line);
        if !outcome.recognized {
            sink.emit(&AppEvent::SettingsHelp(
                self.settings.render_help(link.local_ip()),
            ));
            return outcome;
        }

        match outcome.live_change {
            Some(LiveChange::Debug(on)) => apply_log_level(on),
            Some(LiveChange::Volume(_) | LiveChange::NoteLength(_) | LiveChange::Octave(_)) => {
                if let Err(e) = hw.apply_tuning(&self.settings.config().tuning()) {
                    warn!("Actuator tuning failed: {}", e);
                    sink.emit(&AppEvent::ActuatorFailed(e));
                }
            }
            // History renders with the offset; nothing to push.
            Some(LiveChange::GmtOffset(_)) | None => {}
        }

        if let Some(key) = outcome.key {
            sink.emit(&AppEvent::SettingChanged {
                key: format!("{:?}", key),
                restart_needed: outcome.restart_needed,
            });
        }
        outcome
    }
}

fn restart_reason(outcome: &CommandOutcome) -> RestartReason {
    if outcome.factory_reset {
        RestartReason::FactoryReset
    } else if outcome.key == Some(Key::Reset) {
        RestartReason::UserRequested
    } else {
        RestartReason::SettingsChanged
    }
}

/// `debug=true` raises the log level to `Debug`.
fn apply_log_level(debug_on: bool) {
    let level = if debug_on {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    log::set_max_level(level);
}
