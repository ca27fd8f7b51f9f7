//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (UART / USB-CDC in production). The settings help text goes out
//! line by line so it reads like a console listing.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                valid_config,
                client_id,
            } => {
                info!(
                    "START | client_id={} | settings {}",
                    client_id,
                    if *valid_config { "valid" } else { "INCOMPLETE, configure via console" }
                );
            }
            AppEvent::TriggerFired { slot, description } => {
                info!("FIRE  | slot {} | {}", slot, description);
            }
            AppEvent::TriggerSuppressed { slot, remaining_ms } => {
                info!("QUIET | slot {} | repeat ignored, {} ms left", slot, remaining_ms);
            }
            AppEvent::SettingChanged {
                key,
                restart_needed,
            } => {
                info!(
                    "SET   | {}{}",
                    key,
                    if *restart_needed { " (restart needed)" } else { "" }
                );
            }
            AppEvent::SettingsHelp(text) => {
                for line in text.lines() {
                    info!("{}", line);
                }
            }
            AppEvent::ActuatorFailed(e) => {
                warn!("ACT   | {}", e);
            }
            AppEvent::PublishFailed { topic, error } => {
                warn!("PUB   | {} | {}", topic, error);
            }
            AppEvent::RestartRequested(reason) => {
                info!("RESET | {:?}", reason);
            }
        }
    }
}
