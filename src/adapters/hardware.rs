//! Hardware adapters: the three actuator variants behind [`ActuatorPort`].
//!
//! | Variant      | Adapter               | Driver                      |
//! |--------------|-----------------------|-----------------------------|
//! | MP3 + LCD    | [`Mp3DisplayActuator`]| DFPlayer over UART, display |
//! | Buzzer       | [`BuzzerActuator`]    | square wave, beep bits      |
//! | Speaker      | [`SpeakerActuator`]   | square wave, melody notes   |
//!
//! All three are generic over their drivers' HAL traits, so host tests plug
//! in recording pins and serial links.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::ports::ActuatorPort;
use crate::config::{SlotId, TriggerSlot, Tuning};
use crate::drivers::dfplayer::{DfPlayer, SerialLink};
use crate::drivers::display::LineDisplay;
use crate::drivers::tone_out::ToneOutput;
use crate::error::ActuatorError;
use crate::tone;

/// Played when a buzzer slot has no pattern of its own: two beeps.
pub const DEFAULT_BEEP_PATTERN: &str = "A";
/// Played when a speaker slot has no pattern of its own: C, E, G.
pub const DEFAULT_MELODY: &str = "158";

fn pattern_or<'a>(trigger: &'a TriggerSlot, fallback: &'a str) -> &'a str {
    if trigger.pattern.is_empty() {
        fallback
    } else {
        trigger.pattern.as_str()
    }
}

// ── MP3 + display ─────────────────────────────────────────────

pub struct Mp3DisplayActuator<S: SerialLink, D: DelayNs, L: LineDisplay> {
    player: DfPlayer<S, D>,
    display: L,
}

impl<S: SerialLink, D: DelayNs, L: LineDisplay> Mp3DisplayActuator<S, D, L> {
    pub fn new(player: DfPlayer<S, D>, display: L) -> Self {
        Self { player, display }
    }

    pub fn player(&self) -> &DfPlayer<S, D> {
        &self.player
    }

    pub fn display(&self) -> &L {
        &self.display
    }
}

impl<S: SerialLink, D: DelayNs, L: LineDisplay> ActuatorPort for Mp3DisplayActuator<S, D, L> {
    fn init(&mut self) -> Result<(), ActuatorError> {
        self.display.show("Starting", "")?;
        self.player.init()
    }

    fn perform(
        &mut self,
        slot: SlotId,
        trigger: &TriggerSlot,
        _tuning: &Tuning,
    ) -> Result<(), ActuatorError> {
        let top = format!("Alert {}", slot);
        if let Err(e) = self.display.show(&top, &trigger.description) {
            // The sound still matters without the panel.
            warn!("Display: {}", e);
        }
        self.player.play(u16::from(slot.number()))
    }

    fn apply_tuning(&mut self, tuning: &Tuning) -> Result<(), ActuatorError> {
        self.player.set_volume(tuning.volume)
    }
}

// ── Buzzer ────────────────────────────────────────────────────

pub struct BuzzerActuator<P: OutputPin, D: DelayNs> {
    out: ToneOutput<P, D>,
}

impl<P: OutputPin, D: DelayNs> BuzzerActuator<P, D> {
    pub fn new(out: ToneOutput<P, D>) -> Self {
        Self { out }
    }

    pub fn output(&self) -> &ToneOutput<P, D> {
        &self.out
    }
}

impl<P: OutputPin, D: DelayNs> ActuatorPort for BuzzerActuator<P, D> {
    fn init(&mut self) -> Result<(), ActuatorError> {
        self.out.init()
    }

    fn perform(
        &mut self,
        slot: SlotId,
        trigger: &TriggerSlot,
        tuning: &Tuning,
    ) -> Result<(), ActuatorError> {
        let pattern = pattern_or(trigger, DEFAULT_BEEP_PATTERN);
        let steps = tone::beep_steps(pattern, tuning.note_length_ms)?;
        info!("Buzzer: slot {} pattern {}", slot, pattern);
        self.out.play(&steps)
    }

    fn apply_tuning(&mut self, tuning: &Tuning) -> Result<(), ActuatorError> {
        self.out.set_muted(tuning.volume == 0);
        Ok(())
    }
}

// ── Speaker ───────────────────────────────────────────────────

pub struct SpeakerActuator<P: OutputPin, D: DelayNs> {
    out: ToneOutput<P, D>,
}

impl<P: OutputPin, D: DelayNs> SpeakerActuator<P, D> {
    pub fn new(out: ToneOutput<P, D>) -> Self {
        Self { out }
    }

    pub fn output(&self) -> &ToneOutput<P, D> {
        &self.out
    }
}

impl<P: OutputPin, D: DelayNs> ActuatorPort for SpeakerActuator<P, D> {
    fn init(&mut self) -> Result<(), ActuatorError> {
        self.out.init()
    }

    fn perform(
        &mut self,
        slot: SlotId,
        trigger: &TriggerSlot,
        tuning: &Tuning,
    ) -> Result<(), ActuatorError> {
        let pattern = pattern_or(trigger, DEFAULT_MELODY);
        let steps = tone::melody_steps(pattern, tuning.octave, tuning.note_length_ms)?;
        info!(
            "Speaker: slot {} melody {} in octave {}",
            slot, pattern, tuning.octave
        );
        self.out.play(&steps)
    }

    fn apply_tuning(&mut self, tuning: &Tuning) -> Result<(), ActuatorError> {
        self.out.set_muted(tuning.volume == 0);
        Ok(())
    }
}
