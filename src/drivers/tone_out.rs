//! Square-wave tone output on a plain GPIO.
//!
//! Bit-banged with a blocking delay, so a pattern occupies the caller for
//! its whole length. Good enough for a piezo or a small speaker behind a
//! transistor; no LEDC channel needed.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::error::ActuatorError;
use crate::tone::ToneStep;

pub struct ToneOutput<P: OutputPin, D: DelayNs> {
    pin: P,
    delay: D,
    muted: bool,
}

impl<P: OutputPin, D: DelayNs> ToneOutput<P, D> {
    pub fn new(pin: P, delay: D) -> Self {
        Self {
            pin,
            delay,
            muted: false,
        }
    }

    /// Drive the pin low and make sure it answers.
    pub fn init(&mut self) -> Result<(), ActuatorError> {
        self.pin.set_low().map_err(|_| ActuatorError::PinWriteFailed)
    }

    /// Muted output still takes the full time of every step.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn play(&mut self, steps: &[ToneStep]) -> Result<(), ActuatorError> {
        for step in steps {
            self.play_step(step)?;
        }
        self.pin.set_low().map_err(|_| ActuatorError::PinWriteFailed)
    }

    fn play_step(&mut self, step: &ToneStep) -> Result<(), ActuatorError> {
        if step.is_rest() || self.muted {
            self.delay.delay_ms(step.duration_ms);
            return Ok(());
        }

        let half_period_us = (500_000 / step.freq_hz).max(1);
        let cycles = u64::from(step.duration_ms) * 1000 / u64::from(2 * half_period_us);
        for _ in 0..cycles {
            self.pin.set_high().map_err(|_| ActuatorError::PinWriteFailed)?;
            self.delay.delay_us(half_period_us);
            self.pin.set_low().map_err(|_| ActuatorError::PinWriteFailed)?;
            self.delay.delay_us(half_period_us);
        }
        Ok(())
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}
