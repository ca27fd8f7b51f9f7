//! Hex tone patterns for the buzzer and speaker variants.
//!
//! A pattern is 1 to 8 hex digits stored per trigger slot.
//!
//! - **Beep** (buzzer): each digit is four on/off bits, most significant
//!   first. A set bit sounds [`BEEP_FREQ_HZ`] for one note length, a clear
//!   bit is silence of the same length. `"A"` is beep, gap, beep, gap.
//! - **Melody** (speaker): each digit is one note. `0` is a rest, `1` is C
//!   of the configured octave and every further digit is one semitone up,
//!   so `F` lands on the D above the next C.

use heapless::Vec;

use crate::config::PATTERN_SIZE;
use crate::error::ActuatorError;

/// Piezo resonance; loudest for the usual 12 mm buzzers.
pub const BEEP_FREQ_HZ: u32 = 2048;

pub const MAX_BEEP_STEPS: usize = PATTERN_SIZE * 4;
pub const MAX_MELODY_STEPS: usize = PATTERN_SIZE;

/// C0 in millihertz.
const C0_MILLIHZ: u64 = 16_352;

/// Equal-temperament semitone ratios, scaled by 10 000.
const SEMITONE_RATIO: [u64; 12] = [
    10_000, 10_595, 11_225, 11_892, 12_599, 13_348, 14_142, 14_983, 15_874, 16_818, 17_818, 18_877,
];

/// One timed segment of output. `freq_hz == 0` is silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneStep {
    pub freq_hz: u32,
    pub duration_ms: u32,
}

impl ToneStep {
    pub const fn rest(duration_ms: u32) -> Self {
        Self {
            freq_hz: 0,
            duration_ms,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.freq_hz == 0
    }
}

fn digits(pattern: &str) -> Result<impl Iterator<Item = u8> + '_, ActuatorError> {
    if pattern.is_empty() || pattern.len() > PATTERN_SIZE {
        return Err(ActuatorError::BadPattern);
    }
    if !pattern.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ActuatorError::BadPattern);
    }
    // Every byte is an ASCII hex digit, so `to_digit` cannot fail.
    Ok(pattern
        .chars()
        .filter_map(|c| c.to_digit(16))
        .map(|d| d as u8))
}

/// `Ok` if `pattern` is 1 to 8 hex digits.
pub fn validate(pattern: &str) -> Result<(), ActuatorError> {
    digits(pattern).map(|_| ())
}

/// Expand a buzzer pattern into on/off steps.
pub fn beep_steps(
    pattern: &str,
    note_length_ms: u32,
) -> Result<Vec<ToneStep, MAX_BEEP_STEPS>, ActuatorError> {
    let mut steps = Vec::new();
    for d in digits(pattern)? {
        for bit in (0..4).rev() {
            let step = if d & (1 << bit) != 0 {
                ToneStep {
                    freq_hz: BEEP_FREQ_HZ,
                    duration_ms: note_length_ms,
                }
            } else {
                ToneStep::rest(note_length_ms)
            };
            steps.push(step).map_err(|_| ActuatorError::BadPattern)?;
        }
    }
    Ok(steps)
}

/// Expand a speaker pattern into notes in `octave`.
pub fn melody_steps(
    pattern: &str,
    octave: u8,
    note_length_ms: u32,
) -> Result<Vec<ToneStep, MAX_MELODY_STEPS>, ActuatorError> {
    let mut steps = Vec::new();
    for d in digits(pattern)? {
        let step = if d == 0 {
            ToneStep::rest(note_length_ms)
        } else {
            ToneStep {
                freq_hz: note_freq_hz(octave, d - 1),
                duration_ms: note_length_ms,
            }
        };
        steps.push(step).map_err(|_| ActuatorError::BadPattern)?;
    }
    Ok(steps)
}

/// Frequency of the note `semitone` steps above C in `octave`.
pub fn note_freq_hz(octave: u8, semitone: u8) -> u32 {
    let shift = u32::from(octave) + u32::from(semitone / 12);
    let base = C0_MILLIHZ << shift.min(16);
    (base * SEMITONE_RATIO[usize::from(semitone % 12)] / 10_000 / 1000) as u32
}
