//! GPIO / peripheral pin assignments for the listener board.
//!
//! Single source of truth; `main` builds every driver from these numbers.

// ---------------------------------------------------------------------------
// DFPlayer Mini (MP3 variant)
// ---------------------------------------------------------------------------

/// UART TX to the module's RX (through a 1 kΩ series resistor).
pub const DFPLAYER_TX_GPIO: i32 = 17;
/// UART RX from the module's TX.
pub const DFPLAYER_RX_GPIO: i32 = 16;
pub const DFPLAYER_BAUD: u32 = 9_600;

// ---------------------------------------------------------------------------
// Tone output (buzzer and speaker variants)
// ---------------------------------------------------------------------------

/// Square-wave output; piezo directly or a speaker via an NPN stage.
pub const TONE_GPIO: i32 = 4;
