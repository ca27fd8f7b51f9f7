//! DFPlayer Mini MP3 module driver.
//!
//! The module speaks a fixed 10-byte serial frame at 9600 baud:
//!
//! ```text
//!  0x7E  0xFF  0x06  cmd  fb  p_hi  p_lo  ck_hi  ck_lo  0xEF
//!  start ver   len        ack  parameter   checksum    end
//! ```
//!
//! The checksum is the two's complement of the sum of bytes 1..=6.
//! Tracks are numbered in FAT copy order on the SD card; slot N plays
//! track N.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::error::ActuatorError;

pub const FRAME_LEN: usize = 10;

const START: u8 = 0x7E;
const VERSION: u8 = 0xFF;
const LEN: u8 = 0x06;
const END: u8 = 0xEF;

pub const CMD_PLAY_TRACK: u8 = 0x03;
pub const CMD_SET_VOLUME: u8 = 0x06;
pub const CMD_SET_EQ: u8 = 0x07;
pub const CMD_SET_OUTPUT: u8 = 0x09;
pub const CMD_RESET: u8 = 0x0C;
pub const CMD_QUERY_STATUS: u8 = 0x42;

pub const OUTPUT_SD_CARD: u16 = 0x02;
pub const EQ_NORMAL: u16 = 0x00;
pub const MAX_MODULE_VOLUME: u16 = 30;

/// Time the module needs after a reset before it answers.
const RESET_SETTLE_MS: u32 = 1_000;
const REPLY_TIMEOUT_MS: u32 = 500;

/// Byte pipe to the module.
pub trait SerialLink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ActuatorError>;

    /// Read what arrives within `timeout_ms`; returns the byte count.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, ActuatorError>;
}

fn checksum(frame: &[u8; FRAME_LEN]) -> u16 {
    let sum: u16 = frame[1..7].iter().map(|&b| u16::from(b)).sum();
    0u16.wrapping_sub(sum)
}

/// Build one command frame.
pub fn encode_frame(cmd: u8, param: u16, feedback: bool) -> [u8; FRAME_LEN] {
    let [p_hi, p_lo] = param.to_be_bytes();
    let mut frame = [
        START,
        VERSION,
        LEN,
        cmd,
        u8::from(feedback),
        p_hi,
        p_lo,
        0,
        0,
        END,
    ];
    let [c_hi, c_lo] = checksum(&frame).to_be_bytes();
    frame[7] = c_hi;
    frame[8] = c_lo;
    frame
}

/// Parse a frame coming back from the module: `(cmd, param)`.
pub fn decode_frame(bytes: &[u8]) -> Option<(u8, u16)> {
    let frame: &[u8; FRAME_LEN] = bytes.get(..FRAME_LEN)?.try_into().ok()?;
    if frame[0] != START || frame[1] != VERSION || frame[2] != LEN || frame[9] != END {
        return None;
    }
    let expected = u16::from_be_bytes([frame[7], frame[8]]);
    if checksum(frame) != expected {
        return None;
    }
    Some((frame[3], u16::from_be_bytes([frame[5], frame[6]])))
}

/// Map the 0-10 user volume onto the module's 0-30 scale.
pub fn module_volume(volume: u8) -> u16 {
    (u16::from(volume.min(10)) * MAX_MODULE_VOLUME) / 10
}

pub struct DfPlayer<S: SerialLink, D: DelayNs> {
    serial: S,
    delay: D,
}

impl<S: SerialLink, D: DelayNs> DfPlayer<S, D> {
    pub fn new(serial: S, delay: D) -> Self {
        Self { serial, delay }
    }

    fn send(&mut self, cmd: u8, param: u16) -> Result<(), ActuatorError> {
        debug!("DFPlayer: cmd=0x{:02X} param={}", cmd, param);
        self.serial.write_all(&encode_frame(cmd, param, false))
    }

    /// Reset the module, wait for it to answer, select the SD card.
    pub fn init(&mut self) -> Result<(), ActuatorError> {
        self.send(CMD_RESET, 0)?;
        self.delay.delay_ms(RESET_SETTLE_MS);

        self.serial
            .write_all(&encode_frame(CMD_QUERY_STATUS, 0, true))?;
        let mut buf = [0u8; FRAME_LEN * 2];
        let n = self.serial.read(&mut buf, REPLY_TIMEOUT_MS)?;
        let answered = (0..n.saturating_sub(FRAME_LEN - 1))
            .any(|i| decode_frame(&buf[i..n]).is_some());
        if !answered {
            warn!("DFPlayer: no reply after reset ({} bytes)", n);
            return Err(ActuatorError::NotResponding);
        }

        self.send(CMD_SET_OUTPUT, OUTPUT_SD_CARD)?;
        self.send(CMD_SET_EQ, EQ_NORMAL)?;
        info!("DFPlayer: online");
        Ok(())
    }

    pub fn play(&mut self, track: u16) -> Result<(), ActuatorError> {
        self.send(CMD_PLAY_TRACK, track)
    }

    pub fn set_volume(&mut self, volume: u8) -> Result<(), ActuatorError> {
        self.send(CMD_SET_VOLUME, module_volume(volume))
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }
}

// ── ESP-IDF UART binding ──────────────────────────────────────

#[cfg(target_os = "espidf")]
impl SerialLink for esp_idf_hal::uart::UartDriver<'static> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ActuatorError> {
        let mut sent = 0;
        while sent < bytes.len() {
            sent += self
                .write(&bytes[sent..])
                .map_err(|_| ActuatorError::SerialWriteFailed)?;
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, ActuatorError> {
        let ticks = esp_idf_hal::delay::TickType::new_millis(u64::from(timeout_ms)).ticks();
        esp_idf_hal::uart::UartDriver::read(self, buf, ticks)
            .map_err(|_| ActuatorError::NotResponding)
    }
}
