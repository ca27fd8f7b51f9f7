//! Actuator drivers.

pub mod dfplayer;
pub mod display;
pub mod tone_out;
