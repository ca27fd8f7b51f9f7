//! mqttListener firmware library.
//!
//! Exposes the pure-logic modules for integration testing. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod pins;
pub mod repeat_guard;
pub mod settings;
pub mod tone;
pub mod topic;

pub mod adapters;
pub mod drivers;

use config::Variant;

/// Actuator this build drives, picked by cargo feature.
#[cfg(feature = "buzzer")]
pub const VARIANT: Variant = Variant::Buzzer;
#[cfg(all(feature = "speaker", not(feature = "buzzer")))]
pub const VARIANT: Variant = Variant::Speaker;
#[cfg(not(any(feature = "buzzer", feature = "speaker")))]
pub const VARIANT: Variant = Variant::Mp3Display;
