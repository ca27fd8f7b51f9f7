//! Fuzz target: `CommandProcessor::apply`
//!
//! Feeds arbitrary lines into the command processor and checks that it
//! never panics and that an unrecognized line never touches the record.
//!
//! cargo fuzz run fuzz_command_line

#![no_main]

use std::cell::RefCell;

use libfuzzer_sys::fuzz_target;
use mqttlistener::app::commands::CommandProcessor;
use mqttlistener::app::ports::{ConfigError, ConfigPort};
use mqttlistener::config::DeviceConfig;
use mqttlistener::settings::SettingsStore;

#[derive(Default)]
struct Scratch(RefCell<Option<DeviceConfig>>);

impl ConfigPort for Scratch {
    fn load(&self) -> Result<DeviceConfig, ConfigError> {
        self.0.borrow().clone().ok_or(ConfigError::NotFound)
    }

    fn save(&self, config: &DeviceConfig) -> Result<(), ConfigError> {
        *self.0.borrow_mut() = Some(config.clone());
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    let mut store = SettingsStore::load(Scratch::default(), 0);
    let before = store.config().clone();

    let outcome = CommandProcessor::apply(&mut store, line);
    if !outcome.recognized {
        assert_eq!(store.config(), &before, "unrecognized line mutated settings");
        assert!(!outcome.restart_needed);
    }

    // Whatever was written must survive a dump.
    let _ = store.render_dump(std::net::Ipv4Addr::LOCALHOST);
});
