//! Configuration commands from the console and the command topic, through
//! the settings store into the mock storage backend.

use crate::mock_hw::{ActuatorCall, CMD_TOPIC, Rig, complete_config};

use mqttlistener::app::events::{AppEvent, RestartReason};
use mqttlistener::config::{CLIENT_ID_ROOT, DEFAULT_TOPIC, SSID_SIZE, Variant};

#[test]
fn unknown_key_changes_nothing_and_shows_help() {
    let mut rig = Rig::configured();
    let before = rig.app.settings().config().clone();

    assert_eq!(rig.send(CMD_TOPIC, "bogus=1"), None);
    assert_eq!(rig.app.settings().config(), &before);
    assert_eq!(rig.app.settings().port().saves.get(), 0);
    assert!(rig.publisher.published.is_empty());

    let help = rig.sink.events.iter().find_map(|e| match e {
        AppEvent::SettingsHelp(text) => Some(text.clone()),
        _ => None,
    });
    let help = help.expect("help text emitted");
    assert!(help.contains("ssid=<wifi ssid> (HomeNet)"));
    assert!(help.ends_with("IP Address=10.0.0.42"));
}

#[test]
fn live_setting_applies_without_restart() {
    let mut rig = Rig::configured();
    assert_eq!(rig.send(CMD_TOPIC, "volume=7"), None);
    assert_eq!(rig.app.settings().config().volume, 7);
    assert_eq!(rig.hw.last_tuning().map(|t| t.volume), Some(7));
    assert_eq!(rig.app.settings().port().saves.get(), 1);
    assert!(rig.publisher.published.is_empty());
}

#[test]
fn out_of_range_live_values_are_clamped() {
    let mut rig = Rig::configured();
    rig.console("volume=99");
    rig.console("noteLength=0");
    rig.console("octave=-3");
    let cfg = rig.app.settings().config();
    assert_eq!((cfg.volume, cfg.note_length_ms, cfg.octave), (10, 1, 0));
    assert!(rig.app.is_configured());
}

#[test]
fn boot_setting_over_mqtt_answers_restarting() {
    let mut rig = Rig::configured();
    assert_eq!(
        rig.send(CMD_TOPIC, "broker=10.0.0.9"),
        Some(RestartReason::SettingsChanged)
    );
    assert_eq!(rig.app.settings().config().broker_address, "10.0.0.9");
    assert_eq!(
        rig.last_publish(),
        Some(&(
            "dev/cmd/broker=10.0.0.9".to_string(),
            "OK, restarting".to_string(),
            false
        ))
    );
    let stored = rig.app.settings().port().stored.borrow().clone().unwrap();
    assert_eq!(stored.broker_address, "10.0.0.9");
}

#[test]
fn console_setup_of_fresh_device() {
    let mut rig = Rig::with(None, Variant::Mp3Display.profile());
    assert!(!rig.app.is_configured());
    assert_eq!(
        rig.app.settings().config().command_topic.as_str(),
        DEFAULT_TOPIC
    );

    for line in ["ssid=HomeNet\r\n", "wifipass=hunter22\n", "broker=10.0.0.2\r"] {
        assert_eq!(rig.console(line), None);
        assert!(!rig.app.is_configured());
    }
    assert_eq!(
        rig.console("message1=ON"),
        Some(RestartReason::SettingsChanged)
    );
    assert!(rig.app.is_configured());

    let stored = rig.app.settings().port().stored.borrow().clone().unwrap();
    assert!(stored.is_marked_valid());
    assert_eq!(stored.ssid, "HomeNet");
    assert_eq!(stored.wifi_password, "hunter22");
}

#[test]
fn breaking_a_complete_record_clears_the_sentinel() {
    let mut rig = Rig::configured();
    rig.console("ssid=");
    assert!(!rig.app.is_configured());
    let stored = rig.app.settings().port().stored.borrow().clone().unwrap();
    assert_eq!(stored.valid_config, 0);
}

#[test]
fn long_value_is_truncated_to_field_size() {
    let mut rig = Rig::configured();
    let long = "N".repeat(SSID_SIZE + 50);
    rig.console(&format!("ssid={}", long));
    assert_eq!(rig.app.settings().config().ssid.as_str(), &long[..SSID_SIZE]);
}

#[test]
fn factory_defaults_wipes_and_restarts() {
    let mut rig = Rig::configured();
    assert_eq!(
        rig.console("factorydefaults=yes"),
        Some(RestartReason::FactoryReset)
    );
    let cfg = rig.app.settings().config();
    assert!(!rig.app.is_configured());
    assert!(cfg.ssid.is_empty());
    assert!(cfg.client_id.starts_with(CLIENT_ID_ROOT));
    assert_ne!(cfg.client_id, "mqttListenerBEEF");
}

#[test]
fn pseudo_commands_need_confirmation() {
    let mut rig = Rig::configured();
    assert_eq!(rig.console("factorydefaults=no"), None);
    assert_eq!(rig.console("reset=1"), None);
    assert!(rig.app.is_configured());
    assert!(rig.sink.help_shown());
}

#[test]
fn reset_restarts_without_saving() {
    let mut rig = Rig::configured();
    assert_eq!(rig.console("reset=yes\r\n"), Some(RestartReason::UserRequested));
    assert_eq!(rig.app.settings().port().saves.get(), 0);
}

#[test]
fn console_field_edit_on_complete_record_keeps_running() {
    let mut rig = Rig::configured();
    assert_eq!(rig.console("broker=10.0.0.9\n"), None);
    assert_eq!(rig.app.settings().config().broker_address, "10.0.0.9");
    assert_eq!(rig.app.settings().port().saves.get(), 1);
    assert!(
        !rig.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::RestartRequested(_)))
    );
}

#[test]
fn reset_mqtt_id_regenerates_and_persists() {
    let mut rig = Rig::configured();
    assert_eq!(rig.console("resetmqttid=yes"), None);
    let id = rig.app.settings().config().client_id.clone();
    assert_ne!(id, "mqttListenerBEEF");
    assert!(id.starts_with(CLIENT_ID_ROOT));
    let stored = rig.app.settings().port().stored.borrow().clone().unwrap();
    assert_eq!(stored.client_id, id);
}

#[test]
fn slot_edits_apply_to_matching_at_once() {
    let mut rig = Rig::with(Some(complete_config()), Variant::Mp3Display.profile());
    assert_eq!(rig.console("topic3=alarm/#"), None);
    assert_eq!(rig.console("message3=*"), None);
    rig.send("alarm/kitchen/smoke", "1");
    assert_eq!(
        rig.hw.calls.last(),
        Some(&ActuatorCall::Perform {
            slot: 3,
            description: String::new()
        })
    );
}
