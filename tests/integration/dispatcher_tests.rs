//! Message dispatch: introspection, triggers, repeat suppression and
//! responses, end to end through `ListenerService::handle_message`.

use crate::mock_hw::{
    ActuatorCall, CMD_TOPIC, MockActuator, RecordingDelay, Rig, complete_config, queue_lock,
};

use mqttlistener::app::events::{AppEvent, RestartReason};
use mqttlistener::config::{Variant, bounded};
use mqttlistener::error::{ActuatorError, CommsError};

// ── Introspection ─────────────────────────────────────────────

#[test]
fn status_replies_on_status_subtopic() {
    let mut rig = Rig::configured();
    assert_eq!(rig.send(CMD_TOPIC, "status"), None);
    assert_eq!(
        rig.last_publish(),
        Some(&(
            "dev/cmd/status".to_string(),
            "Ready at 10.0.0.42".to_string(),
            false
        ))
    );
}

#[test]
fn status_on_other_topic_is_ignored() {
    let mut rig = Rig::configured();
    rig.send("other/topic", "status");
    assert!(rig.publisher.published.is_empty());
    assert!(rig.hw.calls.is_empty());
}

#[test]
fn settings_dump_is_repeatable() {
    let mut rig = Rig::configured();
    rig.send(CMD_TOPIC, "settings");
    rig.send(CMD_TOPIC, "settings");
    let [(t1, first, _), (t2, second, _)] = rig.publisher.published.as_slice() else {
        panic!("expected two publishes");
    };
    assert_eq!(t1, "dev/cmd/settings");
    assert_eq!(t1, t2);
    assert_eq!(first, second);
    assert!(first.contains("\nssid=HomeNet\n"));
    assert!(first.contains("topic2=garage/+/door\n"));
    assert!(first.ends_with("IP Address=10.0.0.42"));
}

#[test]
fn history_lists_fired_triggers_oldest_first() {
    let mut rig = Rig::configured();
    rig.send(CMD_TOPIC, "history");
    assert_eq!(rig.last_publish().unwrap().1, "No history yet.");

    rig.clock.epoch.set(1_709_647_629);
    rig.send("sensor/front", "OPEN");
    rig.clock.set(10_000);
    rig.clock.epoch.set(1_709_647_639);
    rig.send("garage/left/door", "up");

    rig.send(CMD_TOPIC, "history");
    let (topic, text, _) = rig.last_publish().unwrap();
    assert_eq!(topic, "dev/cmd/history");
    assert_eq!(text, "03/05 14:07:09 Front door\n03/05 14:07:19 Garage");
}

#[test]
fn history_is_a_plain_command_without_history_profile() {
    let mut rig = Rig::with(Some(complete_config()), Variant::Speaker.profile());
    rig.send(CMD_TOPIC, "history");
    assert!(rig.publisher.published.is_empty());
    assert!(rig.sink.help_shown());
}

// ── Triggers and repeat suppression ───────────────────────────

#[test]
fn repeat_inside_cooldown_is_suppressed() {
    let mut rig = Rig::configured();

    rig.send("sensor/front", "OPEN");
    rig.clock.set(100);
    rig.send("sensor/front", "OPEN");
    assert_eq!(rig.hw.performed(), vec![1]);
    assert_eq!(rig.sink.suppressed(), 1);

    // The suppressed event pushed the window to 5100 ms.
    rig.clock.set(6_000);
    rig.send("sensor/front", "OPEN");
    assert_eq!(rig.hw.performed(), vec![1, 1]);
    assert!(rig.publisher.published.is_empty());
}

#[test]
fn slots_cool_down_independently() {
    let mut rig = Rig::configured();
    rig.send("sensor/front", "OPEN");
    rig.clock.set(50);
    rig.send("garage/left/door", "closed");
    assert_eq!(rig.hw.performed(), vec![1, 2]);
}

#[test]
fn payload_must_match_unless_wildcard() {
    let mut rig = Rig::configured();
    rig.send("sensor/front", "CLOSED");
    rig.send("garage/left/right/door", "x");
    assert!(rig.hw.calls.is_empty());

    rig.send("garage/north/door", "anything");
    assert_eq!(
        rig.hw.calls,
        vec![ActuatorCall::Perform {
            slot: 2,
            description: "Garage".into()
        }]
    );
}

#[test]
fn first_matching_slot_wins() {
    let mut cfg = complete_config();
    cfg.slots[2].topic = bounded("sensor/#");
    cfg.slots[2].message = bounded("OPEN");
    let mut rig = Rig::with(Some(cfg), Variant::Mp3Display.profile());
    rig.send("sensor/front", "OPEN");
    assert_eq!(rig.hw.performed(), vec![1]);
    rig.send("sensor/back", "OPEN");
    assert_eq!(rig.hw.performed(), vec![1, 3]);
}

#[test]
fn trigger_on_command_topic_beats_command_parsing() {
    let mut cfg = complete_config();
    cfg.slots[2].topic = bounded(CMD_TOPIC);
    cfg.slots[2].message = bounded("ring");
    let mut rig = Rig::with(Some(cfg), Variant::Mp3Display.profile());
    assert_eq!(rig.send(CMD_TOPIC, "ring"), None);
    assert_eq!(rig.hw.performed(), vec![3]);
    assert!(!rig.sink.help_shown());
}

#[test]
fn buzzer_profile_acknowledges_every_match() {
    let mut rig = Rig::with(Some(complete_config()), Variant::Buzzer.profile());
    rig.send("sensor/front", "OPEN");
    rig.clock.set(9_000);
    rig.send("sensor/front", "OPEN");

    assert_eq!(rig.hw.performed(), vec![1]);
    let replies: Vec<_> = rig
        .publisher
        .published
        .iter()
        .map(|(t, p, _)| (t.as_str(), p.as_str()))
        .collect();
    assert_eq!(
        replies,
        vec![("sensor/front/OPEN", "OK"), ("sensor/front/OPEN", "OK")]
    );
}

#[test]
fn end_to_end_suppressed_trigger_then_status() {
    let mut rig = Rig::configured();
    rig.send("sensor/front", "OPEN");
    rig.hw.calls.clear();

    rig.clock.set(1_000);
    rig.send("sensor/front", "OPEN");
    assert!(rig.hw.calls.is_empty());
    assert!(rig.publisher.published.is_empty());

    rig.send(CMD_TOPIC, "status");
    let (topic, text, _) = rig.last_publish().unwrap();
    assert_eq!(topic, "dev/cmd/status");
    assert!(text.starts_with("Ready at "));
}

// ── Failures ──────────────────────────────────────────────────

#[test]
fn actuator_failure_is_reported_not_fatal() {
    let mut rig = Rig::configured();
    rig.hw.fail_perform = true;
    assert_eq!(rig.send("sensor/front", "OPEN"), None);
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::ActuatorFailed(ActuatorError::SerialWriteFailed))
    );

    rig.send(CMD_TOPIC, "status");
    assert_eq!(rig.publisher.published.len(), 1);
}

#[test]
fn publish_failure_is_reported() {
    let mut rig = Rig::configured();
    rig.publisher.offline = true;
    rig.send(CMD_TOPIC, "status");
    assert!(rig.sink.events.contains(&AppEvent::PublishFailed {
        topic: "dev/cmd/status".into(),
        error: CommsError::MqttPublishFailed,
    }));
}

#[test]
fn rssi_report_is_retained() {
    let mut rig = Rig::configured();
    rig.app.publish_rssi(&rig.link, &mut rig.publisher);
    assert_eq!(
        rig.last_publish(),
        Some(&("dev/cmd/rssi".to_string(), "-61".to_string(), true))
    );

    rig.link.rssi = None;
    rig.app.publish_rssi(&rig.link, &mut rig.publisher);
    assert_eq!(rig.publisher.published.len(), 1);
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_retries_actuator_once() {
    let mut rig = Rig::configured();
    let mut hw = MockActuator {
        failing_inits: 1,
        ..Default::default()
    };
    let mut delay = RecordingDelay::default();
    assert_eq!(rig.app.start(&mut hw, &mut delay, &mut rig.sink), Ok(()));
    assert_eq!(delay.total_ms, 2_000);
    assert_eq!(hw.calls[..2], [ActuatorCall::Init, ActuatorCall::Init]);
    assert_eq!(hw.last_tuning().map(|t| t.volume), Some(5));
    assert!(matches!(
        rig.sink.events.last(),
        Some(AppEvent::Started {
            valid_config: true,
            ..
        })
    ));
}

#[test]
fn start_gives_up_after_second_failure() {
    let mut rig = Rig::configured();
    let mut hw = MockActuator {
        failing_inits: 2,
        ..Default::default()
    };
    assert_eq!(
        rig.app
            .start(&mut hw, &mut RecordingDelay::default(), &mut rig.sink),
        Err(RestartReason::ActuatorUnavailable)
    );
    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::RestartRequested(
            RestartReason::ActuatorUnavailable
        ))
    );
}

#[test]
fn fresh_device_starts_unconfigured() {
    let mut rig = Rig::with(None, Variant::Mp3Display.profile());
    assert!(!rig.app.is_configured());
    rig.app
        .start(&mut MockActuator::new(), &mut RecordingDelay::default(), &mut rig.sink)
        .unwrap();
    assert!(matches!(
        rig.sink.events.last(),
        Some(AppEvent::Started {
            valid_config: false,
            ..
        })
    ));
}

// ── Broker session + event queue ──────────────────────────────

#[test]
fn injected_message_round_trips_through_queue() {
    use mqttlistener::adapters::mqtt::MqttSession;
    use mqttlistener::events::{self, Event};

    let _queue = queue_lock();
    let mut rig = Rig::configured();
    let mut session = MqttSession::start(rig.app.settings().config()).unwrap();
    assert_eq!(session.subscriptions, vec![CMD_TOPIC, "sensor/front", "garage/+/door"]);

    events::clear_events();
    assert!(session.inject(CMD_TOPIC, b"status\0junk"));
    let Some(Event::MessageReceived { topic, payload }) = events::next_event() else {
        panic!("expected a queued message");
    };
    rig.app.handle_message(
        &topic,
        &payload,
        &mut rig.hw,
        &mut session,
        &rig.clock,
        &rig.link,
        &mut rig.sink,
    );
    assert_eq!(session.published.len(), 1);
    assert_eq!(session.published[0].topic, "dev/cmd/status");
    assert_eq!(session.published[0].payload, "Ready at 10.0.0.42");
    assert!(!session.published[0].retain);
}

#[test]
fn burst_beyond_queue_depth_is_dispatched_in_order() {
    use mqttlistener::events::{self, EVENT_QUEUE_DEPTH, Event, push_event};
    use std::time::{Duration, Instant};

    let _queue = queue_lock();
    events::clear_events();
    let burst = EVENT_QUEUE_DEPTH as u32 + 4;

    let producer = std::thread::spawn(move || {
        for n in 1..=burst {
            let line = format!("noteLength={n}");
            let ev = Event::message(CMD_TOPIC, line.as_bytes()).unwrap();
            push_event(ev);
        }
    });

    // Let the producer fill the queue and stall before draining.
    std::thread::sleep(Duration::from_millis(50));

    let mut rig = Rig::configured();
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = 0;
    while seen < burst && Instant::now() < deadline {
        match events::next_event() {
            Some(Event::MessageReceived { topic, payload }) => {
                assert_eq!(rig.send(&topic, core::str::from_utf8(&payload).unwrap()), None);
                seen += 1;
            }
            Some(other) => panic!("unexpected event {:?}", other),
            None => std::thread::sleep(Duration::from_millis(1)),
        }
    }
    producer.join().unwrap();

    let lengths: Vec<u32> = rig
        .hw
        .calls
        .iter()
        .filter_map(|c| match c {
            ActuatorCall::Tuning(t) => Some(t.note_length_ms),
            _ => None,
        })
        .collect();
    assert_eq!(lengths, (1..=burst).collect::<Vec<_>>());
    assert_eq!(events::next_event(), None);
}
