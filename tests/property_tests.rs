//! Property tests for the matcher, the repeat guard and the command parser.
//!
//! Runs on host (x86_64) only: proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use mqttlistener::app::commands::{parse_int_lenient, split_command};
use mqttlistener::config::{SlotId, TOPIC_SIZE, Topic, set_truncated};
use mqttlistener::repeat_guard::RepeatGuard;
use mqttlistener::topic::matches;
use proptest::prelude::*;

fn level() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,6}"
}

fn topic() -> impl Strategy<Value = String> {
    prop::collection::vec(level(), 1..6).prop_map(|levels| levels.join("/"))
}

proptest! {
    #[test]
    fn topic_matches_itself(t in topic()) {
        prop_assert!(matches(&t, &t));
    }

    #[test]
    fn hash_matches_everything(t in topic()) {
        prop_assert!(matches(&t, "#"));
    }

    /// `prefix/#` covers the prefix itself and everything below it.
    #[test]
    fn trailing_hash_covers_subtree(prefix in topic(), rest in topic()) {
        let pattern = format!("{}/#", prefix);
        prop_assert!(matches(&prefix, &pattern));
        let below = format!("{}/{}", prefix, rest);
        prop_assert!(matches(&below, &pattern));
    }

    /// Replacing any one level with `+` still matches.
    #[test]
    fn plus_replaces_any_single_level(
        levels in prop::collection::vec(level(), 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let t = levels.join("/");
        let mut p = levels.clone();
        p[pick.index(levels.len())] = "+".into();
        prop_assert!(matches(&t, &p.join("/")));
    }

    /// Without wildcards, matching is string equality.
    #[test]
    fn literal_pattern_is_equality(a in topic(), b in topic()) {
        prop_assert_eq!(matches(&a, &b), a == b);
    }

    /// Truncation keeps an exact prefix that fits the field.
    #[test]
    fn truncation_keeps_prefix(value in "\\PC{0,80}") {
        let mut field = Topic::new();
        set_truncated(&mut field, &value);
        prop_assert!(field.len() <= TOPIC_SIZE);
        prop_assert!(value.starts_with(field.as_str()));
        if value.len() <= TOPIC_SIZE {
            prop_assert_eq!(field.as_str(), value.as_str());
        }
    }

    /// No two firings of one slot are closer than the cooldown.
    #[test]
    fn guard_spaces_firings(
        gaps in prop::collection::vec(0u64..8_000, 1..40),
        cooldown in 1u64..10_000,
    ) {
        let slot = SlotId::new(1).unwrap();
        let mut guard = RepeatGuard::new(0, cooldown);
        let mut now = 0u64;
        let mut last_fire: Option<u64> = None;
        for gap in gaps {
            now += gap;
            if guard.check_and_arm(slot, now) {
                if let Some(prev) = last_fire {
                    prop_assert!(now - prev >= cooldown);
                }
                last_fire = Some(now);
            }
        }
    }

    #[test]
    fn split_never_yields_empty_key(line in "\\PC{0,40}") {
        if let Some((key, _)) = split_command(&line) {
            prop_assert!(!key.is_empty());
            prop_assert!(!key.contains('='));
        }
    }

    #[test]
    fn lenient_int_agrees_with_std(n in any::<i32>()) {
        prop_assert_eq!(parse_int_lenient(&n.to_string()), n);
        prop_assert_eq!(parse_int_lenient(&format!("{}abc", n)), n);
    }
}
