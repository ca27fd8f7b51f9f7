//! Fuzz target: `topic::matches`
//!
//! Splits the input at the first NUL into (received, pattern) and checks
//! the matcher never panics and agrees with a few invariants.
//!
//! cargo fuzz run fuzz_topic_match

#![no_main]

use libfuzzer_sys::fuzz_target;
use mqttlistener::topic::matches;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (received, pattern) = text.split_once('\0').unwrap_or((text, text));

    let result = matches(received, pattern);

    if !pattern.contains(['+', '#']) {
        assert_eq!(result, received == pattern, "literal pattern must be equality");
    }
    assert!(matches(received, "#"), "`#` must match every topic");
});
