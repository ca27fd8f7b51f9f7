//! MQTT topic filter matching.
//!
//! Compares a concrete topic a message arrived on against a stored
//! subscription pattern, segment by segment:
//!
//! | pattern segment | matches                                    |
//! |-----------------|--------------------------------------------|
//! | `#`             | everything from here on, including nothing |
//! | `+`             | exactly one non-empty segment              |
//! | anything else   | the identical segment (case-sensitive)     |

const MULTI_LEVEL: &str = "#";
const SINGLE_LEVEL: &str = "+";

/// `true` if `received` is covered by `pattern`.
///
/// A `#` ends the comparison successfully wherever it appears, so `a/#`
/// also matches plain `a`.
pub fn matches(received: &str, pattern: &str) -> bool {
    let mut topic = received.split('/');
    let mut filter = pattern.split('/');

    loop {
        match (filter.next(), topic.next()) {
            (Some(MULTI_LEVEL), _) => return true,
            (None, None) => return true,
            (Some(_), None) | (None, Some(_)) => return false,
            (Some(SINGLE_LEVEL), Some(seg)) => {
                if seg.is_empty() {
                    return false;
                }
            }
            (Some(want), Some(seg)) => {
                if want != seg {
                    return false;
                }
            }
        }
    }
}
