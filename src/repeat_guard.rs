//! Per-slot repeat suppression.
//!
//! Some publishers send the same event several times in quick succession to
//! make sure one gets through. Each trigger slot keeps a "not before"
//! deadline; an event earlier than the deadline is swallowed.
//!
//! ```text
//!            now >= not_before            now < not_before
//!   READY ─────────────────────▶ fire    ──────────────────▶ suppress
//!      ▲         not_before = now + cooldown   (deadline still pushed out)
//!      └──────────── time passes ───────────────┘
//! ```
//!
//! Every matching event, fired or not, pushes the deadline to
//! `now + cooldown`, so a continuous flood keeps the slot quiet until the
//! publisher pauses for a full window.

use crate::config::{SLOT_COUNT, SlotId};

/// Observable state of one slot at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Ready,
    Cooling { remaining_ms: u64 },
}

pub struct RepeatGuard {
    not_before: [u64; SLOT_COUNT],
    cooldown_ms: u64,
}

impl RepeatGuard {
    /// All slots start ready at `startup_ms` (current uptime).
    pub fn new(startup_ms: u64, cooldown_ms: u64) -> Self {
        Self {
            not_before: [startup_ms; SLOT_COUNT],
            cooldown_ms,
        }
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    pub fn state(&self, slot: SlotId, now_ms: u64) -> GuardState {
        let deadline = self.not_before[slot.index()];
        if now_ms >= deadline {
            GuardState::Ready
        } else {
            GuardState::Cooling {
                remaining_ms: deadline - now_ms,
            }
        }
    }

    /// Whether an event on `slot` at `now_ms` may fire. Read-only.
    pub fn should_fire(&self, slot: SlotId, now_ms: u64) -> bool {
        self.state(slot, now_ms) == GuardState::Ready
    }

    /// Push the slot's deadline to `now_ms + cooldown`.
    pub fn arm(&mut self, slot: SlotId, now_ms: u64) {
        self.not_before[slot.index()] = now_ms.saturating_add(self.cooldown_ms);
    }

    /// Decide and re-arm in one step. The deadline moves whatever the answer.
    pub fn check_and_arm(&mut self, slot: SlotId, now_ms: u64) -> bool {
        let fire = self.should_fire(slot, now_ms);
        self.arm(slot, now_ms);
        fire
    }
}
