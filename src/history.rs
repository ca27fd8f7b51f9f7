//! In-memory log of accepted trigger firings.
//!
//! Fixed capacity; once full, the oldest entry is overwritten. Nothing is
//! persisted, a reboot starts from an empty log.

use core::fmt::Write;

use chrono::DateTime;
use heapless::HistoryBuffer;

use crate::config::{DeviceConfig, SlotId};

pub const HISTORY_CAPACITY: usize = 10;

const EMPTY_TEXT: &str = "No history yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub slot: SlotId,
    /// Seconds since the Unix epoch (UTC) when the slot fired.
    pub timestamp: u64,
}

pub struct History {
    entries: HistoryBuffer<HistoryEntry, HISTORY_CAPACITY>,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: HistoryBuffer::new(),
        }
    }

    pub fn record(&mut self, slot: SlotId, timestamp: u64) {
        self.entries.write(HistoryEntry { slot, timestamp });
    }

    /// Number of stored entries, capped at [`HISTORY_CAPACITY`].
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.oldest_ordered()
    }

    /// One line per entry, `MM/DD HH:MM:SS description`, in the configured
    /// local time.
    pub fn render(&self, cfg: &DeviceConfig) -> String {
        if self.is_empty() {
            return EMPTY_TEXT.to_string();
        }

        let offset_secs = i64::from(cfg.gmt_offset) * 3600;
        let mut out = String::new();
        for (i, entry) in self.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let local = i64::try_from(entry.timestamp)
                .unwrap_or(i64::MAX)
                .saturating_add(offset_secs);
            match DateTime::from_timestamp(local, 0) {
                Some(t) => {
                    let _ = write!(out, "{} ", t.format("%m/%d %H:%M:%S"));
                }
                None => out.push_str("??/?? ??:??:?? "),
            }
            out.push_str(&cfg.slot(entry.slot).description);
        }
        out
    }
}
