// /src/call_log.rs
use heapless::{Deque, String};

use crate::constants::{CALL_LOG_CAPACITY, MAX_PHONE_LENGTH, TIMESTAMP_LENGTH};
use crate::ports::CallLog;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CallLogEntry {
    pub timestamp: String<TIMESTAMP_LENGTH>,
    pub number: String<MAX_PHONE_LENGTH>,
}

/// The most recent incoming calls, oldest first.
pub struct CallLogBook {
    entries: Deque<CallLogEntry, CALL_LOG_CAPACITY>,
}

impl CallLogBook {
    pub const fn new() -> Self {
        Self { entries: Deque::new() }
    }

    pub fn push(&mut self, entry: CallLogEntry) {
        if self.entries.is_full() {
            if let Some(evicted) = self.entries.pop_front() {
                debug!("Call log full, dropping {}", evicted.number);
            }
        }
        // A slot was freed above.
        let _ = self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CallLogEntry> {
        self.entries.iter().nth(index)
    }

    pub fn latest(&self) -> Option<&CallLogEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallLogEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for CallLogBook {
    fn default() -> Self {
        Self::new()
    }
}

impl CallLog for CallLogBook {
    fn append(&mut self, number: &str, timestamp: &str) {
        let mut entry = CallLogEntry::default();
        if entry.number.push_str(number).is_err() {
            warn!("Caller number too long for call log: {}", number);
            return;
        }
        // Anything beyond the ISO-8601 seconds field is dropped.
        for c in timestamp.chars() {
            if entry.timestamp.push(c).is_err() {
                break;
            }
        }
        self.push(entry);
    }
}
