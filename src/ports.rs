// /src/ports.rs
//! Collaborators the driver calls out to. The messaging, storage and clock
//! implementations live outside the core; tests substitute fakes.

use crate::error::Error;
use crate::gsm_time::GsmTime;

/// Announces a detected caller, e.g. by publishing it on a message bus.
pub trait CallerNotifier {
    fn notify_caller(&mut self, number: &str);
}

/// Persists one entry per incoming call. Implementations keep at most the
/// [`CALL_LOG_CAPACITY`](crate::constants::CALL_LOG_CAPACITY) newest entries.
pub trait CallLog {
    fn append(&mut self, number: &str, timestamp: &str);
}

pub trait SettingsStore {
    /// The persisted ring threshold, if one was ever stored.
    fn load_ring_threshold(&mut self) -> Option<u8>;
    fn store_ring_threshold(&mut self, rings: u8) -> Result<(), Error>;
}

/// Calendar time used to stamp call-log entries.
pub trait WallClock {
    fn now(&self) -> GsmTime;
}

/// Everything the driver needs from its surroundings, in one value.
pub trait Ports: CallerNotifier + CallLog + SettingsStore + WallClock {}

impl<P: CallerNotifier + CallLog + SettingsStore + WallClock> Ports for P {}
