// /src/error.rs
use core::fmt;

/// Everything that can go wrong between the gateway and the modem.
///
/// Send failures never escalate past the task they belong to: a task that
/// ends in [`Error::Timeout`] or [`Error::ModemError`] is dropped and the
/// queue moves on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The expected reply did not arrive before the phase deadline.
    Timeout,
    /// The modem answered `ERROR` (or a `+CME ERROR`).
    ModemError,
    /// A URC or query reply did not have the expected shape.
    Parse,
    /// The task queue has no free slot.
    QueueFull,
    /// Text does not fit its fixed-capacity buffer.
    TooLong,
    InvalidRingThreshold,
    /// Queue processing was attempted before the modem was initialized.
    NotReady,
    /// The modem link is in the middle of sending an SMS.
    Busy,
    /// The settings collaborator could not persist a value.
    Storage,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Error::Timeout => "timed out waiting for modem",
            Error::ModemError => "modem reported an error",
            Error::Parse => "malformed modem response",
            Error::QueueFull => "sms queue is full",
            Error::TooLong => "text exceeds buffer capacity",
            Error::InvalidRingThreshold => "ring threshold must be within 1..=14",
            Error::NotReady => "modem not initialized",
            Error::Busy => "modem busy sending",
            Error::Storage => "settings store failed",
        };
        f.write_str(text)
    }
}

impl core::error::Error for Error {}
