// /src/lib.rs
//! SIM800 gateway core: queued SMS sending, caller ID with auto hang-up,
//! and the blocking AT helpers used for bring-up and status queries.
#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to the other modules.
mod fmt;

pub mod call_log;
pub mod call_session;
pub mod command;
pub mod config;
pub mod constants;
pub mod custom_strings;
pub mod error;
pub mod gsm_time;
pub mod modem;
pub mod ports;
pub mod sms_queue;
pub mod sms_sender;
pub mod transport;

pub use call_log::{CallLogBook, CallLogEntry};
pub use call_session::{CallAction, CallHandler, CallSession, RingPolicy};
pub use command::{CommandSession, ModemStatus};
pub use config::ModemConfig;
pub use error::Error;
pub use gsm_time::GsmTime;
pub use modem::Modem;
pub use ports::{CallLog, CallerNotifier, Ports, SettingsStore, WallClock};
pub use sms_queue::{SmsTask, SmsTaskQueue};
pub use sms_sender::{SmsOutcome, SmsSender, SmsState};
pub use transport::{LineAssembler, Transport};
