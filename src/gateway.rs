// /src/gateway.rs
//! Glue between the modem driver and the rest of the firmware.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;
use defmt::warn;

use smsgate::constants::MAX_PHONE_LENGTH;
use smsgate::{
    CallLog, CallLogBook, CallerNotifier, Error, GsmTime, ModemStatus, SettingsStore, SmsTask,
    WallClock,
};

use crate::rtc::RtcControl;

/// Requests from the network side (MQTT/HTTP handlers).
#[derive(Clone, Debug, defmt::Format)]
pub enum GatewayCommand {
    SendSms(SmsTask),
    SetRingThreshold(u8),
    ReportStatus,
    DumpSettings,
}

/// Everything the gateway reports back to the network side.
#[derive(Clone, Debug, defmt::Format)]
pub enum GatewayEvent {
    IncomingCall(String<MAX_PHONE_LENGTH>),
    SmsQueued { accepted: bool, queued: usize },
    SmsFinished { recipients: String<MAX_PHONE_LENGTH>, ok: bool },
    RingThreshold(u8),
    Status(ModemStatus),
}

pub type CommandChannel = Channel<CriticalSectionRawMutex, GatewayCommand, 4>;
pub type EventChannel = Channel<CriticalSectionRawMutex, GatewayEvent, 4>;

/// Driver collaborators backed by the event channel, RAM and the RTC.
pub struct GatewayPorts {
    events: &'static EventChannel,
    call_log: CallLogBook,
    ring_threshold: Option<u8>,
    rtc: RtcControl,
}

impl GatewayPorts {
    pub fn new(events: &'static EventChannel, rtc: RtcControl) -> Self {
        Self {
            events,
            call_log: CallLogBook::new(),
            ring_threshold: None,
            rtc,
        }
    }

    pub fn call_log(&self) -> &CallLogBook {
        &self.call_log
    }

    pub fn rtc_mut(&mut self) -> &mut RtcControl {
        &mut self.rtc
    }

    pub fn publish(&self, event: GatewayEvent) {
        if self.events.try_send(event).is_err() {
            warn!("Event channel full, event dropped");
        }
    }
}

impl CallerNotifier for GatewayPorts {
    fn notify_caller(&mut self, number: &str) {
        let mut caller = String::new();
        if caller.push_str(number).is_ok() {
            self.publish(GatewayEvent::IncomingCall(caller));
        }
    }
}

impl CallLog for GatewayPorts {
    fn append(&mut self, number: &str, timestamp: &str) {
        self.call_log.append(number, timestamp);
    }
}

impl SettingsStore for GatewayPorts {
    fn load_ring_threshold(&mut self) -> Option<u8> {
        self.ring_threshold
    }

    fn store_ring_threshold(&mut self, rings: u8) -> Result<(), Error> {
        self.ring_threshold = Some(rings);
        Ok(())
    }
}

impl WallClock for GatewayPorts {
    fn now(&self) -> GsmTime {
        self.rtc.now()
    }
}
