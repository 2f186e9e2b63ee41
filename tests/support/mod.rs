//! Scripted modem and in-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use embassy_time::Duration;
use smsgate::{
    CallLog, CallLogBook, CallerNotifier, Error, GsmTime, Modem, ModemConfig, SettingsStore,
    Transport, WallClock,
};

/// Key for the reply sent after a message body terminated by Ctrl-Z.
pub const BODY: &str = "<body>";

/// A modem double: every complete command line written to it is answered
/// from a table of scripted replies, or with `OK` when `auto_ok` is set.
#[derive(Default)]
pub struct FakeModem {
    rx: VecDeque<u8>,
    pending: Vec<u8>,
    written: Vec<u8>,
    commands: Vec<String>,
    bodies: Vec<String>,
    replies: HashMap<String, String>,
    auto_ok: bool,
}

impl FakeModem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every unscripted command with `OK`.
    pub fn auto_ok() -> Self {
        Self {
            auto_ok: true,
            ..Self::default()
        }
    }

    pub fn set_auto_ok(&mut self, auto_ok: bool) {
        self.auto_ok = auto_ok;
    }

    pub fn reply_to(&mut self, command: &str, reply: &str) {
        self.replies.insert(command.to_string(), reply.to_string());
    }

    /// Bytes the modem sends on its own (URCs).
    pub fn push_rx(&mut self, text: &str) {
        self.rx.extend(text.bytes());
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn bodies(&self) -> &[String] {
        &self.bodies
    }

    pub fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }

    pub fn clear_log(&mut self) {
        self.written.clear();
        self.commands.clear();
        self.bodies.clear();
    }

    fn answer(&mut self, key: &str) {
        if let Some(reply) = self.replies.get(key) {
            let reply = reply.clone();
            self.push_rx(&reply);
        } else if self.auto_ok && key != BODY {
            self.push_rx("\r\nOK\r\n");
        }
    }
}

impl Transport for FakeModem {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write(&mut self, bytes: &[u8]) {
        self.written.extend_from_slice(bytes);
        for &b in bytes {
            match b {
                b'\n' => {
                    let line = String::from_utf8_lossy(&self.pending).trim().to_string();
                    self.pending.clear();
                    if !line.is_empty() {
                        self.commands.push(line.clone());
                        self.answer(&line);
                    }
                }
                0x1A => {
                    let body = String::from_utf8_lossy(&self.pending).into_owned();
                    self.pending.clear();
                    self.bodies.push(body);
                    self.answer(BODY);
                }
                _ => self.pending.push(b),
            }
        }
    }
}

/// Records every collaborator call.
#[derive(Default)]
pub struct FakePorts {
    pub notified: Vec<String>,
    pub call_log: CallLogBook,
    pub stored_rings: Option<u8>,
    pub store_calls: usize,
    pub fail_store: bool,
}

impl CallerNotifier for FakePorts {
    fn notify_caller(&mut self, number: &str) {
        self.notified.push(number.to_string());
    }
}

impl CallLog for FakePorts {
    fn append(&mut self, number: &str, timestamp: &str) {
        self.call_log.append(number, timestamp);
    }
}

impl SettingsStore for FakePorts {
    fn load_ring_threshold(&mut self) -> Option<u8> {
        self.stored_rings
    }

    fn store_ring_threshold(&mut self, rings: u8) -> Result<(), Error> {
        self.store_calls += 1;
        if self.fail_store {
            return Err(Error::Storage);
        }
        self.stored_rings = Some(rings);
        Ok(())
    }
}

impl WallClock for FakePorts {
    fn now(&self) -> GsmTime {
        GsmTime { year: 25, month: 1, day: 31, hour: 18, minute: 30, second: 5 }
    }
}

/// Default protocol timings with the blocking delays shrunk for tests.
pub fn fast_config() -> ModemConfig {
    ModemConfig {
        command_timeout: Duration::from_millis(50),
        settle_delay: Duration::from_millis(1),
        power_up_delay: Duration::from_millis(0),
        ..ModemConfig::default()
    }
}

pub fn ready_modem(fake: FakeModem, ports: FakePorts) -> Modem<FakeModem, FakePorts> {
    let mut modem = Modem::new(fake, fast_config(), ports);
    modem.initialize().expect("scripted init succeeds");
    modem.transport_mut().clear_log();
    modem
}
