// /src/command.rs
//! Blocking request/response helpers.
//!
//! A [`CommandSession`] holds the transport exclusively while it lives, so
//! the queue tick cannot run in between. Everything here busy-waits on
//! [`Instant::now`]; use it for bring-up and on-demand status queries only.

use core::fmt::Write;

use embassy_time::{Duration, Instant};
use heapless::String;

use crate::config::ModemConfig;
use crate::constants::*;
use crate::custom_strings::{parse_operator, parse_signal_quality};
use crate::error::Error;
use crate::gsm_time::GsmTime;
use crate::transport::{LineAssembler, Transport};

pub type Reply = String<QUERY_BUFFER_SIZE>;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModemStatus {
    /// RSSI as reported by `+CSQ` (0..=31, 99 = unknown), 0 if unavailable.
    pub signal_quality: u8,
    pub operator: String<MAX_OPERATOR_LENGTH>,
}

fn is_error_line(line: &str) -> bool {
    line == ERROR_MARKER || line.starts_with("+CME ERROR") || line.starts_with("+CMS ERROR")
}

pub struct CommandSession<'a, T: Transport> {
    transport: &'a mut T,
    config: &'a ModemConfig,
    lines: LineAssembler,
}

impl<'a, T: Transport> CommandSession<'a, T> {
    pub fn new(transport: &'a mut T, config: &'a ModemConfig) -> Self {
        Self {
            transport,
            config,
            lines: LineAssembler::new(),
        }
    }

    /// Throws away whatever the modem sent before this request.
    pub fn flush(&mut self) {
        let mut dropped = 0usize;
        while self.transport.read_byte().is_some() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("Flushed {} stale bytes", dropped);
        }
        self.lines.reset();
    }

    /// Waits `delay`, logging and discarding anything the modem says meanwhile.
    pub fn settle(&mut self, delay: Duration) {
        let deadline = Instant::now() + delay;
        while Instant::now() < deadline {
            if let Some(b) = self.transport.read_byte() {
                if let Some(line) = self.lines.feed(b) {
                    debug!("  < {}", line);
                }
            }
        }
    }

    /// Reads lines until `on_line` returns a verdict or `timeout` passes.
    fn read_lines<R>(
        &mut self,
        timeout: Duration,
        mut on_line: impl FnMut(&str) -> Option<R>,
    ) -> Result<R, Error> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let Some(b) = self.transport.read_byte() else {
                continue;
            };
            if let Some(line) = self.lines.feed(b) {
                debug!("  < {}", line);
                if let Some(verdict) = on_line(line) {
                    return Ok(verdict);
                }
            }
        }
        Err(Error::Timeout)
    }

    /// Writes `command` and waits for its final `OK` / `ERROR`.
    pub fn send(&mut self, command: &str, timeout: Duration) -> Result<(), Error> {
        self.flush();
        debug!("> {}", command);
        self.transport.write_line(command);

        self.read_lines(timeout, |line| {
            if line == "OK" {
                Some(Ok(()))
            } else if is_error_line(line) {
                Some(Err(Error::ModemError))
            } else {
                None
            }
        })?
    }

    /// Like [`send`](Self::send) but returns every reply line, newline separated.
    pub fn query(&mut self, command: &str, timeout: Duration) -> Result<Reply, Error> {
        self.flush();
        debug!("> {}", command);
        self.transport.write_line(command);

        let mut reply = Reply::new();
        self.read_lines(timeout, |line| {
            if reply.push_str(line).is_err() || reply.push('\n').is_err() {
                warn!("Query reply truncated at {}", line);
            }
            (line == "OK" || is_error_line(line)).then_some(())
        })?;
        Ok(reply)
    }

    /// Writes `command` and scans the raw reply for `expected`. Gives up
    /// early on an `ERROR` reply.
    pub fn send_expect(&mut self, command: &str, expected: &str, timeout: Duration) -> bool {
        self.flush();
        debug!("> {}", command);
        self.transport.write_line(command);

        let mut seen: String<QUERY_BUFFER_SIZE> = String::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let Some(b) = self.transport.read_byte() else {
                continue;
            };
            if seen.len() == seen.capacity() {
                // Keep matching across the cut.
                let keep = seen.len().saturating_sub(expected.len());
                let mut tail: String<QUERY_BUFFER_SIZE> = String::new();
                let _ = tail.push_str(&seen[keep..]);
                seen = tail;
            }
            let _ = seen.push(if b.is_ascii() { b as char } else { '?' });
            if seen.contains(expected) {
                debug!("< {}", seen.as_str());
                return true;
            }
            if seen.contains(ERROR_MARKER) {
                debug!("< {} (rejected)", seen.as_str());
                return false;
            }
        }
        debug!("< {} (no {})", seen.as_str(), expected);
        false
    }

    /// Signal quality from `AT+CSQ`, 0 when the modem does not answer.
    pub fn signal_quality(&mut self) -> u8 {
        let timeout = self.config.command_timeout;
        self.query("AT+CSQ", timeout)
            .ok()
            .and_then(|reply| parse_signal_quality(&reply))
            .unwrap_or(0)
    }

    /// Registered operator from `AT+COPS?`, `"--"` when unknown.
    pub fn operator_name(&mut self) -> String<MAX_OPERATOR_LENGTH> {
        let timeout = self.config.command_timeout;
        let mut name = String::new();
        let reply = self.query("AT+COPS?", timeout).ok();
        let parsed = reply.as_deref().and_then(parse_operator);
        if name.push_str(parsed.unwrap_or(UNKNOWN_OPERATOR)).is_err() {
            name.clear();
            let _ = name.push_str(UNKNOWN_OPERATOR);
        }
        name
    }

    pub fn status(&mut self) -> ModemStatus {
        ModemStatus {
            signal_quality: self.signal_quality(),
            operator: self.operator_name(),
        }
    }

    /// The modem's network-synchronized clock (`AT+CCLK?`).
    pub fn network_time(&mut self) -> Option<GsmTime> {
        let timeout = self.config.command_timeout;
        let reply = self.query("AT+CCLK?", timeout).ok()?;
        GsmTime::parse_cclk(&reply)
    }

    /// Runs the bring-up sequence. Every command is attempted even if an
    /// earlier one failed; the first failure is returned.
    pub fn initialize(&mut self) -> Result<(), Error> {
        info!("Initializing modem...");
        let config = *self.config;
        self.settle(config.power_up_delay);

        let mut first_error = None;
        let mut run = |session: &mut Self, command: &str| {
            if let Err(e) = session.send(command, config.command_timeout) {
                warn!("{} failed: {}", command, e);
                first_error.get_or_insert(e);
            }
            session.settle(config.settle_delay);
        };

        run(self, "AT");
        run(self, "ATE1");
        run(self, "AT+CMEE=2");
        run(self, if config.caller_id { "AT+CLIP=1" } else { "AT+CLIP=0" });
        run(self, if config.auto_time_zone { "AT+CTZU=1" } else { "AT+CTZU=0" });
        run(self, if config.time_zone_reports { "AT+CTZR=1" } else { "AT+CTZR=0" });

        match first_error {
            None => {
                info!("Modem init complete");
                Ok(())
            }
            Some(e) => Err(e),
        }
    }

    /// Pushes the time zone and caller-ID switches of `config` to the modem.
    pub fn apply_settings(&mut self, config: &ModemConfig) -> bool {
        let timeout = self.config.command_timeout;
        let mut all_ok = true;
        for (name, enabled) in [
            ("AT+CTZU", config.auto_time_zone),
            ("AT+CTZR", config.time_zone_reports),
            ("AT+CLIP", config.caller_id),
        ] {
            let mut cmd: String<MAX_COMMAND_LENGTH> = String::new();
            let _ = write!(cmd, "{}={}", name, enabled as u8);
            all_ok &= self.send_expect(&cmd, "OK", timeout);
        }
        all_ok
    }

    /// Logs identity, registration and SIM state of the modem.
    pub fn dump_settings(&mut self) {
        info!("=== Modem settings ===");
        let timeout = self.config.command_timeout;
        let delay = self.config.settings_dump_delay;
        for cmd in ["ATI", "AT+CSQ", "AT+CREG?", "AT+CGATT?", "AT+COPS?", "AT+CPIN?", "AT+CCID"] {
            if let Err(e) = self.send(cmd, timeout) {
                warn!("{} failed: {}", cmd, e);
            }
            self.settle(delay);
            self.flush();
        }
        info!("=== End of settings ===");
    }

    fn wait_for_prompt(&mut self, timeout: Duration) -> Result<(), Error> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            match self.transport.read_byte() {
                Some(PROMPT) => {
                    self.lines.reset();
                    return Ok(());
                }
                Some(b) => {
                    let _ = self.lines.feed(b);
                }
                None => {}
            }
        }
        Err(Error::Timeout)
    }

    fn wait_for_cmgs(&mut self, timeout: Duration) -> Result<(), Error> {
        self.read_lines(timeout, |line| {
            if line.contains(CMGS_MARKER) {
                Some(Ok(()))
            } else if is_error_line(line) {
                Some(Err(Error::ModemError))
            } else {
                // A bare OK may come before +CMGS.
                None
            }
        })?
    }

    /// Sends one SMS right away, outside the queue.
    pub fn send_sms(&mut self, recipients: &str, message: &str) -> Result<(), Error> {
        let config = *self.config;

        if let Err(e) = self.send("AT+CMGF=1", config.command_timeout) {
            error!("AT+CMGF failed: {}", e);
            return Err(e);
        }
        self.settle(config.cmd_interval);

        let mut header: String<MAX_COMMAND_LENGTH> = String::new();
        write!(header, "AT+CMGS=\"{}\"", recipients).map_err(|_| Error::TooLong)?;
        self.flush();
        debug!("> {}", header.as_str());
        self.transport.write_line(&header);

        if let Err(e) = self.wait_for_prompt(config.prompt_timeout) {
            error!("No SMS prompt: {}", e);
            return Err(e);
        }
        self.settle(config.cmd_interval);

        self.transport.write(message.as_bytes());
        self.transport.write(&[CTRL_Z]);

        match self.wait_for_cmgs(config.sms_timeout) {
            Ok(()) => {
                info!("SMS to {} sent", recipients);
                Ok(())
            }
            Err(e) => {
                error!("SMS to {} failed: {}", recipients, e);
                Err(e)
            }
        }
    }
}
