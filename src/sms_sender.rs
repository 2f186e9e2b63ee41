// /src/sms_sender.rs
//! Non-blocking SMS send protocol, one queued task at a time.
//!
//! The sender is advanced by [`SmsSender::step`] from the driver tick and
//! fed with everything the modem says through [`SmsSender::observe_byte`] and
//! [`SmsSender::observe_line`]. Each call to `step` performs at most one
//! state transition and never waits for the modem.

use core::fmt::Write;

use embassy_time::{Duration, Instant};
use heapless::String;

use crate::config::ModemConfig;
use crate::constants::*;
use crate::error::Error;
use crate::sms_queue::{SmsTask, SmsTaskQueue};
use crate::transport::Transport;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SmsState {
    #[default]
    Idle,
    SetTextMode,
    SendHeader,
    WaitPrompt,
    SendBody,
    WaitOk,
    Done,
    Error,
}

/// How a dequeued task ended.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SmsOutcome {
    pub task: SmsTask,
    pub result: Result<(), Error>,
}

/// Raw modem output since the last transition, capped at
/// [`RESPONSE_BUFFER_SIZE`]. On overflow the older text is discarded so the
/// newest reply can still be matched.
struct ResponseBuffer {
    text: String<RESPONSE_BUFFER_SIZE>,
}

impl ResponseBuffer {
    const fn new() -> Self {
        Self { text: String::new() }
    }

    fn clear(&mut self) {
        self.text.clear();
    }

    fn push_byte(&mut self, b: u8) {
        if self.text.len() == self.text.capacity() {
            self.text.clear();
        }
        // Non-ASCII bytes are irrelevant to the markers we scan for.
        let _ = self.text.push(if b.is_ascii() { b as char } else { '?' });
    }

    fn push_line(&mut self, line: &str) {
        if self.text.len() + line.len() + 1 > RESPONSE_BUFFER_SIZE {
            self.text.clear();
        }
        if self.text.push_str(line).is_err() || self.text.push('\n').is_err() {
            warn!("Response line longer than buffer, ignored");
            self.text.clear();
        }
    }

    fn contains(&self, marker: &str) -> bool {
        self.text.contains(marker)
    }

    fn contains_byte(&self, b: u8) -> bool {
        self.text.as_bytes().contains(&b)
    }
}

pub struct SmsSender {
    state: SmsState,
    current: Option<SmsTask>,
    state_entered: Instant,
    response: ResponseBuffer,
    cmd_interval: Duration,
    prompt_timeout: Duration,
    sms_timeout: Duration,
}

impl SmsSender {
    pub fn new(config: &ModemConfig) -> Self {
        Self {
            state: SmsState::Idle,
            current: None,
            state_entered: Instant::from_ticks(0),
            response: ResponseBuffer::new(),
            cmd_interval: config.cmd_interval,
            prompt_timeout: config.prompt_timeout,
            sms_timeout: config.sms_timeout,
        }
    }

    pub fn state(&self) -> SmsState {
        self.state
    }

    /// The task being sent, if any.
    pub fn current_task(&self) -> Option<&SmsTask> {
        self.current.as_ref()
    }

    /// Raw byte tap. The `>` prompt arrives without a line terminator, so
    /// the prompt wait has to look at bytes rather than lines.
    pub fn observe_byte(&mut self, b: u8) {
        if self.state == SmsState::WaitPrompt {
            self.response.push_byte(b);
        }
    }

    /// Response matcher for completed lines.
    pub fn observe_line(&mut self, line: &str) {
        if self.state == SmsState::WaitOk {
            self.response.push_line(line);
        }
    }

    fn enter(&mut self, next: SmsState, now: Instant) {
        debug!("SMS state {} -> {}", self.state, next);
        self.state = next;
        self.state_entered = now;
        self.response.clear();
    }

    fn elapsed(&self, now: Instant) -> Duration {
        now.checked_duration_since(self.state_entered)
            .unwrap_or(Duration::from_ticks(0))
    }

    fn finish(&mut self, next: SmsState, result: Result<(), Error>, now: Instant) -> Option<SmsOutcome> {
        self.enter(next, now);
        let task = self.current.take().unwrap_or_default();
        match result {
            Ok(()) => info!("SMS to {} sent", task.recipients),
            Err(e) => error!("SMS to {} failed: {}", task.recipients, e),
        }
        Some(SmsOutcome { task, result })
    }

    /// Advances the protocol by at most one transition.
    ///
    /// Returns the outcome of the task when it reaches `Done` or `Error`.
    pub fn step<T: Transport>(
        &mut self,
        now: Instant,
        queue: &mut SmsTaskQueue,
        transport: &mut T,
    ) -> Option<SmsOutcome> {
        match self.state {
            SmsState::Idle => {
                if let Some(task) = queue.dequeue() {
                    info!("Sending SMS to {}", task.recipients);
                    self.current = Some(task);
                    debug!("TX: AT+CMGF=1");
                    transport.write_line("AT+CMGF=1");
                    self.enter(SmsState::SetTextMode, now);
                }
                None
            }
            SmsState::SetTextMode => {
                if self.elapsed(now) >= self.cmd_interval {
                    self.enter(SmsState::SendHeader, now);
                }
                None
            }
            SmsState::SendHeader => {
                let mut cmd: String<MAX_COMMAND_LENGTH> = String::new();
                let recipients = self.current.as_ref().map(|t| t.recipients.as_str()).unwrap_or("");
                // Recipients are bounded well below the command capacity.
                let _ = write!(cmd, "AT+CMGS=\"{}\"", recipients);
                debug!("TX: {}", cmd.as_str());
                transport.write_line(&cmd);
                self.enter(SmsState::WaitPrompt, now);
                None
            }
            SmsState::WaitPrompt => {
                if self.response.contains_byte(PROMPT) {
                    debug!("Prompt received");
                    self.enter(SmsState::SendBody, now);
                    None
                } else if self.elapsed(now) >= self.prompt_timeout {
                    warn!("Timeout waiting for SMS prompt");
                    self.finish(SmsState::Error, Err(Error::Timeout), now)
                } else {
                    None
                }
            }
            SmsState::SendBody => {
                if self.elapsed(now) >= self.cmd_interval {
                    if let Some(task) = self.current.as_ref() {
                        transport.write(task.message.as_bytes());
                    }
                    transport.write(&[CTRL_Z]);
                    self.enter(SmsState::WaitOk, now);
                }
                None
            }
            SmsState::WaitOk => {
                if self.response.contains(CMGS_MARKER) {
                    self.finish(SmsState::Done, Ok(()), now)
                } else if self.response.contains(ERROR_MARKER) {
                    self.finish(SmsState::Error, Err(Error::ModemError), now)
                } else if self.elapsed(now) >= self.sms_timeout {
                    self.finish(SmsState::Error, Err(Error::Timeout), now)
                } else {
                    None
                }
            }
            SmsState::Done | SmsState::Error => {
                self.enter(SmsState::Idle, now);
                None
            }
        }
    }
}
