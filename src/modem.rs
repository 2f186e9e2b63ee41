// /src/modem.rs
use embassy_time::Instant;

use crate::call_session::{CallAction, CallHandler, CallSession, RingPolicy};
use crate::command::CommandSession;
use crate::config::ModemConfig;
use crate::constants::QUEUE_STATUS_LOG_INTERVAL;
use crate::error::Error;
use crate::ports::Ports;
use crate::sms_queue::{SmsTask, SmsTaskQueue};
use crate::sms_sender::{SmsOutcome, SmsSender, SmsState};
use crate::transport::{LineAssembler, Transport};

/// The modem driver: owns the serial link, the SMS queue, the send state
/// machine and the call session.
///
/// Call [`initialize`](Self::initialize) once, then [`tick`](Self::tick)
/// from the main loop. Blocking work goes through [`commands`](Self::commands),
/// which borrows the driver and so cannot overlap a tick, and is refused
/// while an SMS is in flight.
pub struct Modem<T: Transport, P: Ports> {
    transport: T,
    ports: P,
    config: ModemConfig,
    queue: SmsTaskQueue,
    sender: SmsSender,
    calls: CallHandler,
    lines: LineAssembler,
    ready: bool,
    /// `ATH` owed to the call handler, held back while the modem takes a
    /// message body.
    pending_hangup: bool,
    last_status_log: Option<Instant>,
}

impl<T: Transport, P: Ports> Modem<T, P> {
    pub fn new(transport: T, config: ModemConfig, mut ports: P) -> Self {
        let policy = match ports.load_ring_threshold().map(RingPolicy::new) {
            Some(Ok(policy)) => policy,
            Some(Err(e)) => {
                warn!("Stored ring threshold ignored: {}", e);
                RingPolicy::new(config.ring_threshold).unwrap_or_default()
            }
            None => RingPolicy::new(config.ring_threshold).unwrap_or_default(),
        };
        info!("Ring threshold: {}", policy.threshold());

        Self {
            transport,
            ports,
            config,
            queue: SmsTaskQueue::new(),
            sender: SmsSender::new(&config),
            calls: CallHandler::new(policy),
            lines: LineAssembler::new(),
            ready: false,
            pending_hangup: false,
            last_status_log: None,
        }
    }

    /// Runs the blocking init sequence and unlocks queue processing.
    ///
    /// Failed setup commands are logged and reported but do not keep the
    /// queue locked.
    pub fn initialize(&mut self) -> Result<(), Error> {
        let result = self.commands().and_then(|mut session| session.initialize());
        self.ready = true;
        result
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Exclusive blocking access to the modem.
    ///
    /// Refused with [`Error::Busy`] unless the send state machine is idle.
    pub fn commands(&mut self) -> Result<CommandSession<'_, T>, Error> {
        if self.sender.state() != SmsState::Idle {
            return Err(Error::Busy);
        }
        Ok(CommandSession::new(&mut self.transport, &self.config))
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// Queues a message. `false` means the queue is full (or the text does
    /// not fit); the caller has to back off.
    pub fn enqueue(&mut self, recipients: &str, message: &str) -> bool {
        match self.try_enqueue(recipients, message) {
            Ok(()) => true,
            Err(e) => {
                warn!("SMS to {} rejected: {}", recipients, e);
                false
            }
        }
    }

    /// Like [`enqueue`](Self::enqueue), but says why a message was refused.
    pub fn try_enqueue(&mut self, recipients: &str, message: &str) -> Result<(), Error> {
        let task = SmsTask::new(recipients, message)?;
        if !self.queue.enqueue(task) {
            return Err(Error::QueueFull);
        }
        debug!("SMS queued, {} waiting", self.queue.size());
        Ok(())
    }

    pub fn queue_size(&self) -> usize {
        self.queue.size()
    }

    /// Queued task at `index`, or an empty task when out of range.
    pub fn task_at(&self, index: usize) -> SmsTask {
        self.queue.task_at(index).cloned().unwrap_or_default()
    }

    /// Index 0 reports the live state machine; later entries have not
    /// started yet.
    pub fn task_state_at(&self, index: usize) -> SmsState {
        if index == 0 { self.sender.state() } else { SmsState::Idle }
    }

    pub fn state(&self) -> SmsState {
        self.sender.state()
    }

    pub fn current_task(&self) -> Option<&SmsTask> {
        self.sender.current_task()
    }

    pub fn ring_threshold(&self) -> u8 {
        self.calls.policy().threshold()
    }

    /// Validates, persists and applies a new ring threshold.
    pub fn set_ring_threshold(&mut self, rings: u8) -> Result<(), Error> {
        let policy = RingPolicy::new(rings)?;
        self.ports.store_ring_threshold(rings)?;
        self.calls.set_policy(policy);
        info!("Ring threshold set to {}", rings);
        Ok(())
    }

    pub fn call_session(&self) -> &CallSession {
        self.calls.session()
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut P {
        &mut self.ports
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Drains buffered serial input and dispatches every completed line to
    /// the call handler and the send state machine.
    pub fn poll_serial(&mut self) {
        while let Some(b) = self.transport.read_byte() {
            self.sender.observe_byte(b);
            if let Some(line) = self.lines.feed(b) {
                debug!("[URC] {}", line);
                if self.calls.handle_line(line, &mut self.ports) == CallAction::HangUp {
                    self.pending_hangup = true;
                }
                self.sender.observe_line(line);
            }
        }
        self.flush_hangup();
    }

    pub fn hangup_pending(&self) -> bool {
        self.pending_hangup
    }

    // Between `>` and Ctrl-Z every byte written becomes message text.
    fn flush_hangup(&mut self) {
        if !self.pending_hangup {
            return;
        }
        match self.sender.state() {
            SmsState::WaitPrompt | SmsState::SendBody => {
                debug!("Hang-up deferred until the body is sent");
            }
            _ => {
                debug!("> ATH");
                self.transport.write_line("ATH");
                self.pending_hangup = false;
            }
        }
    }

    /// One cooperative step: drain input, then advance the send state
    /// machine by at most one transition.
    ///
    /// Returns the outcome of a task that finished during this tick.
    pub fn tick(&mut self, now: Instant) -> Result<Option<SmsOutcome>, Error> {
        if !self.ready {
            return Err(Error::NotReady);
        }

        self.poll_serial();
        self.log_status(now);
        Ok(self.sender.step(now, &mut self.queue, &mut self.transport))
    }

    fn log_status(&mut self, now: Instant) {
        let due = match self.last_status_log {
            None => true,
            Some(last) => now
                .checked_duration_since(last)
                .is_some_and(|elapsed| elapsed >= QUEUE_STATUS_LOG_INTERVAL),
        };
        if due {
            info!("SMS state: {}, {} queued", self.sender.state(), self.queue.size());
            self.last_status_log = Some(now);
        }
    }
}
