// /src/call_session.rs
use heapless::String;

use crate::constants::*;
use crate::custom_strings::{extract_between_delimiters, strip_plus};
use crate::error::Error;
use crate::ports::{CallLog, CallerNotifier, WallClock};

/// Number of `RING`s tolerated before the gateway hangs up.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RingPolicy {
    threshold: u8,
}

impl RingPolicy {
    pub fn new(threshold: u8) -> Result<Self, Error> {
        if (MIN_RING_THRESHOLD..=MAX_RING_THRESHOLD).contains(&threshold) {
            Ok(Self { threshold })
        } else {
            Err(Error::InvalidRingThreshold)
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }
}

impl Default for RingPolicy {
    fn default() -> Self {
        Self { threshold: DEFAULT_RING_THRESHOLD }
    }
}

/// State of the call currently ringing, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallSession {
    pub clip_seen: bool,
    pub ring_count: u16,
    pub last_caller: String<MAX_PHONE_LENGTH>,
    pub call_logged: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallAction {
    None,
    /// The ring threshold was reached; the driver must send `ATH`.
    HangUp,
}

/// Caller-ID and ring counting on top of the URC line stream.
pub struct CallHandler {
    session: CallSession,
    policy: RingPolicy,
}

impl CallHandler {
    pub fn new(policy: RingPolicy) -> Self {
        Self {
            session: CallSession::default(),
            policy,
        }
    }

    pub fn session(&self) -> &CallSession {
        &self.session
    }

    pub fn policy(&self) -> RingPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: RingPolicy) {
        self.policy = policy;
    }

    /// Inspects one modem line. Lines other than `+CLIP:` and `RING` are ignored.
    pub fn handle_line<P>(&mut self, line: &str, ports: &mut P) -> CallAction
    where
        P: CallerNotifier + CallLog + WallClock,
    {
        if let Some(rest) = line.strip_prefix(CLIP_MARKER) {
            if let Err(e) = self.on_clip(rest, ports) {
                warn!("CLIP parse error: {} ({})", line, e);
            }
            CallAction::None
        } else if self.session.clip_seen && line == RING_URC {
            self.on_ring()
        } else {
            CallAction::None
        }
    }

    fn on_clip<P>(&mut self, fields: &str, ports: &mut P) -> Result<(), Error>
    where
        P: CallerNotifier + CallLog + WallClock,
    {
        let raw = extract_between_delimiters(fields, "\"", "\"").ok_or(Error::Parse)?;
        let number = strip_plus(raw);

        let mut caller = String::new();
        caller.push_str(number).map_err(|_| Error::TooLong)?;

        info!("Caller ID: {}", number);
        self.session.last_caller = caller;
        self.session.clip_seen = true;
        self.session.ring_count = 0;

        ports.notify_caller(number);

        if !self.session.call_logged {
            let timestamp = ports.now().to_iso();
            ports.append(raw, &timestamp);
            self.session.call_logged = true;
        }
        Ok(())
    }

    fn on_ring(&mut self) -> CallAction {
        self.session.ring_count = self.session.ring_count.saturating_add(1);
        debug!("RING #{}", self.session.ring_count);

        if self.session.ring_count >= self.policy.threshold() as u16 {
            info!("Hanging up after {} rings", self.session.ring_count);
            self.reset();
            return CallAction::HangUp;
        }
        CallAction::None
    }

    /// Arms detection for the next call.
    pub fn reset(&mut self) {
        self.session.clip_seen = false;
        self.session.ring_count = 0;
        self.session.call_logged = false;
    }
}
