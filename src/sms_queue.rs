// /src/sms_queue.rs
use heapless::String;

use crate::constants::{MAX_PHONE_LENGTH, MAX_SMS_LENGTH, SMS_QUEUE_CAPACITY};
use crate::error::Error;

/// One pending outbound message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SmsTask {
    pub recipients: String<MAX_PHONE_LENGTH>,
    pub message: String<MAX_SMS_LENGTH>,
}

impl SmsTask {
    pub fn new(recipients: &str, message: &str) -> Result<Self, Error> {
        let mut task = SmsTask::default();
        task.recipients.push_str(recipients).map_err(|_| Error::TooLong)?;
        task.message.push_str(message).map_err(|_| Error::TooLong)?;
        Ok(task)
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty() && self.message.is_empty()
    }
}

// One slot always stays free so that `head == tail` means empty.
const SLOTS: usize = SMS_QUEUE_CAPACITY + 1;

/// Fixed-size FIFO of [`SmsTask`]s.
pub struct SmsTaskQueue {
    buffer: [Option<SmsTask>; SLOTS],
    head: usize,
    tail: usize,
}

impl SmsTaskQueue {
    pub const fn new() -> Self {
        Self {
            buffer: [const { None }; SLOTS],
            head: 0,
            tail: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        (self.tail + 1) % SLOTS == self.head
    }

    /// Appends `task`; returns `false` (and drops nothing already queued)
    /// when all [`SMS_QUEUE_CAPACITY`] slots are taken.
    pub fn enqueue(&mut self, task: SmsTask) -> bool {
        if self.is_full() {
            return false;
        }
        self.buffer[self.tail] = Some(task);
        self.tail = (self.tail + 1) % SLOTS;
        true
    }

    pub fn dequeue(&mut self) -> Option<SmsTask> {
        if self.is_empty() {
            return None;
        }
        let task = self.buffer[self.head].take();
        self.head = (self.head + 1) % SLOTS;
        task
    }

    pub fn size(&self) -> usize {
        (self.tail + SLOTS - self.head) % SLOTS
    }

    /// The task `index` positions behind the head (0 = next to be sent).
    pub fn task_at(&self, index: usize) -> Option<&SmsTask> {
        if index >= self.size() {
            return None;
        }
        self.buffer[(self.head + index) % SLOTS].as_ref()
    }

    pub const fn capacity(&self) -> usize {
        SMS_QUEUE_CAPACITY
    }
}

impl Default for SmsTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
