// /src/transport.rs
use crate::constants::SIM800_LINE_BUFFER_SIZE;

/// The character link to the modem.
///
/// Reads never block: the driver drains whatever the UART has buffered and
/// returns to its tick. Write failures are not reported; a modem that stops
/// listening shows up as reply timeouts.
pub trait Transport {
    /// Next received byte, or `None` if nothing is waiting.
    fn read_byte(&mut self) -> Option<u8>;

    fn write(&mut self, bytes: &[u8]);

    /// Writes `line` followed by CR LF.
    fn write_line(&mut self, line: &str) {
        self.write(line.as_bytes());
        self.write(b"\r\n");
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }

    fn write(&mut self, bytes: &[u8]) {
        (**self).write(bytes)
    }
}

/// Accumulates modem output into trimmed lines.
pub struct LineAssembler {
    buf: [u8; SIM800_LINE_BUFFER_SIZE],
    pos: usize,
    overflowed: bool,
}

impl LineAssembler {
    pub const fn new() -> Self {
        Self {
            buf: [0; SIM800_LINE_BUFFER_SIZE],
            pos: 0,
            overflowed: false,
        }
    }

    /// Feeds one byte; returns the completed line when `b` is a line feed.
    ///
    /// Empty lines (after trimming) and lines that overran the buffer are
    /// swallowed. The returned slice stays valid until the next call.
    pub fn feed(&mut self, b: u8) -> Option<&str> {
        if b != b'\n' {
            if self.pos < self.buf.len() {
                self.buf[self.pos] = b;
                self.pos += 1;
            } else {
                self.overflowed = true;
            }
            return None;
        }

        let len = self.pos;
        let overflowed = self.overflowed;
        self.pos = 0;
        self.overflowed = false;

        if overflowed {
            warn!("Dropping over-long modem line ({} bytes kept)", len);
            return None;
        }

        let Ok(text) = core::str::from_utf8(&self.buf[..len]) else {
            warn!("Dropping non-UTF-8 modem line");
            return None;
        };
        let clean = text.trim();
        if clean.is_empty() {
            return None;
        }

        Some(clean)
    }

    /// Forgets a partially received line.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.overflowed = false;
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}
