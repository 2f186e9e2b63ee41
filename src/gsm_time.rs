// /src/gsm_time.rs
use core::fmt::Write;

use heapless::{String, Vec};

use crate::constants::{CCLK_MARKER, TIMESTAMP_LENGTH};
use crate::custom_strings::{extract_after_delimiter, extract_between_delimiters};

pub type Timestamp = String<TIMESTAMP_LENGTH>;

/// Calendar time as kept by the modem and the board RTC (two-digit year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GsmTime {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl GsmTime {
    fn parse_u8(s: &str) -> Option<u8> {
        let mut result = 0u8;
        for byte in s.bytes() {
            if !byte.is_ascii_digit() {
                return None;
            }
            result = result.checked_mul(10)?.checked_add(byte - b'0')?;
        }
        Some(result)
    }

    fn parse_year(s: &str) -> Option<u8> {
        let mut result = 0u16;
        for byte in s.bytes() {
            if !byte.is_ascii_digit() {
                return None;
            }
            result = result.checked_mul(10)?.checked_add((byte - b'0') as u16)?;
        }
        Some((result % 100) as u8)
    }

    /// Parses `yy/MM/dd,hh:mm:ss` with an optional `±zz` quarter-hour zone suffix.
    pub fn parse(date: &str) -> Option<GsmTime> {
        let date = date.trim();
        // The zone sign can only appear after the date part.
        let clock = match date.get(8..).and_then(|tail| tail.find(['+', '-'])) {
            Some(offset) => &date[..8 + offset],
            None => date,
        };

        let parts: Vec<&str, 8> = clock
            .split(['/', ',', ':'])
            .filter(|part| !part.is_empty())
            .take(8)
            .collect();

        if parts.len() != 6 {
            return None;
        }

        let time = GsmTime {
            year: Self::parse_year(parts[0])?,
            month: Self::parse_u8(parts[1])?,
            day: Self::parse_u8(parts[2])?,
            hour: Self::parse_u8(parts[3])?,
            minute: Self::parse_u8(parts[4])?,
            second: Self::parse_u8(parts[5])?,
        };

        if !(1..=12).contains(&time.month)
            || !(1..=31).contains(&time.day)
            || time.hour > 23
            || time.minute > 59
            || time.second > 59
        {
            return None;
        }

        Some(time)
    }

    /// Parses a whole `+CCLK: "..."` reply.
    pub fn parse_cclk(reply: &str) -> Option<GsmTime> {
        let after = extract_after_delimiter(reply, CCLK_MARKER)?;
        let quoted = extract_between_delimiters(after, "\"", "\"")?;
        Self::parse(quoted)
    }

    /// ISO-8601 local time, `20YY-MM-DDTHH:MM:SS`.
    pub fn to_iso(&self) -> Timestamp {
        let mut out = Timestamp::new();
        // 19 characters always fit
        let _ = write!(
            out,
            "20{:02}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        );
        out
    }
}
