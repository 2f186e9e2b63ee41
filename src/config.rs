// /src/config.rs
use embassy_time::Duration;

use crate::constants::*;

/// Runtime-tunable modem settings.
///
/// Defaults match the values the gateway ships with; the admin layer may
/// load a different set from storage before the driver is built.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModemConfig {
    pub baud_rate: u32,
    /// Pause before the `AT+CMGS` header and before the message body.
    pub cmd_interval: Duration,
    pub prompt_timeout: Duration,
    pub sms_timeout: Duration,
    /// Reply deadline for plain commands issued by the blocking helper.
    pub command_timeout: Duration,
    /// Pause after each command of the init sequence.
    pub settle_delay: Duration,
    pub power_up_delay: Duration,
    /// Pause after each query of the settings dump.
    pub settings_dump_delay: Duration,
    /// Network time zone update (`AT+CTZU`).
    pub auto_time_zone: bool,
    /// Time zone change reporting (`AT+CTZR`).
    pub time_zone_reports: bool,
    /// Calling line identification (`AT+CLIP`).
    pub caller_id: bool,
    pub ring_threshold: u8,
}

impl ModemConfig {
    pub const fn new() -> Self {
        Self {
            baud_rate: SIM800_BAUD_RATE,
            cmd_interval: CMD_INTERVAL,
            prompt_timeout: SMS_PROMPT_TIMEOUT,
            sms_timeout: SMS_TIMEOUT,
            command_timeout: COMMAND_TIMEOUT,
            settle_delay: INIT_SETTLE_DELAY,
            power_up_delay: INIT_POWER_UP_DELAY,
            settings_dump_delay: SETTINGS_DUMP_DELAY,
            auto_time_zone: true,
            time_zone_reports: true,
            caller_id: true,
            ring_threshold: DEFAULT_RING_THRESHOLD,
        }
    }
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self::new()
    }
}
