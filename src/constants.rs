// /src/constants.rs
use embassy_time::Duration;

pub const SMS_QUEUE_CAPACITY: usize = 8;
pub const MAX_PHONE_LENGTH: usize = 24;
pub const MAX_SMS_LENGTH: usize = 160;

pub const SIM800_LINE_BUFFER_SIZE: usize = 128;
pub const RESPONSE_BUFFER_SIZE: usize = 256;
pub const QUERY_BUFFER_SIZE: usize = 256;
pub const MAX_COMMAND_LENGTH: usize = 64;
pub const MAX_OPERATOR_LENGTH: usize = 32;
pub const TIMESTAMP_LENGTH: usize = 20;

pub const CALL_LOG_CAPACITY: usize = 10;

pub const MIN_RING_THRESHOLD: u8 = 1;
pub const MAX_RING_THRESHOLD: u8 = 14;
pub const DEFAULT_RING_THRESHOLD: u8 = 1;

pub const CMD_INTERVAL: Duration = Duration::from_millis(200);
pub const SMS_PROMPT_TIMEOUT: Duration = Duration::from_secs(10);
pub const SMS_TIMEOUT: Duration = Duration::from_secs(15);
pub const COMMAND_TIMEOUT: Duration = Duration::from_millis(1000);
pub const INIT_SETTLE_DELAY: Duration = Duration::from_millis(200);
pub const INIT_POWER_UP_DELAY: Duration = Duration::from_millis(1000);
pub const SETTINGS_DUMP_DELAY: Duration = Duration::from_millis(1500);
pub const QUEUE_STATUS_LOG_INTERVAL: Duration = Duration::from_secs(15);

pub const SIM800_BAUD_RATE: u32 = 115_200;

pub const CTRL_Z: u8 = 0x1A;
pub const PROMPT: u8 = b'>';

pub const CMGS_MARKER: &str = "+CMGS:";
pub const ERROR_MARKER: &str = "ERROR";
pub const CLIP_MARKER: &str = "+CLIP:";
pub const CSQ_MARKER: &str = "+CSQ:";
pub const COPS_MARKER: &str = "+COPS:";
pub const CCLK_MARKER: &str = "+CCLK:";
pub const RING_URC: &str = "RING";
pub const UNKNOWN_OPERATOR: &str = "--";
