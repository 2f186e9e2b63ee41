// /src/custom_strings.rs
//! Small scanners for AT reply lines.

use crate::constants::{COPS_MARKER, CSQ_MARKER};

/// Returns the substring after `delimiter`, if present.
pub fn extract_after_delimiter<'a>(input: &'a str, delimiter: &str) -> Option<&'a str> {
    input.split_once(delimiter).map(|(_, suffix)| suffix)
}

/// Returns the first substring found between `start_delim` and `end_delim`, if present.
///
/// ```
/// use smsgate::custom_strings::extract_between_delimiters;
///
/// let s = r#"+CLIP: "+420123456789",129,"",0,"",0"#;
/// assert_eq!(extract_between_delimiters(s, "\"", "\""), Some("+420123456789"));
/// ```
pub fn extract_between_delimiters<'a>(
    input: &'a str,
    start_delim: &str,
    end_delim: &str,
) -> Option<&'a str> {
    let start_index = input.find(start_delim)?;
    let after_start = &input[start_index + start_delim.len()..];

    let end_index = after_start.find(end_delim)?;
    Some(&after_start[..end_index])
}

/// Strips exactly one leading `+` from an international number.
pub fn strip_plus(number: &str) -> &str {
    number.strip_prefix('+').unwrap_or(number)
}

/// Reads the RSSI field of a `+CSQ: <rssi>,<ber>` reply anywhere in `reply`.
pub fn parse_signal_quality(reply: &str) -> Option<u8> {
    let after = extract_after_delimiter(reply, CSQ_MARKER)?;
    let field = after.split([',', '\n']).next()?;
    field.trim().parse().ok()
}

/// Reads the quoted operator name of a `+COPS: <mode>,<format>,"<oper>"` reply.
pub fn parse_operator(reply: &str) -> Option<&str> {
    let after = extract_after_delimiter(reply, COPS_MARKER)?;
    let line = after.lines().next()?;
    extract_between_delimiters(line, "\"", "\"")
}
