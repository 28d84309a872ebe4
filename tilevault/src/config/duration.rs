//! Human-readable duration parsing (e.g., "24h", "30m", "7d").

use std::time::Duration;

use thiserror::Error;

/// Error parsing a duration string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid duration '{input}' - expected format like '24h', '30m', '7d', or seconds")]
pub struct DurationParseError {
    input: String,
}

/// Parse a duration with an optional `s`, `m`, `h` or `d` suffix.
///
/// A bare number is seconds.
///
/// ```
/// use std::time::Duration;
/// use tilevault::config::parse_duration;
///
/// assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
/// assert_eq!(parse_duration("24h").unwrap(), Duration::from_secs(86_400));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, DurationParseError> {
    let trimmed = s.trim();
    let err = || DurationParseError {
        input: trimmed.to_string(),
    };

    let lower = trimmed.to_ascii_lowercase();
    let (digits, unit_secs) = match lower.char_indices().last() {
        Some((i, 's')) => (&lower[..i], 1),
        Some((i, 'm')) => (&lower[..i], 60),
        Some((i, 'h')) => (&lower[..i], 3600),
        Some((i, 'd')) => (&lower[..i], 86_400),
        Some(_) => (lower.as_str(), 1),
        None => return Err(err()),
    };

    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }

    let value: u64 = digits.parse().map_err(|_| err())?;
    value
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(err)
}

/// Format a duration using the largest exact unit.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        0 => "0s".to_string(),
        s if s % 86_400 == 0 => format!("{}d", s / 86_400),
        s if s % 3600 == 0 => format!("{}h", s / 3600),
        s if s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{}s", s),
    }
}
