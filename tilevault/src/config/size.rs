//! Human-readable size parsing (e.g., "100MB", "20KB").

use thiserror::Error;

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

/// Error parsing a size string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{input}' - expected format like '100MB', '20KB', or '1GB'")]
pub struct SizeParseError {
    input: String,
}

/// Parse a human-readable size string into bytes.
///
/// Accepts bare byte counts and `K`/`KB`, `M`/`MB`, `G`/`GB` suffixes, case
/// insensitive, with optional whitespace before the suffix.
///
/// # Examples
///
/// ```
/// use tilevault::config::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("20KB").unwrap(), 20 * 1024);
/// assert_eq!(parse_size("100 mb").unwrap(), 100 * 1024 * 1024);
/// ```
pub fn parse_size(s: &str) -> Result<u64, SizeParseError> {
    let trimmed = s.trim();
    let err = || SizeParseError {
        input: trimmed.to_string(),
    };

    let upper = trimmed.to_ascii_uppercase();
    let (digits, multiplier) = [("GB", GB), ("G", GB), ("MB", MB), ("M", MB), ("KB", KB), ("K", KB)]
        .iter()
        .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|rest| (rest, *mult)))
        .unwrap_or((upper.as_str(), 1));

    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }

    let value: u64 = digits.parse().map_err(|_| err())?;
    value.checked_mul(multiplier).ok_or_else(err)
}

/// Format a byte count using the largest exact unit.
///
/// ```
/// use tilevault::config::format_size;
///
/// assert_eq!(format_size(100 * 1024 * 1024), "100MB");
/// assert_eq!(format_size(1000), "1000");
/// ```
pub fn format_size(bytes: u64) -> String {
    if bytes >= GB && bytes % GB == 0 {
        format!("{}GB", bytes / GB)
    } else if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        bytes.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(parse_size("0").unwrap(), 0);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("1kb").unwrap(), 1024);
        assert_eq!(parse_size("2M").unwrap(), 2 * MB);
        assert_eq!(parse_size(" 3 GB ").unwrap(), 3 * GB);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_size("").is_err());
        assert!(parse_size("MB").is_err());
        assert!(parse_size("-1MB").is_err());
        assert!(parse_size("1.5GB").is_err());
        assert!(parse_size("2TB").is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(20 * KB), "20KB");
        assert_eq!(format_size(GB), "1GB");
        assert_eq!(format_size(1500), "1500");
    }
}
