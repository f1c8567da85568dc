//! Conversions between `HH:MM:SS` duration strings and total seconds.
//!
//! Timer entities report their configured duration as a colon-separated
//! string, and the card renders remaining time in the same shape. Both
//! directions live here so the round-trip law holds in one place:
//! `parse_duration(&format_duration(s)) == Ok(s)` for every `s`.
//!
//! # Examples
//!
//! ```rust
//! use timer_card::duration::{format_duration, parse_duration};
//!
//! assert_eq!(parse_duration("00:01:30"), Ok(90));
//! assert_eq!(format_duration(90), "00:01:30");
//! ```

use thiserror::Error;

/// Error returned when a duration string is not valid `HH:MM:SS`.
///
/// Callers in the display path recover from this locally (the value is
/// treated as unknown); it is never allowed to take the card down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The string did not split into exactly three `:`-separated segments.
    #[error("expected HH:MM:SS, got {0} segment(s)")]
    SegmentCount(usize),
    /// A segment was not an unsigned integer.
    #[error("non-numeric duration segment {0:?}")]
    BadSegment(String),
}

/// Parses an `HH:MM:SS` duration into total seconds.
///
/// The hours segment may exceed two digits. Segments are not range-checked
/// beyond being unsigned integers, so `"00:99:00"` parses to 5940; this is
/// lenient on purpose, since the card only ever consumes values the host
/// produced.
///
/// # Examples
///
/// ```rust
/// use timer_card::duration::parse_duration;
///
/// assert_eq!(parse_duration("01:00:00"), Ok(3600));
/// assert_eq!(parse_duration("100:00:05"), Ok(360_005));
/// assert!(parse_duration("5m").is_err());
/// ```
pub fn parse_duration(text: &str) -> Result<u64, FormatError> {
    let segments: Vec<&str> = text.split(':').collect();
    if segments.len() != 3 {
        return Err(FormatError::SegmentCount(segments.len()));
    }

    let mut total: u64 = 0;
    for segment in segments {
        let value = segment
            .parse::<u64>()
            .map_err(|_| FormatError::BadSegment(segment.to_string()))?;
        total = total * 60 + value;
    }
    Ok(total)
}

/// Formats total seconds as zero-padded `HH:MM:SS`.
///
/// The hours field widens past two digits when needed, mirroring what
/// [`parse_duration`] accepts.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}
