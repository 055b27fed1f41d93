/*!
 * Time-code codec shared by every subtitle format.
 *
 * Three textual forms are supported:
 * - SRT: `HH:MM:SS,mmm`
 * - VTT: `HH:MM:SS.mmm` (the hour part may be omitted)
 * - ASS: `H:MM:SS.cc`
 *
 * All of them convert to and from plain seconds (`f64`). Cross-format conversions
 * always go through seconds so precision loss happens in exactly one place.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;

static SRT_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2}):(\d{2}),(\d{3})$").unwrap()
});

static VTT_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d{2,}):)?(\d{2}):(\d{2})\.(\d{3})$").unwrap()
});

static ASS_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):(\d{2}):(\d{2})\.(\d{2})$").unwrap()
});

const MILLIS_PER_HOUR: u64 = 3_600_000;
const MILLIS_PER_MINUTE: u64 = 60_000;
const MILLIS_PER_SECOND: u64 = 1_000;

/// How a malformed ASS time string is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeParseMode {
    /// Reject with a `FormatError`
    #[default]
    Strict,
    /// Substitute `0.0`
    Lenient,
}

impl TimeParseMode {
    /// Map the `codec.lenient_ass_time` config flag to a mode
    pub fn from_lenient_flag(lenient: bool) -> Self {
        if lenient { Self::Lenient } else { Self::Strict }
    }
}

/// Parse an SRT timestamp (`HH:MM:SS,mmm`) into seconds
pub fn parse_srt_time(text: &str) -> Result<f64, SubtitleError> {
    let trimmed = text.trim();
    let caps = SRT_TIME_REGEX
        .captures(trimmed)
        .ok_or_else(|| SubtitleError::format(format!("invalid SRT timestamp: '{}'", trimmed)))?;
    compose(&caps, 1000, trimmed)
}

/// Parse a VTT timestamp (`HH:MM:SS.mmm` or `MM:SS.mmm`) into seconds
pub fn parse_vtt_time(text: &str) -> Result<f64, SubtitleError> {
    let trimmed = text.trim();
    let caps = VTT_TIME_REGEX
        .captures(trimmed)
        .ok_or_else(|| SubtitleError::format(format!("invalid VTT timestamp: '{}'", trimmed)))?;
    compose(&caps, 1000, trimmed)
}

/// Parse an ASS timestamp (`H:MM:SS.cc`) into seconds, rejecting malformed input
pub fn parse_ass_time(text: &str) -> Result<f64, SubtitleError> {
    let trimmed = text.trim();
    let caps = ASS_TIME_REGEX
        .captures(trimmed)
        .ok_or_else(|| SubtitleError::format(format!("invalid ASS timestamp: '{}'", trimmed)))?;
    compose(&caps, 100, trimmed)
}

/// Parse an ASS timestamp with an explicit policy for malformed input
pub fn parse_ass_time_with(text: &str, mode: TimeParseMode) -> Result<f64, SubtitleError> {
    match (parse_ass_time(text), mode) {
        (Ok(seconds), _) => Ok(seconds),
        (Err(_), TimeParseMode::Lenient) => Ok(0.0),
        (Err(e), TimeParseMode::Strict) => Err(e),
    }
}

/// Format seconds as an ASS timestamp, truncating to centiseconds
pub fn format_ass_time(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_millis(seconds_to_millis(seconds));
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, millis / 10)
}

/// Format seconds as an SRT timestamp
pub fn format_srt_time(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_millis(seconds_to_millis(seconds));
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Format seconds as a VTT timestamp (hours always present)
pub fn format_vtt_time(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_millis(seconds_to_millis(seconds));
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Convert `H:MM:SS.cc` to `HH:MM:SS,mmm`
pub fn ass_time_to_srt_time(text: &str) -> Result<String, SubtitleError> {
    parse_ass_time(text).map(format_srt_time)
}

/// Convert `H:MM:SS.cc` to `HH:MM:SS.mmm`
pub fn ass_time_to_vtt_time(text: &str) -> Result<String, SubtitleError> {
    parse_ass_time(text).map(format_vtt_time)
}

/// Convert `HH:MM:SS,mmm` to `H:MM:SS.cc`
pub fn srt_time_to_ass_time(text: &str) -> Result<String, SubtitleError> {
    parse_srt_time(text).map(format_ass_time)
}

/// Convert `HH:MM:SS.mmm` to `H:MM:SS.cc`
pub fn vtt_time_to_ass_time(text: &str) -> Result<String, SubtitleError> {
    parse_vtt_time(text).map(format_ass_time)
}

/// Snap seconds to whole milliseconds.
///
/// Float noise below half a millisecond is rounded away before any truncation to
/// centiseconds happens, so `0.29` formats as `.29` and not `.28`. Negative and
/// non-finite values become zero.
pub fn seconds_to_millis(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0).round() as u64
}

fn split_millis(total: u64) -> (u64, u64, u64, u64) {
    let hours = total / MILLIS_PER_HOUR;
    let minutes = (total % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    let secs = (total % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
    let millis = total % MILLIS_PER_SECOND;
    (hours, minutes, secs, millis)
}

// Groups 1-4 are hours (optional), minutes, seconds and the sub-second fraction
// expressed in `units_per_second`.
fn compose(caps: &Captures, units_per_second: u64, input: &str) -> Result<f64, SubtitleError> {
    let field = |idx: usize| -> Result<u64, SubtitleError> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse::<u64>().map_err(|_| {
                SubtitleError::format(format!("timestamp component out of range in '{}'", input))
            }),
            None => Ok(0),
        }
    };

    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let fraction = field(4)?;

    if minutes >= 60 || seconds >= 60 {
        return Err(SubtitleError::format(format!(
            "invalid time components in timestamp: '{}'",
            input
        )));
    }

    let whole = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .and_then(|s| s.checked_mul(units_per_second))
        .and_then(|u| u.checked_add(fraction))
        .ok_or_else(|| SubtitleError::format(format!("timestamp too large: '{}'", input)))?;

    // Dividing the integer total keeps `n / 100` exactly representable round trips.
    Ok(whole as f64 / units_per_second as f64)
}
