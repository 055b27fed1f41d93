use once_cell::sync::Lazy;
use regex::Regex;
use log::debug;
use std::fmt::Write;

use crate::errors::SubtitleError;
use crate::subtitle_processor::TimedSegment;
use crate::text_normalizer::{normalize, strip_markup_tags};
use crate::timecode::{format_srt_time, parse_srt_time};

use super::normalize_line_endings;

// @const: SRT timing line, trailing position hints are ignored
static TIMING_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}:\d{2}:\d{2},\d{3})\s*-->\s*(\d{2,}:\d{2}:\d{2},\d{3})").unwrap()
});

static BLOCK_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Parse SRT content into segments, skipping malformed blocks
pub fn parse(content: &str) -> Vec<TimedSegment> {
    let content = normalize_line_endings(content);
    let content = content.trim();
    if content.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    for (block_no, block) in BLOCK_SEPARATOR.split(content).enumerate() {
        match parse_block(block) {
            Ok(Some(segment)) => segments.push(segment),
            Ok(None) => debug!("Skipping SRT block {}: empty text", block_no + 1),
            Err(e) => debug!("Skipping SRT block {}: {}", block_no + 1, e),
        }
    }
    segments
}

fn parse_block(block: &str) -> Result<Option<TimedSegment>, SubtitleError> {
    let lines: Vec<&str> = block.trim().lines().map(str::trim).collect();
    if lines.len() < 3 {
        return Err(SubtitleError::format("expected index, timing and text lines"));
    }

    lines[0]
        .parse::<u64>()
        .map_err(|_| SubtitleError::format(format!("invalid index line '{}'", lines[0])))?;

    let caps = TIMING_LINE
        .captures(lines[1])
        .ok_or_else(|| SubtitleError::format(format!("invalid timing line '{}'", lines[1])))?;
    let start = parse_srt_time(&caps[1])?;
    let end = parse_srt_time(&caps[2])?;

    let joined = lines[2..]
        .iter()
        .filter(|line| !line.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let text = normalize(&strip_markup_tags(&joined));

    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(TimedSegment::new(start, end, text)))
}

/// Serialize segments as SRT with 1-based sequential indices
pub fn serialize(segments: &[TimedSegment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        // Writing into a String cannot fail
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_time(segment.start),
            format_srt_time(segment.end),
            segment.text
        );
    }
    out
}
